//! Best-effort scanning of `brew` lines from a Brewfile.
//!
//! ```text
//! brew '<name>'[, args: ['<a>', ...]][, restart_service: (true|:changed)][ # <label>: <names>]*
//! ```
//!
//! Annotations after `#` are regenerated on every write and are ignored here.
//! Malformed `args` or `restart_service` clauses are dropped silently.

use regex::Regex;
use std::sync::LazyLock;

use super::RestartService;

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'([^']+)'").expect("valid quoted token regex"));
static ARGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"args:\s*\[([^\]]*)\]").expect("valid args regex"));
static RESTART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"restart_service:\s*(:changed|true)\b").expect("valid restart_service regex")
});

/// The user-controlled parts of a `brew` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub args: Vec<String>,
    pub restart_service: Option<RestartService>,
}

impl Declaration {
    /// Returns `None` when the line has no quoted package name.
    pub fn parse(line: &str) -> Option<Self> {
        let declaration = strip_annotations(line);

        let name = QUOTED.captures(declaration)?.get(1)?.as_str().to_string();

        let args = ARGS
            .captures(declaration)
            .and_then(|caps| caps.get(1))
            .map(|list| {
                QUOTED
                    .captures_iter(list.as_str())
                    .filter_map(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let restart_service = RESTART
            .captures(declaration)
            .and_then(|caps| caps.get(1))
            .and_then(|m| RestartService::from_manifest_token(m.as_str()));

        Some(Self {
            name,
            args,
            restart_service,
        })
    }
}

/// Cut the line at the first `#` outside single quotes.
fn strip_annotations(line: &str) -> &str {
    let mut quoted = false;
    for (i, c) in line.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            '#' if !quoted => return &line[..i],
            _ => {}
        }
    }
    line
}
