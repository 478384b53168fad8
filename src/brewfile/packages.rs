use anyhow::{Result, bail};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::runtime::Runtime;

/// The four kinds of Brewfile declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    Tap,
    Brew,
    Cask,
    Mas,
}

impl PackageKind {
    pub fn keyword(self) -> &'static str {
        match self {
            PackageKind::Tap => "tap",
            PackageKind::Brew => "brew",
            PackageKind::Cask => "cask",
            PackageKind::Mas => "mas",
        }
    }

    /// `<kind> '<name>'`
    pub fn declaration(self, name: &str) -> String {
        format!("{} '{}'", self.keyword(), name)
    }

    fn matches(self, line: &str) -> bool {
        line.strip_prefix(self.keyword())
            .is_some_and(|rest| rest.starts_with(char::is_whitespace))
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for PackageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tap" => Ok(PackageKind::Tap),
            "brew" => Ok(PackageKind::Brew),
            "cask" => Ok(PackageKind::Cask),
            "mas" => Ok(PackageKind::Mas),
            other => bail!("Unknown package type '{}'", other),
        }
    }
}

/// The declarations of a Brewfile, one sorted list per kind.
///
/// Anything that is not a declaration (comments, blank lines) is dropped
/// when a Brewfile is read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packages {
    pub tap: Vec<String>,
    pub brew: Vec<String>,
    pub cask: Vec<String>,
    pub mas: Vec<String>,
}

impl Packages {
    pub fn from_contents(contents: &str) -> Self {
        let mut packages = Packages::default();
        for line in contents.lines() {
            let line = line.trim();
            for kind in [
                PackageKind::Tap,
                PackageKind::Brew,
                PackageKind::Cask,
                PackageKind::Mas,
            ] {
                if kind.matches(line) {
                    packages.section_mut(kind).push(line.to_string());
                    break;
                }
            }
        }
        packages.sort();
        packages
    }

    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        if !runtime.exists(path) {
            bail!("Brewfile not found at {}", path.display());
        }
        let contents = runtime.read_to_string(path)?;
        Ok(Self::from_contents(&contents))
    }

    #[tracing::instrument(skip(self, runtime))]
    pub fn save<R: Runtime>(&self, runtime: &R, path: &Path) -> Result<()> {
        runtime.write(path, self.to_contents().as_bytes())
    }

    pub fn section(&self, kind: PackageKind) -> &[String] {
        match kind {
            PackageKind::Tap => &self.tap,
            PackageKind::Brew => &self.brew,
            PackageKind::Cask => &self.cask,
            PackageKind::Mas => &self.mas,
        }
    }

    pub fn section_mut(&mut self, kind: PackageKind) -> &mut Vec<String> {
        match kind {
            PackageKind::Tap => &mut self.tap,
            PackageKind::Brew => &mut self.brew,
            PackageKind::Cask => &mut self.cask,
            PackageKind::Mas => &mut self.mas,
        }
    }

    /// True if a line of that kind declares `name`.
    pub fn contains(&self, kind: PackageKind, name: &str) -> bool {
        let declaration = kind.declaration(name);
        self.section(kind)
            .iter()
            .any(|line| declares(line, &declaration))
    }

    /// Append a raw line to a section, keeping it sorted.
    pub fn add_line(&mut self, kind: PackageKind, line: String) {
        let section = self.section_mut(kind);
        section.push(line);
        section.sort();
    }

    /// Drop every line of that kind declaring `name`. Returns how many
    /// lines were removed.
    pub fn remove(&mut self, kind: PackageKind, name: &str) -> usize {
        let declaration = kind.declaration(name);
        let section = self.section_mut(kind);
        let before = section.len();
        section.retain(|line| !declares(line, &declaration));
        before - section.len()
    }

    /// Replace the brew section with freshly rendered lines.
    pub fn set_brews(&mut self, mut lines: Vec<String>) {
        lines.sort();
        self.brew = lines;
    }

    fn sort(&mut self) {
        self.tap.sort();
        self.brew.sort();
        self.cask.sort();
        self.mas.sort();
    }

    /// Render the Brewfile: taps, brews nothing depends on, dependent
    /// (annotated) brews, casks, mas apps. Non-empty groups are separated
    /// by a blank line.
    pub fn to_contents(&self) -> String {
        let (dependent, primary): (Vec<&String>, Vec<&String>) =
            self.brew.iter().partition(|line| line.contains('#'));

        let groups: [Vec<&String>; 5] = [
            self.tap.iter().collect(),
            primary,
            dependent,
            self.cask.iter().collect(),
            self.mas.iter().collect(),
        ];

        groups
            .iter()
            .filter(|group| !group.is_empty())
            .map(|group| {
                group
                    .iter()
                    .map(|line| format!("{}\n", line))
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// `line` declares exactly `declaration`, not merely a name sharing its prefix.
fn declares(line: &str, declaration: &str) -> bool {
    line.strip_prefix(declaration)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with([',', ' ', '#']))
}
