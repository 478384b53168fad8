use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::metadata::Formula;

use super::{ByClass, DependencyClass};

/// Service restart behaviour for `brew bundle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RestartService {
    /// Restart every time bundle runs (`restart_service: true`).
    Always,
    /// Restart only after changes and updates (`restart_service: :changed`).
    Changed,
}

impl RestartService {
    pub fn manifest_token(self) -> &'static str {
        match self {
            RestartService::Always => "true",
            RestartService::Changed => ":changed",
        }
    }

    pub fn from_manifest_token(token: &str) -> Option<Self> {
        match token {
            "true" => Some(RestartService::Always),
            ":changed" => Some(RestartService::Changed),
            _ => None,
        }
    }
}

/// A formula tracked in the dependency graph.
///
/// `dependencies` are the names this formula itself depends on, fixed once
/// classified from its metadata. `dependents` are the tracked formulae that
/// caused this one to be present, per class; a `BTreeSet` keeps them unique
/// and sorted for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Entry {
    pub name: String,
    pub args: Vec<String>,
    pub restart_service: Option<RestartService>,
    dependencies: ByClass<Vec<String>>,
    dependents: ByClass<BTreeSet<String>>,
}

impl Entry {
    /// An unclassified entry carrying only the install options.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_restart_service(mut self, restart_service: Option<RestartService>) -> Self {
        self.restart_service = restart_service;
        self
    }

    pub fn from_formula(formula: &Formula) -> Self {
        let mut entry = Entry::new(formula.full_name.clone());
        entry.classify(formula);
        entry
    }

    /// Sort the formula's raw dependency lists into the four classes.
    ///
    /// brew lists every dependency under `dependencies` as well as under
    /// its specific class, so a name found in a specific class is removed
    /// from `required`. A name listed in more than one specific class goes
    /// to the first of recommended, optional, build.
    pub fn classify(&mut self, formula: &Formula) {
        self.name = formula.full_name.clone();

        let mut claimed: HashSet<&str> = HashSet::new();
        let mut dependencies: ByClass<Vec<String>> = ByClass::default();

        let specific = [
            (DependencyClass::Recommended, &formula.recommended_dependencies),
            (DependencyClass::Optional, &formula.optional_dependencies),
            (DependencyClass::Build, &formula.build_dependencies),
        ];
        for (class, names) in specific {
            for name in names {
                if claimed.insert(name) {
                    dependencies.get_mut(class).push(name.clone());
                }
            }
        }

        for name in &formula.dependencies {
            if claimed.insert(name) {
                dependencies.required.push(name.clone());
            }
        }

        self.dependencies = dependencies;
    }

    pub fn dependencies(&self, class: DependencyClass) -> &[String] {
        self.dependencies.get(class)
    }

    pub fn dependents(&self, class: DependencyClass) -> &BTreeSet<String> {
        self.dependents.get(class)
    }

    pub(crate) fn dependents_mut(&mut self, class: DependencyClass) -> &mut BTreeSet<String> {
        self.dependents.get_mut(class)
    }

    /// Carry over back-references from a previous version of this entry.
    pub(crate) fn inherit_dependents(&mut self, previous: Entry) {
        self.dependents = previous.dependents;
    }

    /// True when nothing tracked depends on this entry through any class.
    pub fn is_root(&self) -> bool {
        self.dependents.iter().all(|(_, names)| names.is_empty())
    }
}

/// Renders the entry as a Brewfile line, back-references as annotations.
impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "brew '{}'", self.name)?;

        if !self.args.is_empty() {
            let quoted: Vec<String> = self.args.iter().map(|a| format!("'{}'", a)).collect();
            write!(f, ", args: [{}]", quoted.join(", "))?;
        }

        if let Some(restart) = self.restart_service {
            write!(f, ", restart_service: {}", restart.manifest_token())?;
        }

        for (class, names) in self.dependents.iter() {
            if !names.is_empty() {
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                write!(f, " # {}: {}", class.label(), names.join(", "))?;
            }
        }

        Ok(())
    }
}
