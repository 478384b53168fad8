use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the four classes of dependency a formula can declare.
///
/// The ordering is significant: the same type doubles as the dependency
/// level, and every cascading operation processes the classes that are
/// `<=` the configured level.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DependencyClass {
    #[default]
    Required,
    Recommended,
    Optional,
    Build,
}

/// The cut-off passed to `add`, `remove` and `resolve_dependency_map`.
pub type DependencyLevel = DependencyClass;

impl DependencyClass {
    pub const ALL: [DependencyClass; 4] = [
        DependencyClass::Required,
        DependencyClass::Recommended,
        DependencyClass::Optional,
        DependencyClass::Build,
    ];

    /// All classes from `Required` up to and including `level`.
    pub fn up_to(level: DependencyLevel) -> impl Iterator<Item = DependencyClass> {
        Self::ALL.into_iter().filter(move |class| *class <= level)
    }

    /// Label used in manifest annotations.
    pub fn label(self) -> &'static str {
        match self {
            DependencyClass::Required => "required by",
            DependencyClass::Recommended => "recommended for",
            DependencyClass::Optional => "optional for",
            DependencyClass::Build => "build for",
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            DependencyClass::Required => "required",
            DependencyClass::Recommended => "recommended",
            DependencyClass::Optional => "optional",
            DependencyClass::Build => "build",
        }
    }
}

impl fmt::Display for DependencyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DependencyClass {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "required" => Ok(DependencyClass::Required),
            "recommended" => Ok(DependencyClass::Recommended),
            "optional" => Ok(DependencyClass::Optional),
            "build" => Ok(DependencyClass::Build),
            other => bail!(
                "Unknown dependency level '{}'. Valid levels are required, recommended, optional and build.",
                other
            ),
        }
    }
}

/// One value per dependency class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByClass<T> {
    pub required: T,
    pub recommended: T,
    pub optional: T,
    pub build: T,
}

impl<T> ByClass<T> {
    pub fn get(&self, class: DependencyClass) -> &T {
        match class {
            DependencyClass::Required => &self.required,
            DependencyClass::Recommended => &self.recommended,
            DependencyClass::Optional => &self.optional,
            DependencyClass::Build => &self.build,
        }
    }

    pub fn get_mut(&mut self, class: DependencyClass) -> &mut T {
        match class {
            DependencyClass::Required => &mut self.required,
            DependencyClass::Recommended => &mut self.recommended,
            DependencyClass::Optional => &mut self.optional,
            DependencyClass::Build => &mut self.build,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (DependencyClass, &T)> {
        DependencyClass::ALL
            .into_iter()
            .map(move |class| (class, self.get(class)))
    }
}
