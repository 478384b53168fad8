use serde::{Deserialize, Serialize};

/// Formula metadata as emitted by `brew info --json=v1`.
///
/// Only the fields the dependency graph needs are kept; everything else in
/// the brew output is ignored on deserialisation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Formula {
    pub name: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oldname: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub recommended_dependencies: Vec<String>,
    #[serde(default)]
    pub optional_dependencies: Vec<String>,
    #[serde(default)]
    pub build_dependencies: Vec<String>,
}

impl Formula {
    /// Every identifier this formula can be looked up by, canonical name first.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.full_name.as_str())
            .chain(std::iter::once(self.name.as_str()))
            .chain(self.oldname.as_deref())
            .chain(self.aliases.iter().map(String::as_str))
    }
}
