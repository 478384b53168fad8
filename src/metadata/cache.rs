//! Persistent formula metadata store.
//!
//! Records are written key-by-key under the cache root:
//!
//! ```text
//! <root>/index.json                       identifier -> full name
//! <root>/formulae/<full_name>.json        one record per formula
//! <root>/formulae/user/repo/name.json     tap formulae nest by segment
//! ```

use anyhow::{Context, Result, bail};
use log::{debug, info};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

use super::Formula;

const INDEX_FILE: &str = "index.json";
const FORMULAE_DIR: &str = "formulae";

/// Read access to formula metadata.
///
/// `Ok(None)` means the identifier is unknown; `Err` means the store itself
/// could not be read.
#[cfg_attr(test, mockall::automock)]
pub trait MetadataSource {
    fn find(&self, identifier: &str) -> Result<Option<Formula>>;
}

/// Formula metadata cache backed by JSON files on disk.
pub struct MetadataCache<'a, R: Runtime> {
    runtime: &'a R,
    root: PathBuf,
    /// `index.json`, read on the first lookup.
    index: RefCell<Option<BTreeMap<String, String>>>,
}

impl<'a, R: Runtime> MetadataCache<'a, R> {
    pub fn new(runtime: &'a R, root: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            root: root.into(),
            index: RefCell::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the index path.
    ///
    /// Returns: `<root>/index.json`
    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    /// Get the record path for a formula.
    ///
    /// Returns: `<root>/formulae/<segment>/.../<last>.json`
    pub fn record_path(&self, full_name: &str) -> Result<PathBuf> {
        let segments: Vec<&str> = full_name.split('/').collect();
        if segments
            .iter()
            .any(|s| s.is_empty() || *s == "." || *s == "..")
        {
            bail!("Invalid formula name '{}'", full_name);
        }

        let mut path = self.root.join(FORMULAE_DIR);
        for segment in &segments[..segments.len() - 1] {
            path.push(segment);
        }
        path.push(format!("{}.json", segments[segments.len() - 1]));
        Ok(path)
    }

    /// The cache counts as built once its index has been written.
    pub fn is_built(&self) -> bool {
        self.runtime.exists(&self.index_path())
    }

    /// The full name `identifier` is stored under.
    fn resolve(&self, identifier: &str) -> Result<String> {
        if self.index.borrow().is_none() {
            let index = self.load_index()?;
            *self.index.borrow_mut() = Some(index);
        }
        let index = self.index.borrow();
        Ok(index
            .as_ref()
            .and_then(|index| index.get(identifier))
            .cloned()
            .unwrap_or_else(|| identifier.to_string()))
    }

    fn load_index(&self) -> Result<BTreeMap<String, String>> {
        let path = self.index_path();
        if !self.runtime.exists(&path) {
            return Ok(BTreeMap::new());
        }
        let content = self.runtime.read_to_string(&path)?;
        serde_json::from_str(&content)
            .with_context(|| format!("Corrupt metadata index at {:?}", path))
    }

    fn load_record(&self, full_name: &str) -> Result<Option<Formula>> {
        // Not a name any record could be stored under.
        let Ok(path) = self.record_path(full_name) else {
            return Ok(None);
        };
        if !self.runtime.exists(&path) {
            return Ok(None);
        }
        let content = self.runtime.read_to_string(&path)?;
        let formula = serde_json::from_str(&content)
            .with_context(|| format!("Corrupt metadata record at {:?}", path))?;
        Ok(Some(formula))
    }

    /// Replace the cache contents with the formulae in `json`, a JSON array
    /// in the `brew info --json=v1` format. Returns the number of records.
    #[tracing::instrument(skip(self, json))]
    pub fn refresh(&self, json: &str) -> Result<usize> {
        let formulae: Vec<Formula> =
            serde_json::from_str(json).context("Failed to parse formula metadata")?;

        // Every name must map to a record path before the old records go.
        let paths = formulae
            .iter()
            .map(|formula| self.record_path(&formula.full_name))
            .collect::<Result<Vec<_>>>()?;

        let formulae_dir = self.root.join(FORMULAE_DIR);
        if self.runtime.exists(&formulae_dir) {
            debug!("Clearing previous records in {:?}", formulae_dir);
            self.runtime.remove_dir_all(&formulae_dir)?;
        }

        for (formula, path) in formulae.iter().zip(paths) {
            if let Some(parent) = path.parent()
                && !self.runtime.exists(parent)
            {
                self.runtime.create_dir_all(parent)?;
            }
            let content = serde_json::to_string_pretty(formula)?;
            self.runtime
                .write(&path, content.as_bytes())
                .with_context(|| format!("Failed to store metadata for {}", formula.full_name))?;
        }

        let index = build_index(&formulae);
        if !self.runtime.exists(&self.root) {
            self.runtime.create_dir_all(&self.root)?;
        }
        let content = serde_json::to_string_pretty(&index)?;
        self.runtime
            .write(&self.index_path(), content.as_bytes())
            .with_context(|| format!("Failed to save metadata index to {:?}", self.index_path()))?;

        info!(
            "Stored metadata for {} formulae ({} identifiers) in {:?}",
            formulae.len(),
            index.len(),
            self.root
        );
        *self.index.borrow_mut() = Some(index);
        Ok(formulae.len())
    }

    /// Refresh from the output of `<brew> info --all --json=v1`.
    #[tracing::instrument(skip(self))]
    pub fn refresh_from_brew(&self, brew_command: &str) -> Result<usize> {
        let args = ["info", "--all", "--json=v1"].map(String::from);
        let output = self
            .runtime
            .run_command(brew_command, &args)
            .context("Failed to query formula information from brew")?;
        let json = String::from_utf8(output).context("brew produced non UTF-8 output")?;
        self.refresh(&json)
    }

    /// Refresh from a previously captured `brew info --json=v1` dump.
    #[tracing::instrument(skip(self))]
    pub fn refresh_from_file(&self, path: &Path) -> Result<usize> {
        let json = self.runtime.read_to_string(path)?;
        self.refresh(&json)
    }
}

impl<R: Runtime> MetadataSource for MetadataCache<'_, R> {
    fn find(&self, identifier: &str) -> Result<Option<Formula>> {
        let full_name = self.resolve(identifier)?;
        debug!("Looking up {} as {}", identifier, full_name);
        self.load_record(&full_name)
    }
}

/// Map every identifier to a full name. A formula's own names always win
/// over another formula's alias or old name.
fn build_index(formulae: &[Formula]) -> BTreeMap<String, String> {
    let mut index = BTreeMap::new();

    for formula in formulae {
        index.insert(formula.full_name.clone(), formula.full_name.clone());
    }
    for formula in formulae {
        index
            .entry(formula.name.clone())
            .or_insert_with(|| formula.full_name.clone());
    }
    for formula in formulae {
        for id in formula.identifiers().skip(2) {
            index
                .entry(id.to_string())
                .or_insert_with(|| formula.full_name.clone());
        }
    }

    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, RealRuntime};
    use mockall::predicate::eq;
    use tempfile::tempdir;

    const DUMP: &str = r#"[
        { "name": "python", "full_name": "python", "aliases": ["python3"],
          "dependencies": ["sqlite", "readline"], "recommended_dependencies": [],
          "optional_dependencies": [], "build_dependencies": ["pkg-config"] },
        { "name": "vim", "full_name": "vim", "dependencies": ["python"] },
        { "name": "chunkwm", "full_name": "crisidev/chunkwm/chunkwm", "oldname": "kwm" }
    ]"#;

    #[test]
    fn test_record_path_nests_tap_formulae() {
        let runtime = MockRuntime::new();
        let cache = MetadataCache::new(&runtime, "/cache");

        assert_eq!(
            cache.record_path("vim").unwrap(),
            PathBuf::from("/cache/formulae/vim.json")
        );
        assert_eq!(
            cache.record_path("crisidev/chunkwm/chunkwm").unwrap(),
            PathBuf::from("/cache/formulae/crisidev/chunkwm/chunkwm.json")
        );
        assert!(cache.record_path("../etc/passwd").is_err());
        assert!(cache.record_path("user//name").is_err());
    }

    #[test]
    fn test_find_without_index_or_record() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| false);

        let cache = MetadataCache::new(&runtime, "/cache");
        assert_eq!(cache.find("vim").unwrap(), None);
        assert!(!cache.is_built());
    }

    #[test]
    fn test_find_reads_record_through_index() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_read_to_string()
            .with(eq(PathBuf::from("/cache/index.json")))
            .returning(|_| Ok(r#"{"kwm": "crisidev/chunkwm/chunkwm"}"#.to_string()));
        runtime
            .expect_read_to_string()
            .with(eq(PathBuf::from(
                "/cache/formulae/crisidev/chunkwm/chunkwm.json",
            )))
            .returning(|_| {
                Ok(r#"{"name": "chunkwm", "full_name": "crisidev/chunkwm/chunkwm"}"#.to_string())
            });

        let cache = MetadataCache::new(&runtime, "/cache");
        let formula = cache.find("kwm").unwrap().unwrap();
        assert_eq!(formula.full_name, "crisidev/chunkwm/chunkwm");
    }

    #[test]
    fn test_find_reports_corrupt_record() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_exists()
            .with(eq(PathBuf::from("/cache/index.json")))
            .returning(|_| false);
        runtime
            .expect_exists()
            .with(eq(PathBuf::from("/cache/formulae/vim.json")))
            .returning(|_| true);
        runtime
            .expect_read_to_string()
            .returning(|_| Ok("not json".to_string()));

        let cache = MetadataCache::new(&runtime, "/cache");
        let err = cache.find("vim").unwrap_err();
        assert!(err.to_string().contains("Corrupt metadata record"));
    }

    #[test]
    fn test_refresh_and_find_on_disk() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let cache = MetadataCache::new(&runtime, dir.path().join("cache"));

        assert_eq!(cache.refresh(DUMP).unwrap(), 3);
        assert!(cache.is_built());
        assert!(
            dir.path()
                .join("cache/formulae/crisidev/chunkwm/chunkwm.json")
                .exists()
        );

        let python = cache.find("python3").unwrap().unwrap();
        assert_eq!(python.full_name, "python");
        assert_eq!(python.build_dependencies, vec!["pkg-config"]);

        let chunkwm = cache.find("chunkwm").unwrap().unwrap();
        assert_eq!(chunkwm.full_name, "crisidev/chunkwm/chunkwm");
        assert_eq!(
            cache.find("kwm").unwrap().unwrap().full_name,
            "crisidev/chunkwm/chunkwm"
        );

        assert_eq!(cache.find("emacs").unwrap(), None);
        assert_eq!(cache.find("../index").unwrap(), None);
    }

    #[test]
    fn test_refresh_replaces_previous_records() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let cache = MetadataCache::new(&runtime, dir.path());

        cache.refresh(DUMP).unwrap();
        cache
            .refresh(r#"[{ "name": "jq", "full_name": "jq" }]"#)
            .unwrap();

        assert!(cache.find("jq").unwrap().is_some());
        assert_eq!(cache.find("vim").unwrap(), None);
    }

    #[test]
    fn test_index_is_read_once() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_read_to_string()
            .with(eq(PathBuf::from("/cache/index.json")))
            .times(1)
            .returning(|_| Ok(r#"{"python3": "python"}"#.to_string()));
        runtime
            .expect_read_to_string()
            .with(eq(PathBuf::from("/cache/formulae/python.json")))
            .times(3)
            .returning(|_| Ok(r#"{"name": "python", "full_name": "python"}"#.to_string()));

        let cache = MetadataCache::new(&runtime, "/cache");
        for identifier in ["python3", "python", "python3"] {
            assert_eq!(cache.find(identifier).unwrap().unwrap().full_name, "python");
        }
    }

    #[test]
    fn test_refresh_with_invalid_name_keeps_previous_records() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let cache = MetadataCache::new(&runtime, dir.path());
        cache.refresh(DUMP).unwrap();

        let err = cache
            .refresh(
                r#"[{ "name": "jq", "full_name": "jq" },
                    { "name": "evil", "full_name": "../evil" }]"#,
            )
            .unwrap_err();
        assert!(err.to_string().contains("Invalid formula name '../evil'"));

        let reopened = MetadataCache::new(&runtime, dir.path());
        assert_eq!(
            reopened.find("python3").unwrap().unwrap().full_name,
            "python"
        );
        assert_eq!(reopened.find("jq").unwrap(), None);
    }

    #[test]
    fn test_refresh_rejects_invalid_json_before_touching_store() {
        let runtime = MockRuntime::new();
        let cache = MetadataCache::new(&runtime, "/cache");

        let err = cache.refresh("{ not an array").unwrap_err();
        assert!(err.to_string().contains("Failed to parse formula metadata"));
    }

    #[test]
    fn test_refresh_from_brew_invokes_brew_info() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_run_command()
            .withf(|program, args| {
                program == "brew" && args == ["info", "--all", "--json=v1"].map(String::from)
            })
            .times(1)
            .returning(|_, _| Ok(b"[]".to_vec()));
        runtime.expect_exists().returning(|_| false);
        runtime
            .expect_create_dir_all()
            .with(eq(PathBuf::from("/cache")))
            .returning(|_| Ok(()));
        runtime
            .expect_write()
            .withf(|path, contents| path == Path::new("/cache/index.json") && contents == b"{}")
            .times(1)
            .returning(|_, _| Ok(()));

        let cache = MetadataCache::new(&runtime, "/cache");
        assert_eq!(cache.refresh_from_brew("brew").unwrap(), 0);
    }

    #[test]
    fn test_build_index_prefers_canonical_names() {
        let formulae: Vec<Formula> = serde_json::from_str(
            r#"[
                { "name": "vim", "full_name": "vim" },
                { "name": "vim", "full_name": "someone/tap/vim", "aliases": ["vi"] },
                { "name": "neovim", "full_name": "neovim", "aliases": ["vim", "nvim"] }
            ]"#,
        )
        .unwrap();

        let index = build_index(&formulae);
        assert_eq!(index["vim"], "vim");
        assert_eq!(index["someone/tap/vim"], "someone/tap/vim");
        assert_eq!(index["vi"], "someone/tap/vim");
        assert_eq!(index["nvim"], "neovim");
    }
}
