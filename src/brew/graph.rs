//! The working dependency graph for the `brew` section of a Brewfile.
//!
//! One [`Entry`] per tracked formula. Expansion and pruning use explicit
//! worklists, so the depth of the metadata graph never grows the call stack.

use log::{debug, info, warn};
use std::collections::HashMap;

use crate::metadata::{Formula, MetadataSource};

use super::{Declaration, DependencyClass, DependencyLevel, Entry, GraphError, GraphResult};

pub struct DependencyGraph<'a, S: MetadataSource> {
    source: &'a S,
    entries: HashMap<String, Entry>,
    /// Identifiers seen in the Brewfile or in dependency lists that differ
    /// from the canonical full name they resolved to.
    aliases: HashMap<String, String>,
}

impl<'a, S: MetadataSource> DependencyGraph<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            entries: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get a tracked entry by canonical name or by an alias already seen.
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.tracked_key(name).and_then(|key| self.entries.get(&key))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tracked_key(name).is_some()
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Resolve an identifier to the key it is (or would be) tracked under.
    pub fn canonical_name(&self, identifier: &str) -> GraphResult<String> {
        match self.tracked_key(identifier) {
            Some(key) => Ok(key),
            None => Ok(self.lookup(identifier)?.full_name),
        }
    }

    /// Ingest `brew` lines from a Brewfile.
    ///
    /// Lines whose formula is not in the metadata cache are skipped; the
    /// Brewfile may reference formulae from taps that were never refreshed.
    #[tracing::instrument(skip(self, lines))]
    pub fn from_packages<L: AsRef<str>>(&mut self, lines: &[L]) -> GraphResult<()> {
        for line in lines {
            let line = line.as_ref();
            let Some(declaration) = Declaration::parse(line) else {
                debug!("Skipping line without a package name: {}", line);
                continue;
            };

            let Some(formula) = self.source.find(&declaration.name)? else {
                debug!("Skipping {}: no metadata in cache", declaration.name);
                continue;
            };

            self.remember_alias(&declaration.name, &formula.full_name);
            if let Some(existing) = self.entries.get_mut(&formula.full_name) {
                warn!(
                    "{} is declared more than once; merging the install options",
                    existing.name
                );
                if existing.args.is_empty() {
                    existing.args = declaration.args;
                }
                if existing.restart_service.is_none() {
                    existing.restart_service = declaration.restart_service;
                }
                continue;
            }

            let entry = Entry::from_formula(&formula)
                .with_args(declaration.args)
                .with_restart_service(declaration.restart_service);
            self.entries.insert(formula.full_name, entry);
        }

        debug!("Ingested {} brew entries", self.entries.len());
        Ok(())
    }

    /// Materialise back-references among the tracked entries for every
    /// class up to `level`, pulling in dependencies not yet tracked.
    #[tracing::instrument(skip(self))]
    pub fn resolve_dependency_map(&mut self, level: DependencyLevel) -> GraphResult<()> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();

        for name in names {
            self.expand(&name, level)?;
        }
        Ok(())
    }

    /// Record that `requester` depends on `target` through `class`, tracking
    /// `target` if needed. Then `target`'s own dependencies, in every class
    /// up to `level`, get the same treatment.
    ///
    /// Expansion only continues below a back-reference that was newly
    /// inserted, so repeated calls are no-ops and cyclic metadata terminates.
    pub fn add_dependency(
        &mut self,
        target: &str,
        requester: &str,
        class: DependencyClass,
        level: DependencyLevel,
    ) -> GraphResult<()> {
        let mut pending = vec![(target.to_string(), requester.to_string(), class)];

        while let Some((target, requester, class)) = pending.pop() {
            let entry = self.track(&target)?;

            if entry.name == requester {
                warn!("{} lists itself as a {} dependency", requester, class);
                continue;
            }

            if entry.dependents_mut(class).insert(requester) {
                let name = entry.name.clone();
                for dependency_class in DependencyClass::up_to(level) {
                    for dependency in entry.dependencies(dependency_class).iter().rev() {
                        pending.push((dependency.clone(), name.clone(), dependency_class));
                    }
                }
            }
        }

        Ok(())
    }

    /// Add a formula and, for every class up to `level`, its transitive
    /// dependencies. `entry` only needs a name and install options; the
    /// rest comes from the metadata source.
    ///
    /// Returns the canonical name the entry is tracked under.
    #[tracing::instrument(skip(self, entry), fields(name = %entry.name))]
    pub fn add(&mut self, entry: Entry, level: DependencyLevel) -> GraphResult<String> {
        let requested = entry.name.clone();
        let formula = self.lookup(&requested)?;

        let mut entry = entry;
        entry.classify(&formula);
        let name = entry.name.clone();
        self.remember_alias(&requested, &name);

        if let Some(previous) = self.entries.remove(&name) {
            debug!("{} was already tracked; keeping its back-references", name);
            entry.inherit_dependents(previous);
        }
        self.entries.insert(name.clone(), entry);
        self.expand(&name, level)?;

        info!("Added {} ({} entries tracked)", name, self.entries.len());
        Ok(name)
    }

    /// Remove a tracked formula and prune, through classes up to `level`,
    /// every dependency left with no back-references at all.
    ///
    /// The removed formula is detached from its dependencies in all four
    /// classes, so no annotation ever names an untracked formula.
    #[tracing::instrument(skip(self))]
    pub fn remove(&mut self, name: &str, level: DependencyLevel) -> GraphResult<()> {
        let Some(key) = self.tracked_key(name) else {
            return Err(GraphError::NothingToRemove(name.to_string()));
        };

        if let Some(entry) = self.entries.get(&key)
            && !entry.is_root()
        {
            warn!(
                "{} is still a dependency of other packages and will be restored by the next clean",
                key
            );
        }

        // An entry leaves the map the first time it is popped, which also
        // stops a dependency cycle from being visited twice.
        let mut pending = vec![key];
        while let Some(name) = pending.pop() {
            let Some(entry) = self.entries.remove(&name) else {
                continue;
            };
            info!("Removed {}", name);

            for class in DependencyClass::ALL {
                for dependency in entry.dependencies(class) {
                    let Some(key) = self.tracked_key(dependency) else {
                        continue;
                    };
                    let Some(tracked) = self.entries.get_mut(&key) else {
                        continue;
                    };

                    tracked.dependents_mut(class).remove(&name);
                    if class <= level && tracked.is_root() {
                        debug!("{} is no longer needed by anything", key);
                        pending.push(key);
                    }
                }
            }
        }

        Ok(())
    }

    /// Render every tracked entry as a Brewfile line, sorted.
    pub fn lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.entries.values().map(Entry::to_string).collect();
        lines.sort();
        lines
    }

    fn lookup(&self, identifier: &str) -> GraphResult<Formula> {
        self.source
            .find(identifier)?
            .ok_or_else(|| GraphError::MetadataNotFound(identifier.to_string()))
    }

    fn tracked_key(&self, name: &str) -> Option<String> {
        if self.entries.contains_key(name) {
            return Some(name.to_string());
        }
        self.aliases
            .get(name)
            .filter(|key| self.entries.contains_key(*key))
            .cloned()
    }

    fn remember_alias(&mut self, identifier: &str, full_name: &str) {
        if identifier != full_name {
            self.aliases
                .insert(identifier.to_string(), full_name.to_string());
        }
    }

    /// Attach `name` to each of its dependencies in the classes up to `level`.
    fn expand(&mut self, name: &str, level: DependencyLevel) -> GraphResult<()> {
        for class in DependencyClass::up_to(level) {
            let dependencies = self
                .entries
                .get(name)
                .map(|entry| entry.dependencies(class).to_vec())
                .unwrap_or_default();
            for dependency in dependencies {
                self.add_dependency(&dependency, name, class, level)?;
            }
        }
        Ok(())
    }

    /// Get the entry for `name`, classifying and inserting it first if it
    /// is not tracked yet.
    fn track(&mut self, name: &str) -> GraphResult<&mut Entry> {
        let key = match self.tracked_key(name) {
            Some(key) => key,
            None => {
                let formula = self.lookup(name)?;
                let key = formula.full_name.clone();
                self.remember_alias(name, &key);
                if !self.entries.contains_key(&key) {
                    debug!("Tracking {} as a dependency", key);
                    self.entries.insert(key.clone(), Entry::from_formula(&formula));
                }
                key
            }
        };

        Ok(self
            .entries
            .entry(key.clone())
            .or_insert_with(|| Entry::new(key)))
    }
}
