//! Query methods for ModuleGraph.

use std::sync::Arc;

use crate::external_dep::ExternalDependency;
use crate::module::Module;
use crate::module_id::ModuleId;
use crate::module_ref::ExternalHandle;
use crate::{Error, Result};

use super::graph::ModuleGraph;

impl ModuleGraph {
    /// Look up a module by id.
    pub fn module(&self, id: &ModuleId) -> Result<Arc<Module>> {
        self.inner
            .read()
            .modules
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.clone()))
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.inner.read().modules.contains_key(id)
    }

    /// Direct dependencies of a module, in stable (sorted) order.
    pub fn dependencies(&self, id: &ModuleId) -> Result<Vec<ModuleId>> {
        let inner = self.inner.read();
        if !inner.modules.contains_key(id) {
            return Err(Error::NotFound(id.clone()));
        }
        let mut deps: Vec<ModuleId> = inner
            .dependencies
            .get(id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        deps.sort();
        Ok(deps)
    }

    /// Direct dependents of a module, in stable (sorted) order.
    pub fn dependents(&self, id: &ModuleId) -> Result<Vec<ModuleId>> {
        let inner = self.inner.read();
        if !inner.modules.contains_key(id) {
            return Err(Error::NotFound(id.clone()));
        }
        let mut deps: Vec<ModuleId> = inner
            .dependents
            .get(id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        deps.sort();
        Ok(deps)
    }

    /// All module ids, sorted.
    pub fn module_ids(&self) -> Vec<ModuleId> {
        let mut ids: Vec<ModuleId> = self.inner.read().modules.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// All modules, sorted by id.
    pub fn modules(&self) -> Vec<Arc<Module>> {
        let inner = self.inner.read();
        let mut modules: Vec<Arc<Module>> = inner.modules.values().cloned().collect();
        modules.sort_by(|a, b| a.id.cmp(&b.id));
        modules
    }

    /// Entry points in insertion order.
    pub fn entry_points(&self) -> Vec<ModuleId> {
        self.inner.read().entry_points.clone()
    }

    /// The interned handle for an external specifier, if any importer
    /// recorded it.
    pub fn external_handle(&self, specifier: &str) -> Option<ExternalHandle> {
        self.inner
            .read()
            .externals
            .get(specifier)
            .map(|dep| Arc::clone(&dep.handle))
    }

    /// External dependency records, sorted by specifier.
    pub fn externals(&self) -> Vec<ExternalDependency> {
        let inner = self.inner.read();
        let mut deps: Vec<ExternalDependency> = inner.externals.values().cloned().collect();
        deps.sort_by(|a, b| a.specifier().cmp(b.specifier()));
        deps
    }

    pub fn len(&self) -> usize {
        self.inner.read().modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().modules.is_empty()
    }
}
