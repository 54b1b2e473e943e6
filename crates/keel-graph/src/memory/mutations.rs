//! Mutation methods for ModuleGraph.

use std::sync::Arc;

use crate::external_dep::ExternalDependency;
use crate::module::Module;
use crate::module_id::ModuleId;
use crate::module_ref::{ExternalHandle, ExternalModule};
use crate::{Error, Result};

use super::graph::ModuleGraph;

impl ModuleGraph {
    /// Add a module into the graph.
    ///
    /// Fails if the identity is already present: identity is unique per
    /// (source, context) pair, and a second variant of the same source must
    /// arrive under a different context, never by overwriting.
    pub fn add_module(&self, module: Module) -> Result<Arc<Module>> {
        let mut inner = self.inner.write();
        if inner.modules.contains_key(&module.id) {
            return Err(Error::DuplicateModule(module.id));
        }
        if module.is_entry && !inner.entry_points.contains(&module.id) {
            inner.entry_points.push(module.id.clone());
        }
        let arc = Arc::new(module);
        inner.modules.insert(arc.id.clone(), Arc::clone(&arc));
        Ok(arc)
    }

    /// Replace a stored module via a clone-and-patch closure.
    ///
    /// Only valid while the build that owns the graph is still assembling
    /// it (the transition pass patches deferred edges this way). Returns
    /// the new entity.
    pub fn update_module<F>(&self, id: &ModuleId, patch: F) -> Result<Arc<Module>>
    where
        F: FnOnce(&mut Module),
    {
        let mut inner = self.inner.write();
        let current = inner
            .modules
            .get(id)
            .ok_or_else(|| Error::NotFound(id.clone()))?;
        let mut module = (**current).clone();
        patch(&mut module);
        let arc = Arc::new(module);
        inner.modules.insert(id.clone(), Arc::clone(&arc));
        Ok(arc)
    }

    /// Add a dependency edge, creating forward and reverse mappings.
    pub fn add_dependency(&self, from: ModuleId, to: ModuleId) -> Result<()> {
        let mut inner = self.inner.write();
        inner
            .dependencies
            .entry(from.clone())
            .or_default()
            .insert(to.clone());
        inner.dependents.entry(to).or_default().insert(from);
        Ok(())
    }

    /// Record a module id as an entry point, preserving insertion order.
    pub fn add_entry_point(&self, id: ModuleId) -> Result<()> {
        let mut inner = self.inner.write();
        if !inner.entry_points.contains(&id) {
            inner.entry_points.push(id.clone());
        }
        if let Some(module_arc) = inner.modules.get(&id) {
            if !module_arc.is_entry {
                let mut module = (**module_arc).clone();
                module.is_entry = true;
                inner.modules.insert(id, Arc::new(module));
            }
        }
        Ok(())
    }

    /// Intern an external specifier, returning the build-wide handle.
    ///
    /// The first importer creates the handle; later importers of the same
    /// specifier share it, so reference comparison of externals holds.
    pub fn intern_external(&self, specifier: &str, importer: ModuleId) -> ExternalHandle {
        let mut inner = self.inner.write();
        let dep = inner
            .externals
            .entry(specifier.to_string())
            .or_insert_with(|| ExternalDependency::new(ExternalModule::handle(specifier)));
        dep.push_importer(importer);
        Arc::clone(&dep.handle)
    }
}
