//! External dependency records.

use crate::module_id::ModuleId;
use crate::module_ref::ExternalHandle;

/// One external specifier and the modules importing it.
///
/// The handle is the build-wide identity of the external: every importer of
/// the same specifier shares it, which is what makes reference comparison of
/// externals meaningful.
#[derive(Debug, Clone)]
pub struct ExternalDependency {
    pub handle: ExternalHandle,
    pub importers: Vec<ModuleId>,
}

impl ExternalDependency {
    pub fn new(handle: ExternalHandle) -> Self {
        Self {
            handle,
            importers: Vec::new(),
        }
    }

    pub fn push_importer(&mut self, importer: ModuleId) {
        if !self.importers.contains(&importer) {
            self.importers.push(importer);
        }
    }

    pub fn specifier(&self) -> &str {
        &self.handle.specifier
    }

    pub fn importer_count(&self) -> usize {
        self.importers.len()
    }
}
