//! In-memory runtime for virtual sources and tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::{Runtime, RuntimeError, RuntimeResult};

/// Stores sources in a map keyed by normalized path.
///
/// Builds with virtual entries and the whole resolver/chunker test surface
/// run against this runtime, so no test needs a real filesystem.
#[derive(Debug, Default)]
pub struct MemoryRuntime {
    files: RwLock<FxHashMap<PathBuf, String>>,
}

impl MemoryRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a virtual source.
    pub fn insert(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.write().insert(path.into(), content.into());
    }

    /// Builder-style insertion for test fixtures.
    pub fn with(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

#[async_trait]
impl Runtime for MemoryRuntime {
    async fn read(&self, path: &Path) -> RuntimeResult<String> {
        self.files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| RuntimeError::NotFound(path.to_path_buf()))
    }

    async fn exists(&self, path: &Path) -> bool {
        self.files.read().contains_key(path)
    }
}
