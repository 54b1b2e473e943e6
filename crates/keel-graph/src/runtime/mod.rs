//! Source I/O abstraction.
//!
//! Resolution only ever touches sources through a [`Runtime`], so the
//! pipeline runs the same against the real filesystem and against the
//! in-memory store tests and virtual entries use.

pub mod memory;
#[cfg(not(target_family = "wasm"))]
pub mod native;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

pub use memory::MemoryRuntime;
#[cfg(not(target_family = "wasm"))]
pub use native::NativeRuntime;

pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("source not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read access to module sources.
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Read the full source of a module.
    async fn read(&self, path: &Path) -> RuntimeResult<String>;

    /// Whether a source exists at the path. Used by extension probing.
    async fn exists(&self, path: &Path) -> bool;
}
