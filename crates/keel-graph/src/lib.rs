//! # keel-graph
//!
//! Pure data structures for the keel bundling pipeline: module identities,
//! import edges, transition contexts, the module registry, the in-memory
//! module graph, and the module-id manifest.
//!
//! This crate does no resolution and no emission; it is the foundation the
//! `keel-bundler` pipeline assembles its build state from.
//!
//! ## Overview
//!
//! - **Identity**: a [`ModuleId`] is a (normalized path, context) pair. The
//!   same source compiled under two transition contexts is two modules.
//! - **Registry**: [`ModuleRegistry`] interns (source, context) keys with
//!   atomic check-then-insert; in-flight slots are what cyclic imports
//!   resolve to instead of recursing.
//! - **Graph**: [`ModuleGraph`] stores finalized modules plus forward and
//!   reverse edges behind an `Arc<RwLock<_>>`; clones share storage.
//! - **Manifest**: [`Manifest`] assigns runtime module ids over sorted
//!   identities. Externals never receive an id — [`ModuleRef`] compares
//!   them by reference instead.
//!
//! ## Quick start
//!
//! ```rust
//! use keel_graph::{ContextName, Module, ModuleGraph, ModuleId};
//!
//! # fn main() -> keel_graph::Result<()> {
//! let graph = ModuleGraph::new();
//! let id = ModuleId::new("src/index.js")?;
//! graph.add_module(Module::builder(id.clone(), "export {};").entry(true).build())?;
//!
//! assert_eq!(graph.entry_points(), vec![id.clone()]);
//! assert!(graph.dependencies(&id)?.is_empty());
//!
//! // The client variant of the same source is a distinct entity.
//! let client = id.in_context(ContextName::new("client"));
//! assert_ne!(id, client);
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod external_dep;
pub mod import;
pub mod manifest;
pub mod module;
pub mod module_id;
pub mod module_ref;
pub mod registry;
pub mod runtime;

mod memory;

pub use context::{ContextName, TargetEnv, TargetRuntime, TransitionContext, TransitionTable, DEFAULT_CONTEXT};
pub use external_dep::ExternalDependency;
pub use import::{EdgeKind, Import};
pub use manifest::Manifest;
pub use memory::{GraphStatistics, ModuleGraph};
pub use module::{Module, ModuleBuilder, SourceType};
pub use module_id::{ModuleId, ModuleIdError};
pub use module_ref::{ExternalHandle, ExternalModule, ModuleRef};
pub use registry::{Interned, ModuleRegistry};
pub use runtime::{MemoryRuntime, Runtime, RuntimeError, RuntimeResult};

#[cfg(not(target_family = "wasm"))]
pub use runtime::NativeRuntime;

/// Error types for keel-graph operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Lookup of an id the registry or graph never saw.
    #[error("module not found: {0}")]
    NotFound(ModuleId),

    /// A second module arrived under an identity already in the graph.
    #[error("duplicate module identity: {0}")]
    DuplicateModule(ModuleId),

    /// Invalid module identity input.
    #[error(transparent)]
    InvalidModuleId(#[from] ModuleIdError),

    /// Source I/O failure.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Graph or serialization operation error.
    #[error("operation error: {0}")]
    Operation(String),
}

/// Result type alias for keel-graph operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests;
