//! References to resolved modules.
//!
//! Internal modules are compared by id. External modules never receive an
//! id — the runtime only ever compares them by reference — so [`ModuleRef`]
//! equality falls back to pointer identity for the external arm.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::module_id::ModuleId;

/// An intentionally unresolved module, terminal in the graph.
///
/// Externals carry only their specifier. One handle is interned per
/// specifier per build, so two imports of the same external compare equal
/// by reference.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExternalModule {
    pub specifier: String,
}

/// Shared handle to an external module.
pub type ExternalHandle = Arc<ExternalModule>;

impl ExternalModule {
    pub fn handle(specifier: impl Into<String>) -> ExternalHandle {
        Arc::new(Self {
            specifier: specifier.into(),
        })
    }
}

/// Reference to a resolved module: an internal module with an identity, or
/// an external compared only by reference.
#[derive(Debug, Clone)]
pub enum ModuleRef {
    Internal(ModuleId),
    External(ExternalHandle),
}

impl ModuleRef {
    pub fn internal(id: ModuleId) -> Self {
        Self::Internal(id)
    }

    pub fn external(handle: ExternalHandle) -> Self {
        Self::External(handle)
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Self::External(_))
    }

    /// The module id, when the reference is internal.
    pub fn id(&self) -> Option<&ModuleId> {
        match self {
            Self::Internal(id) => Some(id),
            Self::External(_) => None,
        }
    }

    /// The specifier of an external reference.
    pub fn external_specifier(&self) -> Option<&str> {
        match self {
            Self::Internal(_) => None,
            Self::External(handle) => Some(&handle.specifier),
        }
    }

    /// Capability-aware identity comparison.
    ///
    /// Internal references compare by id; external references compare by
    /// handle identity, never by specifier text. Mixed arms are never equal.
    pub fn identity_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Internal(a), Self::Internal(b)) => a == b,
            (Self::External(a), Self::External(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for ModuleRef {
    fn eq(&self, other: &Self) -> bool {
        self.identity_eq(other)
    }
}

impl Eq for ModuleRef {}

impl fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal(id) => write!(f, "{id}"),
            Self::External(handle) => write!(f, "external:{}", handle.specifier),
        }
    }
}
