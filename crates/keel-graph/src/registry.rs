//! Module registry.
//!
//! The registry is the single shared mutable structure during a build. All
//! mutation goes through [`ModuleRegistry::intern`], whose check-then-insert
//! is atomic (one `DashMap` entry operation), so concurrent resolvers racing
//! on the same (source, context) key agree on a single slot. The lock is
//! scoped to the entry operation alone and is never held across recursive
//! resolution.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::context::ContextName;
use crate::module::Module;
use crate::module_id::ModuleId;
use crate::{Error, Result};

/// State of one interned (source, context) key.
#[derive(Debug, Clone)]
enum Slot {
    /// Resolution is in flight; cyclic imports land here and reuse the key
    /// instead of recursing.
    InFlight,
    /// Resolution finished and produced a module.
    Ready(Arc<Module>),
}

/// Outcome of an intern call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interned {
    pub id: ModuleId,
    /// True when this call created the slot; false when the key was already
    /// in flight or ready.
    pub fresh: bool,
}

/// Interns (source, context) keys and stores completed modules.
///
/// Entries are never removed mid-build; a rebuild starts a fresh registry.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    slots: DashMap<ModuleId, Slot>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a (source path, context) key, idempotently.
    ///
    /// The first caller for a key gets `fresh = true` and owns resolving the
    /// module; every other caller (including a cycle re-entering the key)
    /// gets the existing slot back.
    pub fn intern(&self, path: impl AsRef<std::path::Path>, context: ContextName) -> Result<Interned> {
        let id = ModuleId::with_context(path, context)?;
        let fresh = match self.slots.entry(id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::InFlight);
                true
            }
        };
        Ok(Interned { id, fresh })
    }

    /// Store the finished module for an interned key.
    ///
    /// Re-completing a key replaces the stored module; the transition pass
    /// uses this to patch edges before the graph is finalized.
    pub fn complete(&self, module: Arc<Module>) {
        self.slots.insert(module.id.clone(), Slot::Ready(module));
    }

    /// Look up a completed module.
    ///
    /// Fails with [`Error::NotFound`] for unregistered ids and for ids whose
    /// resolution is still in flight.
    pub fn lookup(&self, id: &ModuleId) -> Result<Arc<Module>> {
        match self.slots.get(id).map(|slot| slot.value().clone()) {
            Some(Slot::Ready(module)) => Ok(module),
            Some(Slot::InFlight) | None => Err(Error::NotFound(id.clone())),
        }
    }

    /// True while the key is interned but not yet completed.
    pub fn is_in_flight(&self, id: &ModuleId) -> bool {
        matches!(
            self.slots.get(id).map(|slot| matches!(slot.value(), Slot::InFlight)),
            Some(true)
        )
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.slots.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent_per_key() {
        let registry = ModuleRegistry::new();
        let first = registry
            .intern("src/a.js", ContextName::server())
            .unwrap();
        let second = registry
            .intern("src/a.js", ContextName::server())
            .unwrap();
        assert!(first.fresh);
        assert!(!second.fresh);
        assert_eq!(first.id, second.id);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn contexts_intern_separately() {
        let registry = ModuleRegistry::new();
        let server = registry.intern("src/a.js", ContextName::server()).unwrap();
        let client = registry
            .intern("src/a.js", ContextName::new("client"))
            .unwrap();
        assert!(server.fresh);
        assert!(client.fresh);
        assert_ne!(server.id, client.id);
    }

    #[test]
    fn lookup_distinguishes_in_flight_from_ready() {
        let registry = ModuleRegistry::new();
        let interned = registry.intern("src/a.js", ContextName::server()).unwrap();
        assert!(registry.is_in_flight(&interned.id));
        assert!(matches!(
            registry.lookup(&interned.id),
            Err(Error::NotFound(_))
        ));

        let module = Arc::new(Module::builder(interned.id.clone(), "export {};").build());
        registry.complete(module);
        assert!(!registry.is_in_flight(&interned.id));
        assert!(registry.lookup(&interned.id).is_ok());
    }

    #[test]
    fn lookup_of_unregistered_id_fails() {
        let registry = ModuleRegistry::new();
        let id = ModuleId::new("missing.js").unwrap();
        assert!(matches!(registry.lookup(&id), Err(Error::NotFound(_))));
    }
}
