//! Module-id manifest.
//!
//! The manifest maps module identity to the numeric id the runtime loader
//! uses. Externals are excluded by construction: they never receive an id
//! and are compared by reference instead. Assignment iterates sorted
//! identities, so a fixed graph always yields a byte-identical manifest.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::module::Module;
use crate::module_id::ModuleId;
use crate::Result;

/// Current manifest format version.
const MANIFEST_VERSION: u32 = 1;

/// Mapping from module identity to assigned runtime module id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    /// BTreeMap keeps emission order independent of insertion order.
    pub modules: BTreeMap<ModuleId, u32>,
}

impl Manifest {
    /// Assign ids over the given modules in sorted-identity order.
    ///
    /// Externals never reach this function: they are not modules, only
    /// terminal handles on edges.
    pub fn assign<'a, I>(modules: I) -> Self
    where
        I: IntoIterator<Item = &'a Module>,
    {
        let mut sorted: Vec<&Module> = modules.into_iter().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));
        let modules = sorted
            .into_iter()
            .enumerate()
            .map(|(index, module)| (module.id.clone(), index as u32))
            .collect();
        Self {
            version: MANIFEST_VERSION,
            modules,
        }
    }

    /// The runtime id assigned to a module identity.
    pub fn module_id(&self, id: &ModuleId) -> Option<u32> {
        self.modules.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Serialize to canonical JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|err| crate::Error::Operation(err.to_string()))
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|err| crate::Error::Operation(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextName;

    fn module(path: &str) -> Module {
        Module::builder(ModuleId::new(path).unwrap(), "export {};").build()
    }

    #[test]
    fn assignment_is_sorted_and_dense() {
        let b = module("src/b.js");
        let a = module("src/a.js");
        let manifest = Manifest::assign([&b, &a]);
        assert_eq!(manifest.module_id(&a.id), Some(0));
        assert_eq!(manifest.module_id(&b.id), Some(1));
    }

    #[test]
    fn context_variants_get_distinct_ids() {
        let server = module("src/a.js");
        let client = Module::builder(
            server.id.in_context(ContextName::new("client")),
            "export {};",
        )
        .build();
        let manifest = Manifest::assign([&server, &client]);
        assert_eq!(manifest.len(), 2);
        assert_ne!(
            manifest.module_id(&server.id),
            manifest.module_id(&client.id)
        );
    }

    #[test]
    fn json_round_trips_byte_identically() {
        let manifest = Manifest::assign([&module("src/a.js"), &module("src/b.js")]);
        let first = manifest.to_json().unwrap();
        let reparsed = Manifest::from_json(&first).unwrap();
        assert_eq!(reparsed, manifest);
        assert_eq!(reparsed.to_json().unwrap(), first);
    }
}
