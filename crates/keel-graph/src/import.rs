//! Import edges.

use serde::{Deserialize, Serialize};

use crate::context::ContextName;
use crate::module_ref::ModuleRef;

/// How an edge participates in resolution and chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    /// Resolved eagerly within the build pass; co-locates with its importer.
    Static,
    /// A dynamic import. Always starts a new lazy chunk boundary.
    Dynamic,
    /// Recorded but not yet recursed into. Dynamic edges and
    /// transition-annotated edges pass through this state during a build;
    /// none remain once the graph is finalized.
    Deferred,
}

/// One outgoing import edge of a module.
///
/// The importing module is implicit (edges are stored on their owner). The
/// target stays `None` until resolution assigns an internal id or an
/// external handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Import {
    pub specifier: String,
    pub kind: EdgeKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub resolved: Option<ModuleRef>,
    /// Transition directive in effect at the import site, if any. Parsed
    /// during the static scan as structured metadata on the edge.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub transition: Option<ContextName>,
}

impl Import {
    pub fn new(specifier: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            specifier: specifier.into(),
            kind,
            resolved: None,
            transition: None,
        }
    }

    pub fn with_transition(mut self, transition: ContextName) -> Self {
        self.transition = Some(transition);
        self
    }

    pub fn resolved_to(mut self, target: ModuleRef) -> Self {
        self.resolved = Some(target);
        self
    }

    pub fn is_static(&self) -> bool {
        self.kind == EdgeKind::Static
    }

    pub fn is_dynamic(&self) -> bool {
        self.kind == EdgeKind::Dynamic
    }

    pub fn is_deferred(&self) -> bool {
        self.kind == EdgeKind::Deferred
    }

    /// True once the edge points at a concrete internal or external target.
    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }
}

// Serde impls for ModuleRef exist only to round-trip graph snapshots in
// tests and tooling; external handles lose their identity across the trip
// and must not be compared after deserialization.
impl Serialize for ModuleRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ModuleRef::Internal(id) => serializer.serialize_newtype_variant("ModuleRef", 0, "internal", id),
            ModuleRef::External(handle) => {
                serializer.serialize_newtype_variant("ModuleRef", 1, "external", &handle.specifier)
            }
        }
    }
}

impl<'de> Deserialize<'de> for ModuleRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(rename_all = "lowercase")]
        enum Repr {
            Internal(crate::module_id::ModuleId),
            External(String),
        }
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Internal(id) => ModuleRef::Internal(id),
            Repr::External(specifier) => {
                ModuleRef::External(crate::module_ref::ExternalModule::handle(specifier))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_attaches_transition() {
        let import = Import::new("./chunk-entry", EdgeKind::Static)
            .with_transition(ContextName::new("client"));
        assert_eq!(import.transition, Some(ContextName::new("client")));
        assert!(!import.is_resolved());
    }

    #[test]
    fn kind_predicates() {
        assert!(Import::new("a", EdgeKind::Static).is_static());
        assert!(Import::new("a", EdgeKind::Dynamic).is_dynamic());
        assert!(Import::new("a", EdgeKind::Deferred).is_deferred());
    }
}
