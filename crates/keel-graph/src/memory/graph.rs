//! ModuleGraph storage.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::external_dep::ExternalDependency;
use crate::module::Module;
use crate::module_id::ModuleId;

#[derive(Debug, Default)]
pub(crate) struct GraphInner {
    pub(crate) modules: FxHashMap<ModuleId, Arc<Module>>,
    pub(crate) dependencies: FxHashMap<ModuleId, FxHashSet<ModuleId>>,
    pub(crate) dependents: FxHashMap<ModuleId, FxHashSet<ModuleId>>,
    /// Entry points in insertion order; order seeds chunk-group ordering.
    pub(crate) entry_points: Vec<ModuleId>,
    pub(crate) externals: FxHashMap<String, ExternalDependency>,
}

/// Directed (possibly cyclic) module graph for one build.
///
/// Clones share the same storage. Reads take a shared lock; mutation only
/// happens while a build assembles or patches the graph, never after it is
/// finalized.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    pub(crate) inner: Arc<RwLock<GraphInner>>,
}
