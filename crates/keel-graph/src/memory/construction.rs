//! Construction methods for ModuleGraph.

use crate::module::Module;
use crate::Result;

use super::graph::ModuleGraph;

impl ModuleGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a graph from an iterator of modules (without edges).
    pub fn from_modules<I>(modules: I) -> Result<Self>
    where
        I: IntoIterator<Item = Module>,
    {
        let graph = Self::new();
        for module in modules {
            graph.add_module(module)?;
        }
        Ok(graph)
    }
}
