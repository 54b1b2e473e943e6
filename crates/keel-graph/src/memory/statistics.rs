//! Aggregate statistics for ModuleGraph.

use serde::Serialize;

use super::graph::ModuleGraph;

/// Build-level counters surfaced in logs and CLI summaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStatistics {
    pub module_count: usize,
    pub edge_count: usize,
    pub external_count: usize,
    pub entry_count: usize,
    pub cycle_count: usize,
}

impl ModuleGraph {
    pub fn statistics(&self) -> GraphStatistics {
        let cycle_count = self.cycles().len();
        let inner = self.inner.read();
        GraphStatistics {
            module_count: inner.modules.len(),
            edge_count: inner.dependencies.values().map(|set| set.len()).sum(),
            external_count: inner.externals.len(),
            entry_count: inner.entry_points.len(),
            cycle_count,
        }
    }
}
