//! Cycle analysis for ModuleGraph.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::module_id::ModuleId;

use super::graph::ModuleGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InStack,
    Done,
}

impl ModuleGraph {
    /// Collect import cycles.
    ///
    /// Iterative DFS over sorted ids so the result is deterministic. Each
    /// cycle is reported once, as the id sequence from the first revisited
    /// module back to itself.
    pub fn cycles(&self) -> Vec<Vec<ModuleId>> {
        let (ids, edges) = {
            let inner = self.inner.read();
            let mut ids: Vec<ModuleId> = inner.modules.keys().cloned().collect();
            ids.sort();
            let mut edges: FxHashMap<ModuleId, Vec<ModuleId>> = FxHashMap::default();
            for (from, targets) in &inner.dependencies {
                let mut sorted: Vec<ModuleId> = targets.iter().cloned().collect();
                sorted.sort();
                edges.insert(from.clone(), sorted);
            }
            (ids, edges)
        };

        let mut state: FxHashMap<ModuleId, VisitState> = FxHashMap::default();
        let mut cycles = Vec::new();
        let mut seen_cycles: FxHashSet<Vec<ModuleId>> = FxHashSet::default();

        for root in &ids {
            if state.contains_key(root) {
                continue;
            }
            // (node, next child index)
            let mut stack: Vec<(ModuleId, usize)> = vec![(root.clone(), 0)];
            state.insert(root.clone(), VisitState::InStack);

            while let Some((node, child_idx)) = stack.last().cloned() {
                let children = edges.get(&node).map(Vec::as_slice).unwrap_or(&[]);
                if child_idx >= children.len() {
                    state.insert(node, VisitState::Done);
                    stack.pop();
                    continue;
                }
                stack.last_mut().expect("stack non-empty").1 += 1;
                let child = children[child_idx].clone();
                match state.get(&child) {
                    Some(VisitState::InStack) => {
                        let start = stack
                            .iter()
                            .position(|(id, _)| *id == child)
                            .expect("in-stack node is on the stack");
                        let mut cycle: Vec<ModuleId> =
                            stack[start..].iter().map(|(id, _)| id.clone()).collect();
                        // canonical rotation so the same cycle dedupes
                        let min_pos = cycle
                            .iter()
                            .enumerate()
                            .min_by(|(_, a), (_, b)| a.cmp(b))
                            .map(|(i, _)| i);
                        if let Some(min_pos) = min_pos {
                            cycle.rotate_left(min_pos);
                        }
                        if seen_cycles.insert(cycle.clone()) {
                            cycles.push(cycle);
                        }
                    }
                    Some(VisitState::Done) => {}
                    None => {
                        state.insert(child.clone(), VisitState::InStack);
                        stack.push((child, 0));
                    }
                }
            }
        }

        cycles
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycles().is_empty()
    }
}
