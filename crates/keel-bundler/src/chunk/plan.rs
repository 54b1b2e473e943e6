//! Chunk partitioning.
//!
//! Chunk roots are the build's entry modules, every transitioned root, and
//! every target of a dynamic edge. Each module goes to the chunk of the
//! unique root reaching it over same-context static edges; a module reached
//! by two or more roots is hoisted into the per-context shared chunk, so it
//! is never duplicated. All iteration orders are pinned (entry order, then
//! sorted ids), which makes assignment reproducible run to run.

use rustc_hash::{FxHashMap, FxHashSet};

use keel_graph::{ContextName, Module, ModuleGraph, ModuleId};

use crate::Result;

use super::{Chunk, ChunkGroup, ChunkGroupKind, ChunkId, ChunkPlan, ChunkPolicy};

/// One build entry point handed to the planner.
#[derive(Debug, Clone)]
pub struct EntryRoot {
    pub name: String,
    pub id: ModuleId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RootKind {
    Entry,
    Transition,
    Lazy,
}

struct Root {
    id: ModuleId,
    kind: RootKind,
    name: String,
}

/// Partitions a finalized graph into chunks and chunk groups.
#[derive(Debug, Default)]
pub struct ChunkPlanner {
    policy: ChunkPolicy,
}

impl ChunkPlanner {
    pub fn new(policy: ChunkPolicy) -> Self {
        Self { policy }
    }

    pub fn plan(
        &self,
        graph: &ModuleGraph,
        entries: &[EntryRoot],
        transition_roots: &[ModuleId],
    ) -> Result<ChunkPlan> {
        let roots = collect_roots(graph, entries, transition_roots)?;
        if roots.is_empty() {
            return Ok(ChunkPlan::default());
        }

        // Which roots reach each module over same-context static edges.
        let mut assignment: FxHashMap<ModuleId, Vec<usize>> = FxHashMap::default();
        // Dynamic targets encountered per root, for group membership.
        let mut reachable_lazy: Vec<Vec<ModuleId>> = Vec::with_capacity(roots.len());

        for (root_index, root) in roots.iter().enumerate() {
            let mut lazy = Vec::new();
            for id in static_closure(graph, &root.id, Some(&mut lazy))? {
                let slots = assignment.entry(id).or_default();
                if !slots.contains(&root_index) {
                    slots.push(root_index);
                }
            }
            lazy.sort();
            lazy.dedup();
            reachable_lazy.push(lazy);
        }

        // Shared modules (two or more roots), one shared chunk per context.
        let mut shared_by_context: FxHashMap<ContextName, Vec<ModuleId>> = FxHashMap::default();
        for (id, slots) in &assignment {
            if slots.len() >= 2 {
                shared_by_context
                    .entry(id.context().clone())
                    .or_default()
                    .push(id.clone());
            }
        }
        for modules in shared_by_context.values_mut() {
            modules.sort();
        }

        let mut chunks: Vec<Chunk> = Vec::new();
        let mut shared_chunk_ids: FxHashMap<ContextName, ChunkId> = FxHashMap::default();

        let mut contexts: Vec<ContextName> = shared_by_context.keys().cloned().collect();
        contexts.sort();
        for context in contexts {
            let modules = shared_by_context.remove(&context).expect("context present");
            let base = if context.is_server() {
                "shared".to_string()
            } else {
                format!("shared#{context}")
            };
            let parts = self.split_and_fingerprint(graph, &base, modules, true)?;
            shared_chunk_ids.insert(context, parts[0].id.clone());
            chunks.extend(parts);
        }

        // Per-root chunks hold the modules only that root reaches.
        let mut root_chunk_ids: Vec<Vec<ChunkId>> = Vec::with_capacity(roots.len());
        for (root_index, root) in roots.iter().enumerate() {
            let ordered = instantiation_order(graph, &root.id)?;
            let only_here: Vec<ModuleId> = ordered
                .into_iter()
                .filter(|id| {
                    assignment
                        .get(id)
                        .map(|slots| slots.len() == 1 && slots[0] == root_index)
                        .unwrap_or(false)
                })
                .collect();
            if only_here.is_empty() {
                root_chunk_ids.push(Vec::new());
                continue;
            }
            let eager = root.kind != RootKind::Lazy;
            let parts =
                self.split_and_fingerprint(graph, &root.id.to_string(), only_here, eager)?;
            root_chunk_ids.push(parts.iter().map(|part| part.id.clone()).collect());
            chunks.extend(parts);
        }

        // Groups: one per entry, one per transitioned root. Lazy roots do
        // not form groups; their chunks are on-demand members of the groups
        // that can reach them.
        let lazy_index_by_id: FxHashMap<ModuleId, usize> = roots
            .iter()
            .enumerate()
            .filter(|(_, root)| root.kind == RootKind::Lazy)
            .map(|(index, root)| (root.id.clone(), index))
            .collect();

        let mut groups = Vec::new();
        for (root_index, root) in roots.iter().enumerate() {
            let kind = match root.kind {
                RootKind::Entry => ChunkGroupKind::Entry,
                RootKind::Transition => ChunkGroupKind::Transition,
                RootKind::Lazy => continue,
            };

            let mut group_chunks: Vec<ChunkId> = Vec::new();
            if let Some(shared) = shared_chunk_ids.get(root.id.context()) {
                group_chunks.push(shared.clone());
            }
            group_chunks.extend(root_chunk_ids[root_index].iter().cloned());

            let mut lazy_chunks: Vec<ChunkId> = reachable_lazy[root_index]
                .iter()
                .filter_map(|target| lazy_index_by_id.get(target))
                .flat_map(|&lazy_index| root_chunk_ids[lazy_index].iter().cloned())
                .collect();
            lazy_chunks.sort();
            lazy_chunks.dedup();
            group_chunks.extend(lazy_chunks);

            groups.push(ChunkGroup {
                name: root.name.clone(),
                kind,
                entry: root.id.clone(),
                chunks: group_chunks,
            });
        }

        Ok(ChunkPlan { chunks, groups })
    }

    /// Apply the size threshold along the stable module order, then
    /// fingerprint each part.
    fn split_and_fingerprint(
        &self,
        graph: &ModuleGraph,
        base_id: &str,
        modules: Vec<ModuleId>,
        eager: bool,
    ) -> Result<Vec<Chunk>> {
        let mut parts: Vec<Vec<ModuleId>> = Vec::new();
        match self.policy.max_chunk_size {
            None => parts.push(modules),
            Some(limit) => {
                let mut current: Vec<ModuleId> = Vec::new();
                let mut current_size = 0usize;
                for id in modules {
                    let size = graph.module(&id)?.original_size;
                    if !current.is_empty() && current_size + size > limit {
                        parts.push(std::mem::take(&mut current));
                        current_size = 0;
                    }
                    current_size += size;
                    current.push(id);
                }
                if !current.is_empty() {
                    parts.push(current);
                }
            }
        }

        let multi = parts.len() > 1;
        parts
            .into_iter()
            .enumerate()
            .map(|(ordinal, modules)| {
                let id = if multi {
                    ChunkId::new(format!("{base_id}~{ordinal}"))
                } else {
                    ChunkId::new(base_id)
                };
                let fingerprint = fingerprint_modules(graph, &modules)?;
                Ok(Chunk {
                    id,
                    modules,
                    eager,
                    fingerprint,
                })
            })
            .collect()
    }
}

fn collect_roots(
    graph: &ModuleGraph,
    entries: &[EntryRoot],
    transition_roots: &[ModuleId],
) -> Result<Vec<Root>> {
    let mut roots: Vec<Root> = Vec::new();
    let mut seen: FxHashSet<ModuleId> = FxHashSet::default();

    for entry in entries {
        if seen.insert(entry.id.clone()) {
            roots.push(Root {
                id: entry.id.clone(),
                kind: RootKind::Entry,
                name: entry.name.clone(),
            });
        }
    }

    for id in transition_roots {
        if seen.insert(id.clone()) {
            roots.push(Root {
                id: id.clone(),
                kind: RootKind::Transition,
                name: id.to_string(),
            });
        }
    }

    // Dynamic-edge targets, in sorted order for stability.
    let mut lazy_targets: Vec<ModuleId> = Vec::new();
    for module in graph.modules() {
        for import in module.dynamic_imports() {
            if let Some(keel_graph::ModuleRef::Internal(target)) = &import.resolved {
                lazy_targets.push(target.clone());
            }
        }
    }
    lazy_targets.sort();
    lazy_targets.dedup();
    for id in lazy_targets {
        if seen.insert(id.clone()) {
            let name = id.to_string();
            roots.push(Root {
                id,
                kind: RootKind::Lazy,
                name,
            });
        }
    }

    Ok(roots)
}

/// Modules reachable from `root` over same-context static edges. When
/// `lazy_sink` is given, internal dynamic targets encountered along the way
/// are collected into it.
fn static_closure(
    graph: &ModuleGraph,
    root: &ModuleId,
    mut lazy_sink: Option<&mut Vec<ModuleId>>,
) -> Result<Vec<ModuleId>> {
    let mut visited: FxHashSet<ModuleId> = FxHashSet::default();
    let mut order: Vec<ModuleId> = Vec::new();
    let mut stack = vec![root.clone()];

    while let Some(id) = stack.pop() {
        if !visited.insert(id.clone()) {
            continue;
        }
        order.push(id.clone());
        let module = graph.module(&id)?;
        for import in module.imports_iter() {
            match (&import.resolved, import.kind) {
                (Some(keel_graph::ModuleRef::Internal(target)), keel_graph::EdgeKind::Static) => {
                    if target.context() == id.context() {
                        stack.push(target.clone());
                    }
                }
                (Some(keel_graph::ModuleRef::Internal(target)), keel_graph::EdgeKind::Dynamic) => {
                    if let Some(sink) = lazy_sink.as_mut() {
                        sink.push(target.clone());
                    }
                }
                _ => {}
            }
        }
    }

    Ok(order)
}

/// Deterministic instantiation order for a root's subgraph: post-order DFS
/// following the source order of static imports, so dependencies (and the
/// side-effectful first imports of an entry) instantiate before their
/// importers.
fn instantiation_order(graph: &ModuleGraph, root: &ModuleId) -> Result<Vec<ModuleId>> {
    enum Frame {
        Enter(ModuleId),
        Exit(ModuleId),
    }

    let mut visited: FxHashSet<ModuleId> = FxHashSet::default();
    let mut order: Vec<ModuleId> = Vec::new();
    let mut stack = vec![Frame::Enter(root.clone())];

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Enter(id) => {
                if !visited.insert(id.clone()) {
                    continue;
                }
                stack.push(Frame::Exit(id.clone()));
                let module = graph.module(&id)?;
                let children: Vec<ModuleId> = same_context_static_targets(&module);
                // reversed so the first import is processed first
                for child in children.into_iter().rev() {
                    if !visited.contains(&child) {
                        stack.push(Frame::Enter(child));
                    }
                }
            }
            Frame::Exit(id) => order.push(id),
        }
    }

    Ok(order)
}

fn same_context_static_targets(module: &Module) -> Vec<ModuleId> {
    module
        .static_imports()
        .filter_map(|import| match &import.resolved {
            Some(keel_graph::ModuleRef::Internal(target))
                if target.context() == module.id.context() =>
            {
                Some(target.clone())
            }
            _ => None,
        })
        .collect()
}

fn fingerprint_modules(graph: &ModuleGraph, modules: &[ModuleId]) -> Result<String> {
    let mut hasher = blake3::Hasher::new();
    for id in modules {
        hasher.update(id.to_string().as_bytes());
        hasher.update(b"\0");
        hasher.update(graph.module(id)?.content_hash.as_bytes());
        hasher.update(b"\0");
    }
    Ok(hasher.finalize().to_hex().to_string())
}
