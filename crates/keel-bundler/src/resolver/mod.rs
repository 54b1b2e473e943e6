//! Graph resolution.
//!
//! Walks import edges from an entry point, interning each (source, context)
//! key in the registry before reading it. Static edges recurse eagerly
//! within the pass; dynamic edges are recorded as deferred and their
//! subgraphs resolve after the eager frontier drains, seeding lazy chunk
//! boundaries. Cyclic imports hit the registry's in-flight slot and reuse
//! the existing key instead of recursing.

pub mod specifier;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace};

use keel_graph::{
    ContextName, EdgeKind, Import, Module, ModuleGraph, ModuleId, ModuleRef, ModuleRegistry,
    Runtime, TransitionTable,
};

use crate::scan::scan_source;
use crate::{Error, Result};

pub use specifier::{ExternalsPolicy, ResolvedSpecifier, SpecifierResolver};

/// Defensive recursion cap. Correct cycle detection means this is never
/// reached; hitting it is a resolver bug surfaced as `CycleOverflow`
/// instead of a stack blowout.
pub const DEFAULT_MAX_DEPTH: usize = 2048;

/// An edge that could not be resolved in the current context because a
/// transition directive covers it. The transition pass consumes these.
#[derive(Debug, Clone)]
pub struct PendingTransition {
    pub importer: ModuleId,
    pub import_index: usize,
    pub specifier: String,
    pub transition: ContextName,
    pub kind: EdgeKind,
}

/// Result of resolving one entry point.
#[derive(Debug)]
pub struct ResolveOutcome {
    pub entry: ModuleId,
    pub pending_transitions: Vec<PendingTransition>,
}

/// Resolves entry points into the shared module graph.
pub struct GraphResolver {
    runtime: Arc<dyn Runtime>,
    registry: Arc<ModuleRegistry>,
    specifiers: SpecifierResolver,
    transitions: Arc<TransitionTable>,
    max_depth: usize,
}

struct WorkItem {
    path: PathBuf,
    context: ContextName,
    depth: usize,
    is_entry: bool,
}

impl GraphResolver {
    pub fn new(
        runtime: Arc<dyn Runtime>,
        registry: Arc<ModuleRegistry>,
        specifiers: SpecifierResolver,
        transitions: Arc<TransitionTable>,
    ) -> Self {
        Self {
            runtime,
            registry,
            specifiers,
            transitions,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    /// Resolve the full reachable graph from one entry source, marking the
    /// root as a build entry point.
    ///
    /// Every resolved module lands in `graph` under `context`. Edges whose
    /// transition directive names a different context are left deferred and
    /// reported in the outcome for the transition pass.
    pub async fn resolve_entry(
        &self,
        graph: &ModuleGraph,
        entry: &Path,
        context: &ContextName,
    ) -> Result<ResolveOutcome> {
        self.resolve_root(graph, entry, context, true).await
    }

    /// Resolve a subgraph root without marking it as a build entry point.
    /// The transition engine resolves transitioned roots through this.
    pub async fn resolve_subgraph(
        &self,
        graph: &ModuleGraph,
        root: &Path,
        context: &ContextName,
    ) -> Result<ResolveOutcome> {
        self.resolve_root(graph, root, context, false).await
    }

    /// Resolve a single specifier under an explicit context, without
    /// recursing into the target.
    pub async fn resolve_specifier(
        &self,
        specifier: &str,
        importer_dir: &Path,
        context: &ContextName,
    ) -> Result<Option<ResolvedSpecifier>> {
        let active_context = if context.is_server() {
            None
        } else {
            Some(self.transitions.get(context).ok_or_else(|| Error::Transition {
                name: context.to_string(),
                reason: "context is not registered in the transition table".to_string(),
            })?)
        };
        Ok(self
            .specifiers
            .resolve(specifier, importer_dir, active_context.as_deref())
            .await)
    }

    async fn resolve_root(
        &self,
        graph: &ModuleGraph,
        entry: &Path,
        context: &ContextName,
        mark_entry: bool,
    ) -> Result<ResolveOutcome> {
        if !self.runtime.exists(entry).await {
            return Err(Error::Resolution {
                specifier: entry.display().to_string(),
                importer: None,
            });
        }

        let entry_id = ModuleId::with_context(entry, context.clone())?;
        debug!(entry = %entry_id, "resolving entry");

        let mut pending_transitions = Vec::new();
        // (importer, import index) pairs for dynamic edges, flipped from
        // Deferred to Dynamic once their subgraph has resolved
        let mut dynamic_edges: Vec<(ModuleId, usize)> = Vec::new();

        let mut eager: VecDeque<WorkItem> = VecDeque::new();
        let mut deferred: VecDeque<WorkItem> = VecDeque::new();
        eager.push_back(WorkItem {
            path: entry.to_path_buf(),
            context: context.clone(),
            depth: 0,
            is_entry: mark_entry,
        });

        loop {
            let item = match eager.pop_front() {
                Some(item) => Some(item),
                // eager frontier drained: recurse into dynamic targets
                None => deferred.pop_front(),
            };
            let Some(item) = item else { break };

            self.resolve_one(
                graph,
                item,
                &mut eager,
                &mut deferred,
                &mut pending_transitions,
                &mut dynamic_edges,
            )
            .await?;
        }

        // All subgraphs are resolved; dynamic edges stop being deferred.
        for (importer, index) in dynamic_edges {
            graph.update_module(&importer, |module| {
                let imports = Arc::make_mut(&mut module.imports);
                if let Some(import) = imports.get_mut(index) {
                    import.kind = EdgeKind::Dynamic;
                }
            })?;
            if let Ok(updated) = graph.module(&importer) {
                self.registry.complete(updated);
            }
        }

        Ok(ResolveOutcome {
            entry: entry_id,
            pending_transitions,
        })
    }

    async fn resolve_one(
        &self,
        graph: &ModuleGraph,
        item: WorkItem,
        eager: &mut VecDeque<WorkItem>,
        deferred: &mut VecDeque<WorkItem>,
        pending_transitions: &mut Vec<PendingTransition>,
        dynamic_edges: &mut Vec<(ModuleId, usize)>,
    ) -> Result<()> {
        let interned = self.registry.intern(&item.path, item.context.clone())?;
        if !interned.fresh {
            // already resolved, or in flight further up a cycle
            if item.is_entry {
                graph.add_entry_point(interned.id)?;
            }
            return Ok(());
        }
        let id = interned.id;

        if item.depth > self.max_depth {
            return Err(Error::CycleOverflow {
                module: id,
                depth: item.depth,
            });
        }

        let source = self.runtime.read(&item.path).await.map_err(|err| {
            Error::Resolution {
                specifier: format!("{} ({err})", item.path.display()),
                importer: None,
            }
        })?;

        // The active context's alias rules apply to everything resolved
        // inside it.
        let active_context = if item.context.is_server() {
            None
        } else {
            Some(self.transitions.get(&item.context).ok_or_else(|| {
                Error::Transition {
                    name: item.context.to_string(),
                    reason: "context is not registered in the transition table".to_string(),
                }
            })?)
        };

        let importer_dir = item
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let scanned = scan_source(&source);
        trace!(module = %id, edges = scanned.len(), "scanned module");

        let mut imports = Vec::with_capacity(scanned.len());
        for (index, scan) in scanned.into_iter().enumerate() {
            // A directive naming a different context defers the edge to the
            // transition pass. Naming the current context is a no-op
            // re-entry and resolves like any other edge.
            if let Some(transition) = scan.transition.as_ref() {
                if *transition != item.context {
                    pending_transitions.push(PendingTransition {
                        importer: id.clone(),
                        import_index: index,
                        specifier: scan.specifier.clone(),
                        transition: transition.clone(),
                        kind: scan.kind,
                    });
                    imports.push(
                        Import::new(scan.specifier, EdgeKind::Deferred)
                            .with_transition(transition.clone()),
                    );
                    continue;
                }
            }

            let resolved = self
                .specifiers
                .resolve(&scan.specifier, &importer_dir, active_context.as_deref())
                .await
                .ok_or_else(|| Error::Resolution {
                    specifier: scan.specifier.clone(),
                    importer: Some(id.clone()),
                })?;

            match resolved {
                ResolvedSpecifier::External(external) => {
                    let handle = graph.intern_external(&external, id.clone());
                    imports.push(
                        Import::new(scan.specifier, scan.kind)
                            .resolved_to(ModuleRef::external(handle)),
                    );
                }
                ResolvedSpecifier::Source(target_path) => {
                    let target_id =
                        ModuleId::with_context(&target_path, item.context.clone())?;
                    graph.add_dependency(id.clone(), target_id.clone())?;

                    match scan.kind {
                        EdgeKind::Static => {
                            eager.push_back(WorkItem {
                                path: target_path,
                                context: item.context.clone(),
                                depth: item.depth + 1,
                                is_entry: false,
                            });
                            imports.push(
                                Import::new(scan.specifier, EdgeKind::Static)
                                    .resolved_to(ModuleRef::internal(target_id)),
                            );
                        }
                        EdgeKind::Dynamic | EdgeKind::Deferred => {
                            // dynamic target: new lazy boundary, fresh depth
                            deferred.push_back(WorkItem {
                                path: target_path,
                                context: item.context.clone(),
                                depth: 0,
                                is_entry: false,
                            });
                            dynamic_edges.push((id.clone(), index));
                            imports.push(
                                Import::new(scan.specifier, EdgeKind::Deferred)
                                    .resolved_to(ModuleRef::internal(target_id)),
                            );
                        }
                    }
                }
            }
        }

        let module = Module::builder(id.clone(), source)
            .imports(imports)
            .entry(item.is_entry)
            .build();
        let stored = graph.add_module(module)?;
        self.registry.complete(stored);

        Ok(())
    }
}
