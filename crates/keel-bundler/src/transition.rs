//! Transition application.
//!
//! Entering a named transition re-resolves a subgraph under the transition's
//! context, minting parallel module entities keyed (source, context) so the
//! originals are never touched. Application is memoized by (original id,
//! transition name): re-entering an already-transitioned subgraph returns
//! the same transitioned root, never a second copy.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use keel_graph::{
    ContextName, ModuleGraph, ModuleId, ModuleRef, ModuleRegistry, TransitionTable,
};

use crate::resolver::{GraphResolver, PendingTransition, ResolvedSpecifier};
use crate::{Error, Result};

/// Applies named transitions to subgraphs and patches the deferred edges
/// that requested them.
pub struct TransitionEngine {
    table: Arc<TransitionTable>,
    registry: Arc<ModuleRegistry>,
    /// (original id, transition name) -> transitioned root id.
    memo: DashMap<(ModuleId, ContextName), ModuleId>,
    /// Transitioned roots in application order; each becomes a chunk group.
    roots: parking_lot::Mutex<Vec<ModuleId>>,
}

impl TransitionEngine {
    pub fn new(table: Arc<TransitionTable>, registry: Arc<ModuleRegistry>) -> Self {
        Self {
            table,
            registry,
            memo: DashMap::new(),
            roots: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Enter a named transition at a module already present in the graph.
    ///
    /// Returns the transitioned root id. Idempotent: the memo hands back
    /// the same id for repeated entry, and entering a module that already
    /// lives in the target context is a no-op returning the module itself.
    pub async fn enter(
        &self,
        graph: &ModuleGraph,
        resolver: &GraphResolver,
        root: &ModuleId,
        transition: &ContextName,
    ) -> Result<ModuleId> {
        if root.context() == transition {
            return Ok(root.clone());
        }
        self.require_known(transition)?;

        let mut queue = VecDeque::new();
        let entered = self
            .enter_path(
                graph,
                resolver,
                root.as_path(),
                root,
                transition,
                &mut queue,
            )
            .await?;
        self.drain(graph, resolver, queue).await?;
        Ok(entered)
    }

    /// Process the deferred transition edges recorded during resolution,
    /// transitively: a transitioned subgraph may itself defer edges into
    /// further contexts.
    pub async fn apply_pending(
        &self,
        graph: &ModuleGraph,
        resolver: &GraphResolver,
        pending: Vec<PendingTransition>,
    ) -> Result<()> {
        self.drain(graph, resolver, VecDeque::from(pending)).await
    }

    /// Transitioned roots in application order.
    pub fn transitioned_roots(&self) -> Vec<ModuleId> {
        self.roots.lock().clone()
    }

    fn require_known(&self, transition: &ContextName) -> Result<()> {
        if self.table.contains(transition) {
            Ok(())
        } else {
            Err(Error::Transition {
                name: transition.to_string(),
                reason: "unknown transition name".to_string(),
            })
        }
    }

    async fn drain(
        &self,
        graph: &ModuleGraph,
        resolver: &GraphResolver,
        mut queue: VecDeque<PendingTransition>,
    ) -> Result<()> {
        while let Some(pending) = queue.pop_front() {
            self.require_known(&pending.transition)?;

            let importer_dir = pending
                .importer
                .as_path()
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();

            let resolved = resolver
                .resolve_specifier(&pending.specifier, &importer_dir, &pending.transition)
                .await?
                .ok_or_else(|| Error::Resolution {
                    specifier: pending.specifier.clone(),
                    importer: Some(pending.importer.clone()),
                })?;

            let target = match resolved {
                ResolvedSpecifier::External(external) => ModuleRef::external(
                    graph.intern_external(&external, pending.importer.clone()),
                ),
                ResolvedSpecifier::Source(path) => {
                    let base_id = ModuleId::with_context(
                        &path,
                        pending.importer.context().clone(),
                    )?;
                    let transitioned = self
                        .enter_path(
                            graph,
                            resolver,
                            &path,
                            &base_id,
                            &pending.transition,
                            &mut queue,
                        )
                        .await?;
                    graph.add_dependency(pending.importer.clone(), transitioned.clone())?;
                    ModuleRef::internal(transitioned)
                }
            };

            // Patch the deferred edge in place: original kind restored, the
            // transition annotation kept as provenance.
            let updated = graph.update_module(&pending.importer, |module| {
                let imports = Arc::make_mut(&mut module.imports);
                if let Some(import) = imports.get_mut(pending.import_index) {
                    import.kind = pending.kind;
                    import.resolved = Some(target.clone());
                }
            })?;
            self.registry.complete(updated);
        }
        Ok(())
    }

    /// Memoized subgraph entry for one concrete source path.
    async fn enter_path(
        &self,
        graph: &ModuleGraph,
        resolver: &GraphResolver,
        path: &Path,
        original: &ModuleId,
        transition: &ContextName,
        queue: &mut VecDeque<PendingTransition>,
    ) -> Result<ModuleId> {
        let key = (original.clone(), transition.clone());
        if let Some(hit) = self.memo.get(&key) {
            return Ok(hit.clone());
        }

        debug!(original = %original, transition = %transition, "entering transition");
        let path: PathBuf = path.to_path_buf();
        let outcome = resolver.resolve_subgraph(graph, &path, transition).await?;
        self.memo.insert(key, outcome.entry.clone());
        {
            let mut roots = self.roots.lock();
            if !roots.contains(&outcome.entry) {
                roots.push(outcome.entry.clone());
            }
        }
        queue.extend(outcome.pending_transitions);
        Ok(outcome.entry)
    }
}
