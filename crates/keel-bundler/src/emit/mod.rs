//! Chunk serialization and the runtime handoff surface.
//!
//! Each chunk becomes one loadable asset: a registration call installing
//! the chunk's module factories keyed by their manifest ids. Chunks
//! serialize in parallel; a chunk group's handle is only finalized (and
//! its load-completion signal fired) after every constituent chunk has
//! serialized.

use std::sync::Arc;

use rayon::prelude::*;
use tokio::sync::watch;
use tracing::debug;

use keel_graph::{Manifest, ModuleGraph, ModuleId};

use crate::chunk::{Chunk, ChunkGroupKind, ChunkId, ChunkPlan};
use crate::{Error, Result};

/// One serialized chunk file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedAsset {
    pub filename: String,
    pub code: String,
}

/// Reference to a chunk from a group handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRef {
    pub id: ChunkId,
    pub filename: String,
    pub eager: bool,
}

/// Runtime-loadable chunk-group handle.
///
/// This is the artifact the external render handler receives: the ordered
/// chunk list, the entry module id, and a completion signal a runtime
/// loader can await.
#[derive(Debug, Clone)]
pub struct ChunkGroupHandle {
    pub name: String,
    pub kind: ChunkGroupKind,
    pub entry: ModuleId,
    /// Manifest id of the entry module.
    pub entry_module_id: Option<u32>,
    pub chunks: Vec<ChunkRef>,
    ready: watch::Receiver<bool>,
    // keeps the channel open for as long as any handle clone lives
    _ready_tx: Arc<watch::Sender<bool>>,
}

impl ChunkGroupHandle {
    /// Wait until the group's chunks are all serialized.
    pub async fn ready(&self) -> bool {
        let mut ready = self.ready.clone();
        let ok = ready.wait_for(|done| *done).await.is_ok();
        ok
    }

    /// Non-blocking readiness probe.
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Eager chunks in load order.
    pub fn eager_chunks(&self) -> impl Iterator<Item = &ChunkRef> {
        self.chunks.iter().filter(|chunk| chunk.eager)
    }
}

/// Everything one build pass emits.
#[derive(Debug, Clone)]
pub struct EmitOutput {
    pub assets: Vec<EmittedAsset>,
    pub manifest: Manifest,
    pub manifest_json: String,
    pub groups: Vec<ChunkGroupHandle>,
}

impl EmitOutput {
    pub fn group(&self, name: &str) -> Option<&ChunkGroupHandle> {
        self.groups.iter().find(|group| group.name == name)
    }
}

/// Serialize a chunk plan against a finalized graph and manifest.
pub fn emit(graph: &ModuleGraph, plan: &ChunkPlan, manifest: &Manifest) -> Result<EmitOutput> {
    let assets: Vec<EmittedAsset> = plan
        .chunks
        .par_iter()
        .map(|chunk| serialize_chunk(graph, chunk, manifest))
        .collect::<Result<Vec<_>>>()?;

    debug!(chunks = assets.len(), groups = plan.groups.len(), "serialized chunks");

    // Chunks are all serialized; groups finalize and signal readiness.
    let groups = plan
        .groups
        .iter()
        .map(|group| {
            let chunks = group
                .chunks
                .iter()
                .map(|id| {
                    let chunk = plan.chunk(id).ok_or_else(|| Error::Emit {
                        module: group.entry.clone(),
                        reason: format!("chunk group references unknown chunk {id}"),
                    })?;
                    Ok(ChunkRef {
                        id: chunk.id.clone(),
                        filename: chunk.filename(),
                        eager: chunk.eager,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let (tx, rx) = watch::channel(false);
            tx.send_replace(true);
            Ok(ChunkGroupHandle {
                name: group.name.clone(),
                kind: group.kind,
                entry: group.entry.clone(),
                entry_module_id: manifest.module_id(&group.entry),
                chunks,
                ready: rx,
                _ready_tx: Arc::new(tx),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let manifest_json = String::from_utf8(manifest.to_json()?)
        .map_err(|err| Error::InvalidConfig(format!("manifest is not UTF-8: {err}")))?;

    Ok(EmitOutput {
        assets,
        manifest: manifest.clone(),
        manifest_json,
        groups,
    })
}

/// Serialize one chunk into instantiation code.
///
/// A serialization failure carries the failing module's identity and aborts
/// only this build pass.
fn serialize_chunk(graph: &ModuleGraph, chunk: &Chunk, manifest: &Manifest) -> Result<EmittedAsset> {
    let mut code = String::new();
    code.push_str(&format!(
        "// keel chunk: {} ({})\n",
        chunk.id, chunk.fingerprint
    ));
    code.push_str(&format!(
        "keelRuntime.registerChunk(\"{}\", {{\n",
        chunk.id
    ));

    for id in &chunk.modules {
        let module = graph.module(id).map_err(|err| Error::Emit {
            module: id.clone(),
            reason: format!("module missing from graph during emit: {err}"),
        })?;
        let runtime_id = manifest.module_id(id).ok_or_else(|| Error::Emit {
            module: id.clone(),
            reason: "module has no manifest id".to_string(),
        })?;

        code.push_str(&format!(
            "{runtime_id}: (function(module, exports, require) {{ // {id}\n"
        ));
        code.push_str(&module.source);
        if !module.source.ends_with('\n') {
            code.push('\n');
        }
        code.push_str("}),\n");
    }

    code.push_str("});\n");

    Ok(EmittedAsset {
        filename: chunk.filename(),
        code,
    })
}
