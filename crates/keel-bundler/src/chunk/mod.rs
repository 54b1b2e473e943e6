//! Chunks and chunk groups.

mod plan;

use serde::{Deserialize, Serialize};

use keel_graph::ModuleId;

pub use plan::{ChunkPlanner, EntryRoot};

/// Stable chunk identity, derived from the chunk root (plus a part ordinal
/// when a size split applies), never from insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(String);

impl ChunkId {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One emitted unit of modules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    /// Modules in instantiation order (dependencies before importers).
    pub modules: Vec<ModuleId>,
    /// Eager chunks load with their group; lazy chunks load on demand
    /// behind a dynamic edge.
    pub eager: bool,
    /// BLAKE3 fingerprint over the ordered (id, content hash) pairs.
    pub fingerprint: String,
}

impl Chunk {
    /// Filename the emitter writes this chunk under.
    pub fn filename(&self) -> String {
        let short = &self.fingerprint[..self.fingerprint.len().min(8)];
        format!("{}.{short}.js", sanitize(self.id.as_str()))
    }
}

/// Why a chunk group exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkGroupKind {
    /// A build entry point's bundle.
    Entry,
    /// A transitioned subgraph's bundle (e.g. the client variant of a page),
    /// handed to the render handler as its chunk-group artifact.
    Transition,
}

/// Ordered chunks forming one loadable unit for one consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkGroup {
    pub name: String,
    pub kind: ChunkGroupKind,
    /// The module the group instantiates last (its entry).
    pub entry: ModuleId,
    /// Eager chunks first (shared before root), then lazy chunks in stable
    /// order.
    pub chunks: Vec<ChunkId>,
}

/// Output of the chunking engine for one build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkPlan {
    pub chunks: Vec<Chunk>,
    pub groups: Vec<ChunkGroup>,
}

impl ChunkPlan {
    pub fn chunk(&self, id: &ChunkId) -> Option<&Chunk> {
        self.chunks.iter().find(|chunk| &chunk.id == id)
    }

    pub fn group(&self, name: &str) -> Option<&ChunkGroup> {
        self.groups.iter().find(|group| group.name == name)
    }

    /// Every module assigned anywhere, each exactly once.
    pub fn assigned_modules(&self) -> Vec<&ModuleId> {
        self.chunks.iter().flat_map(|c| c.modules.iter()).collect()
    }
}

/// Chunking policy knobs. Only the determinism and sharing invariants are
/// fixed; the size threshold is configurable and off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPolicy {
    /// Split a chunk when its accumulated source size exceeds this many
    /// bytes. Splits only ever fall along the stable module order.
    #[serde(default)]
    pub max_chunk_size: Option<usize>,
}

fn sanitize(id: &str) -> String {
    id.chars()
        .map(|ch| if ch.is_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}
