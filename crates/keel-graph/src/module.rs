//! Module entities.
//!
//! A `Module` is one compiled unit of source under a specific transition
//! context. Modules are created during resolution and are immutable once
//! the graph is finalized for a build; rebuilds replace entities wholesale.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::ContextName;
use crate::import::Import;
use crate::module_id::ModuleId;

/// Resolved module metadata used by graph algorithms, chunking, and the
/// emitter.
///
/// Source content and the edge list are wrapped in `Arc` so cloning a module
/// out of the graph stays cheap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub path: PathBuf,
    pub source_type: SourceType,
    /// Raw source content the emitter serializes into the chunk.
    pub source: Arc<str>,
    /// BLAKE3 hex digest of `source`; feeds chunk fingerprints and the
    /// build cache key.
    pub content_hash: String,
    #[serde(with = "arc_vec_serde")]
    pub imports: Arc<Vec<Import>>,
    pub is_entry: bool,
    pub original_size: usize,
}

mod arc_vec_serde {
    use super::*;
    use serde::de::Deserializer;
    use serde::ser::Serializer;

    pub fn serialize<S, T>(value: &Arc<Vec<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        value.as_ref().serialize(serializer)
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Arc<Vec<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Vec::deserialize(deserializer).map(Arc::new)
    }
}

impl Module {
    /// Create a module builder with the content hash precomputed.
    pub fn builder(id: ModuleId, source: impl Into<Arc<str>>) -> ModuleBuilder {
        let source: Arc<str> = source.into();
        let content_hash = blake3::hash(source.as_bytes()).to_hex().to_string();
        let path = id.as_path().to_path_buf();
        let source_type = SourceType::from_path(&path);
        let original_size = source.len();
        ModuleBuilder {
            module: Self {
                id,
                path,
                source_type,
                source,
                content_hash,
                imports: Arc::new(Vec::new()),
                is_entry: false,
                original_size,
            },
        }
    }

    /// The transition context the module was compiled under.
    pub fn context(&self) -> &ContextName {
        self.id.context()
    }

    pub fn imports_iter(&self) -> impl Iterator<Item = &Import> {
        self.imports.iter()
    }

    /// Static edges only, in source order.
    pub fn static_imports(&self) -> impl Iterator<Item = &Import> {
        self.imports.iter().filter(|imp| imp.is_static())
    }

    /// Dynamic edges only, in source order.
    pub fn dynamic_imports(&self) -> impl Iterator<Item = &Import> {
        self.imports.iter().filter(|imp| imp.is_dynamic())
    }

    /// True while any edge is still deferred; a finalized graph contains no
    /// such module.
    pub fn has_deferred_edges(&self) -> bool {
        self.imports.iter().any(Import::is_deferred)
    }

    pub fn has_import_from(&self, specifier: &str) -> bool {
        self.imports.iter().any(|imp| imp.specifier == specifier)
    }
}

/// Builder for `Module` to avoid long constructor argument lists.
pub struct ModuleBuilder {
    module: Module,
}

impl ModuleBuilder {
    pub fn imports(mut self, imports: Vec<Import>) -> Self {
        self.module.imports = Arc::new(imports);
        self
    }

    pub fn entry(mut self, is_entry: bool) -> Self {
        self.module.is_entry = is_entry;
        self
    }

    pub fn source_type(mut self, source_type: SourceType) -> Self {
        self.module.source_type = source_type;
        self
    }

    pub fn build(self) -> Module {
        self.module
    }
}

/// Source type derived from file extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    JavaScript,
    TypeScript,
    Jsx,
    Tsx,
    Json,
    Unknown,
}

impl SourceType {
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "js" | "mjs" | "cjs" => Self::JavaScript,
            "ts" | "mts" | "cts" => Self::TypeScript,
            "jsx" => Self::Jsx,
            "tsx" => Self::Tsx,
            "json" => Self::Json,
            _ => Self::Unknown,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map_or(Self::Unknown, Self::from_extension)
    }

    pub fn is_javascript_like(&self) -> bool {
        matches!(
            self,
            Self::JavaScript | Self::TypeScript | Self::Jsx | Self::Tsx
        )
    }
}
