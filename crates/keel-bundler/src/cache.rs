//! Build fingerprint via BLAKE3 content-addressed hashing.
//!
//! The key is a deterministic hash of all build inputs, so any input change
//! changes the key. Everything unordered is sorted before hashing.

use std::path::PathBuf;
use std::sync::Arc;

use blake3::Hasher;

use keel_graph::{Runtime, TransitionTable};

use crate::chunk::ChunkPolicy;
use crate::{Error, Result};

/// Current key format version. Increment when the hashed inputs change.
const KEY_FORMAT_VERSION: u32 = 1;

/// Content-addressed build key (BLAKE3 hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compute the fingerprint for one build.
///
/// Hashed, in order: key format version, sorted entry paths with their
/// content hashes, the transition table (sorted names, targets, sorted
/// alias pairs), and the chunk policy.
pub async fn compute_build_key(
    runtime: &Arc<dyn Runtime>,
    entries: &[PathBuf],
    transitions: &TransitionTable,
    policy: &ChunkPolicy,
) -> Result<CacheKey> {
    let mut hasher = Hasher::new();
    hasher.update(&KEY_FORMAT_VERSION.to_le_bytes());

    let mut sorted_entries: Vec<&PathBuf> = entries.iter().collect();
    sorted_entries.sort();
    for entry in sorted_entries {
        let text = entry
            .to_str()
            .ok_or_else(|| Error::InvalidConfig(format!("non UTF-8 entry path: {entry:?}")))?;
        hasher.update(text.as_bytes());
        hasher.update(b"\0");
        let content = runtime.read(entry).await?;
        hasher.update(blake3::hash(content.as_bytes()).as_bytes());
    }

    for name in transitions.sorted_names() {
        let context = transitions.get(&name).expect("sorted name is present");
        hasher.update(name.as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update(format!("{:?}", context.target).as_bytes());
        let mut aliases: Vec<(&String, &String)> = context.aliases.iter().collect();
        aliases.sort();
        for (from, to) in aliases {
            hasher.update(from.as_bytes());
            hasher.update(b"=");
            hasher.update(to.as_bytes());
            hasher.update(b"\0");
        }
    }

    hasher.update(format!("{policy:?}").as_bytes());

    Ok(CacheKey(hasher.finalize().to_hex().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_graph::{MemoryRuntime, TargetEnv, TransitionContext};

    fn runtime() -> Arc<dyn Runtime> {
        Arc::new(
            MemoryRuntime::new()
                .with("a.js", "export const a = 1;")
                .with("b.js", "export const b = 2;"),
        )
    }

    #[tokio::test]
    async fn key_is_order_independent() {
        let runtime = runtime();
        let table = TransitionTable::new();
        let policy = ChunkPolicy::default();

        let forward = vec![PathBuf::from("a.js"), PathBuf::from("b.js")];
        let backward = vec![PathBuf::from("b.js"), PathBuf::from("a.js")];

        let key1 = compute_build_key(&runtime, &forward, &table, &policy).await.unwrap();
        let key2 = compute_build_key(&runtime, &backward, &table, &policy).await.unwrap();
        assert_eq!(key1, key2);
    }

    #[tokio::test]
    async fn key_changes_on_content_change() {
        let table = TransitionTable::new();
        let policy = ChunkPolicy::default();
        let entries = vec![PathBuf::from("a.js")];

        let first: Arc<dyn Runtime> =
            Arc::new(MemoryRuntime::new().with("a.js", "export const a = 1;"));
        let second: Arc<dyn Runtime> =
            Arc::new(MemoryRuntime::new().with("a.js", "export const a = 2;"));

        let key1 = compute_build_key(&first, &entries, &table, &policy).await.unwrap();
        let key2 = compute_build_key(&second, &entries, &table, &policy).await.unwrap();
        assert_ne!(key1, key2);
    }

    #[tokio::test]
    async fn key_changes_on_transition_change() {
        let runtime = runtime();
        let policy = ChunkPolicy::default();
        let entries = vec![PathBuf::from("a.js")];

        let empty = TransitionTable::new();
        let with_client = TransitionTable::new()
            .with(TransitionContext::new("client", TargetEnv::browser()));

        let key1 = compute_build_key(&runtime, &entries, &empty, &policy).await.unwrap();
        let key2 = compute_build_key(&runtime, &entries, &with_client, &policy).await.unwrap();
        assert_ne!(key1, key2);
    }
}
