//! Filesystem-backed runtime.

use std::path::Path;

use async_trait::async_trait;

use super::{Runtime, RuntimeError, RuntimeResult};

/// Reads sources from the real filesystem via tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRuntime;

impl NativeRuntime {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Runtime for NativeRuntime {
    async fn read(&self, path: &Path) -> RuntimeResult<String> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(RuntimeError::NotFound(path.to_path_buf()))
            }
            Err(err) => Err(RuntimeError::Read {
                path: path.to_path_buf(),
                source: err,
            }),
        }
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_and_probes_real_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        let file = dir.path().join("entry.js");
        std::fs::write(&file, "export const ok = true;").expect("write");

        let runtime = NativeRuntime::new();
        assert!(runtime.exists(&file).await);
        assert!(!runtime.exists(&dir.path().join("missing.js")).await);
        assert_eq!(
            runtime.read(&file).await.unwrap(),
            "export const ok = true;"
        );
        assert!(matches!(
            runtime.read(&dir.path().join("missing.js")).await,
            Err(RuntimeError::NotFound(_))
        ));
    }
}
