//! Stable module identity.
//!
//! A [`ModuleId`] names one compiled variant of a source module: the same
//! source file compiled under two transition contexts carries two distinct
//! ids. The id is a (normalized path, context name) pair, so it is stable
//! across rebuilds and across content edits; content addressing lives on
//! [`crate::Module::content_hash`] instead.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use path_clean::PathClean;

use crate::context::ContextName;

/// Separator between the path and a non-default context in the display form.
const CONTEXT_SEPARATOR: char = '#';

/// Error produced when constructing a [`ModuleId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModuleIdError {
    #[error("module path is empty")]
    EmptyPath,

    #[error("module path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),
}

/// Identity of one module under one transition context.
///
/// Ordering is lexicographic on (path, context), which is what gives chunk
/// assignment and manifest emission their run-to-run stability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId {
    path: Arc<str>,
    context: ContextName,
}

impl ModuleId {
    /// Create an id in the default (server) context.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ModuleIdError> {
        Self::with_context(path, ContextName::server())
    }

    /// Create an id in an explicit transition context.
    pub fn with_context(
        path: impl AsRef<Path>,
        context: ContextName,
    ) -> Result<Self, ModuleIdError> {
        let cleaned = path.as_ref().to_path_buf().clean();
        let text = cleaned
            .to_str()
            .ok_or_else(|| ModuleIdError::NonUtf8Path(cleaned.clone()))?;
        if text.is_empty() || text == "." {
            return Err(ModuleIdError::EmptyPath);
        }
        Ok(Self {
            path: Arc::from(text),
            context,
        })
    }

    /// The normalized source path component of the id.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The source path as a [`Path`].
    pub fn as_path(&self) -> &Path {
        Path::new(self.path.as_ref())
    }

    /// The transition context this id was compiled under.
    pub fn context(&self) -> &ContextName {
        &self.context
    }

    /// The same source path re-keyed under another context.
    ///
    /// This is how the transition engine mints the parallel identity of a
    /// module without touching the original entity.
    pub fn in_context(&self, context: ContextName) -> Self {
        Self {
            path: Arc::clone(&self.path),
            context,
        }
    }

    /// True when the id belongs to the default (server) context.
    pub fn is_default_context(&self) -> bool {
        self.context.is_server()
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default_context() {
            write!(f, "{}", self.path)
        } else {
            write!(f, "{}{}{}", self.path, CONTEXT_SEPARATOR, self.context)
        }
    }
}

impl std::str::FromStr for ModuleId {
    type Err = ModuleIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once(CONTEXT_SEPARATOR) {
            Some((path, context)) if !context.is_empty() => {
                Self::with_context(path, ContextName::new(context))
            }
            _ => Self::new(s),
        }
    }
}

impl serde::Serialize for ModuleId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for ModuleId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = <String as serde::Deserialize>::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
