//! Transition contexts.
//!
//! A transition context names a compilation target. Every module is compiled
//! under exactly one context; entering a transition re-resolves a subgraph
//! under another one, minting distinct module identities. The default
//! context is `server`, matching the entry glue this pipeline serves.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Name of the default context modules are compiled under.
pub const DEFAULT_CONTEXT: &str = "server";

/// Interned name of a transition context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextName(Arc<str>);

impl ContextName {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The default server context.
    pub fn server() -> Self {
        Self(Arc::from(DEFAULT_CONTEXT))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_server(&self) -> bool {
        self.0.as_ref() == DEFAULT_CONTEXT
    }
}

impl fmt::Display for ContextName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContextName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Execution target a context compiles for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetRuntime {
    /// Server-side Node.js process.
    #[default]
    Node,
    /// Browser main thread.
    Browser,
    /// Edge/worker runtime.
    Worker,
}

/// Target environment descriptor carried by a transition context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetEnv {
    pub runtime: TargetRuntime,
    /// Export conditions preferred during resolution for this target.
    #[serde(default)]
    pub conditions: Vec<String>,
}

impl TargetEnv {
    pub fn browser() -> Self {
        Self {
            runtime: TargetRuntime::Browser,
            conditions: vec!["browser".to_string(), "import".to_string()],
        }
    }

    pub fn node() -> Self {
        Self {
            runtime: TargetRuntime::Node,
            conditions: vec!["node".to_string(), "require".to_string()],
        }
    }
}

/// A named re-compilation context.
///
/// Entering the context rewrites subsequent resolution through its alias
/// table (swapping which app/document/error modules are eligible) and tags
/// every resolved module with the context name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionContext {
    pub name: ContextName,
    pub target: TargetEnv,
    /// Specifier rewrites applied while resolving inside this context.
    #[serde(default)]
    pub aliases: FxHashMap<String, String>,
}

impl TransitionContext {
    pub fn new(name: impl Into<ContextName>, target: TargetEnv) -> Self {
        Self {
            name: name.into(),
            target,
            aliases: FxHashMap::default(),
        }
    }

    pub fn alias(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.aliases.insert(from.into(), to.into());
        self
    }

    /// Apply this context's alias table to a specifier.
    pub fn rewrite(&self, specifier: &str) -> Option<&str> {
        self.aliases.get(specifier).map(String::as_str)
    }
}

/// Registry of the transition contexts known to a build.
///
/// The default server context is ambient and never appears here; only named
/// transitions that can be entered mid-graph are registered.
#[derive(Debug, Clone, Default)]
pub struct TransitionTable {
    contexts: FxHashMap<ContextName, Arc<TransitionContext>>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, context: TransitionContext) {
        self.contexts
            .insert(context.name.clone(), Arc::new(context));
    }

    pub fn with(mut self, context: TransitionContext) -> Self {
        self.insert(context);
        self
    }

    pub fn get(&self, name: &ContextName) -> Option<Arc<TransitionContext>> {
        self.contexts.get(name).cloned()
    }

    pub fn contains(&self, name: &ContextName) -> bool {
        self.contexts.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Names in sorted order, for deterministic hashing of build inputs.
    pub fn sorted_names(&self) -> Vec<ContextName> {
        let mut names: Vec<_> = self.contexts.keys().cloned().collect();
        names.sort();
        names
    }
}
