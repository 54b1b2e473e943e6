//! # keel-bundler
//!
//! The keel build pipeline: static scan, graph resolution, transition
//! application, chunk planning, and emission, on top of the `keel-graph`
//! foundation crate.
//!
//! ## Quick start
//!
//! ```no_run
//! use keel_bundler::{BuildOptions, TargetEnv, TransitionContext};
//!
//! # #[tokio::main]
//! # async fn main() -> keel_bundler::Result<()> {
//! let result = BuildOptions::new("src/pages/index.js")
//!     .transition(TransitionContext::new("client", TargetEnv::browser()))
//!     .external("framework/*")
//!     .build()
//!     .await?;
//!
//! println!("{} chunks, fingerprint {}", result.plan.chunks.len(), result.fingerprint);
//! for group in &result.output.groups {
//!     println!("group {} -> entry {}", group.name, group.entry);
//! }
//! # Ok(()) }
//! ```
//!
//! A build is one pipeline instance walking `Resolving -> Transitioning ->
//! Chunking -> Emitting -> Ready`; failures carry the originating component
//! and module identity, and a failed build never poisons sibling builds.

// Re-export everything from the foundation crate
pub use keel_graph::*;

pub mod build;
pub mod cache;
pub mod chunk;
pub mod emit;
pub mod handoff;
pub mod resolver;
pub mod scan;
pub mod transition;

// Logging utilities (optional, enabled with "logging" feature)
#[cfg(feature = "logging")]
pub mod logging;

#[cfg(feature = "logging")]
pub use logging::{init_logging, init_logging_from_env, LogLevel};

pub use build::{build_all, BuildOptions, BuildPhase, BuildResult, CancelToken, EntrySpec};
pub use cache::{compute_build_key, CacheKey};
pub use chunk::{
    Chunk, ChunkGroup, ChunkGroupKind, ChunkId, ChunkPlan, ChunkPlanner, ChunkPolicy, EntryRoot,
};
pub use emit::{emit, ChunkGroupHandle, ChunkRef, EmitOutput, EmittedAsset};
pub use handoff::{PageHandoff, RenderVariant};
pub use resolver::{
    ExternalsPolicy, GraphResolver, PendingTransition, ResolveOutcome, ResolvedSpecifier,
    SpecifierResolver,
};
pub use scan::{scan_source, ScannedImport};
pub use transition::TransitionEngine;

/// Pipeline component an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Registry,
    Resolver,
    TransitionEngine,
    ChunkingEngine,
    Emitter,
    Pipeline,
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Registry => "registry",
            Self::Resolver => "resolver",
            Self::TransitionEngine => "transition engine",
            Self::ChunkingEngine => "chunking engine",
            Self::Emitter => "emitter",
            Self::Pipeline => "pipeline",
        };
        write!(f, "{name}")
    }
}

/// Error types for keel-bundler operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A specifier could not be mapped to any source or external.
    #[error("cannot resolve \"{specifier}\"{}", importer_suffix(.importer))]
    Resolution {
        specifier: String,
        importer: Option<ModuleId>,
    },

    /// The defensive recursion cap was exceeded. Cycle detection should
    /// make this unreachable; it guards against resolver bugs.
    #[error("resolution depth exceeded {depth} at {module}")]
    CycleOverflow { module: ModuleId, depth: usize },

    /// A transition name was unknown or a subgraph re-entry was
    /// inconsistent.
    #[error("transition \"{name}\" failed: {reason}")]
    Transition { name: String, reason: String },

    /// Serialization of a module failed during emission.
    #[error("emit failed for {module}: {reason}")]
    Emit { module: ModuleId, reason: String },

    /// The build was cancelled between phases.
    #[error("build cancelled")]
    Cancelled,

    /// Invalid build options.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error from the foundation crate.
    #[error(transparent)]
    Graph(#[from] keel_graph::Error),

    /// Invalid module identity input.
    #[error(transparent)]
    InvalidModuleId(#[from] ModuleIdError),

    /// Source I/O failure.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn importer_suffix(importer: &Option<ModuleId>) -> String {
    match importer {
        Some(id) => format!(" imported by {id}"),
        None => String::new(),
    }
}

/// Result type alias for keel-bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The pipeline component this error is attributed to.
    pub fn component(&self) -> Component {
        match self {
            Error::Resolution { .. } | Error::CycleOverflow { .. } => Component::Resolver,
            Error::Transition { .. } => Component::TransitionEngine,
            Error::Emit { .. } => Component::Emitter,
            Error::Graph(_) | Error::InvalidModuleId(_) => Component::Registry,
            Error::Runtime(_) => Component::Resolver,
            Error::Cancelled | Error::InvalidConfig(_) | Error::Io(_) => Component::Pipeline,
        }
    }

    /// The module the error is attributed to, when one is known.
    pub fn module(&self) -> Option<&ModuleId> {
        match self {
            Error::Resolution { importer, .. } => importer.as_ref(),
            Error::CycleOverflow { module, .. } | Error::Emit { module, .. } => Some(module),
            Error::Graph(keel_graph::Error::NotFound(id))
            | Error::Graph(keel_graph::Error::DuplicateModule(id)) => Some(id),
            _ => None,
        }
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::Resolution { .. } => "RESOLUTION_ERROR",
            Error::CycleOverflow { .. } => "CYCLE_OVERFLOW",
            Error::Transition { .. } => "TRANSITION_ERROR",
            Error::Emit { .. } => "EMIT_ERROR",
            Error::Cancelled => "CANCELLED",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Graph(_) => "GRAPH_ERROR",
            Error::InvalidModuleId(_) => "INVALID_MODULE_ID",
            Error::Runtime(_) => "RUNTIME_ERROR",
            Error::Io(_) => "IO_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::Resolution {
                specifier,
                importer,
            } => Some(Box::new(match importer {
                Some(importer) => format!(
                    "Check that \"{specifier}\" exists relative to {importer}, or add it to the externals patterns."
                ),
                None => format!("Check that the entry \"{specifier}\" exists."),
            })),
            Error::Transition { name, .. } => Some(Box::new(format!(
                "Register a transition named \"{name}\" in the build options before entering it."
            ))),
            Error::InvalidConfig(msg) => Some(Box::new(format!(
                "Check the build configuration.\nError: {msg}"
            ))),
            _ => None,
        }
    }
}
