//! Build pipeline.
//!
//! One build runs the phase sequence `Idle -> Resolving -> Transitioning ->
//! Chunking -> Emitting -> Ready`, with `Failed` reachable from any phase.
//! A `Ready` result is terminal: rebuilds construct a fresh pipeline over a
//! fresh registry instead of mutating a finished one. Cancellation is
//! checked between phases; cancelled work is discarded, never surfaced as
//! `Ready`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use keel_graph::{
    ContextName, GraphStatistics, Manifest, ModuleGraph, ModuleId, ModuleRegistry, Runtime,
    TransitionContext, TransitionTable,
};

use crate::cache::{compute_build_key, CacheKey};
use crate::chunk::{ChunkPlan, ChunkPlanner, ChunkPolicy, EntryRoot};
use crate::emit::{emit, ChunkGroupHandle, EmitOutput, EmittedAsset};
use crate::resolver::{ExternalsPolicy, GraphResolver, PendingTransition, SpecifierResolver};
use crate::transition::TransitionEngine;
use crate::{Error, Result};

/// Pipeline phase for one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Idle,
    Resolving,
    Transitioning,
    Chunking,
    Emitting,
    Ready,
    Failed,
}

impl std::fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Resolving => "resolving",
            Self::Transitioning => "transitioning",
            Self::Chunking => "chunking",
            Self::Emitting => "emitting",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Cooperative cancellation token shared with a running build.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One named build entry point.
#[derive(Debug, Clone)]
pub struct EntrySpec {
    pub name: String,
    pub path: PathBuf,
}

impl EntrySpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("entry")
            .to_string();
        Self { name, path }
    }

    pub fn named(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Options for one build.
///
/// ```no_run
/// use keel_bundler::BuildOptions;
///
/// # #[tokio::main]
/// # async fn main() -> keel_bundler::Result<()> {
/// let result = BuildOptions::new("src/pages/index.js")
///     .external("framework/*")
///     .build()
///     .await?;
///
/// for asset in &result.output.assets {
///     std::fs::write(format!("dist/{}", asset.filename), &asset.code)?;
/// }
/// # Ok(()) }
/// ```
pub struct BuildOptions {
    entries: Vec<EntrySpec>,
    runtime: Option<Arc<dyn Runtime>>,
    root: PathBuf,
    aliases: FxHashMap<String, String>,
    externals: ExternalsPolicy,
    transitions: TransitionTable,
    chunk_policy: ChunkPolicy,
    max_depth: Option<usize>,
    cancel: CancelToken,
}

impl BuildOptions {
    pub fn new(entry: impl Into<PathBuf>) -> Self {
        Self::new_multiple([entry.into()])
    }

    pub fn new_multiple<I, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            entries: entries.into_iter().map(EntrySpec::new).collect(),
            runtime: None,
            root: PathBuf::new(),
            aliases: FxHashMap::default(),
            externals: ExternalsPolicy::externalize_all_bare(),
            transitions: TransitionTable::new(),
            chunk_policy: ChunkPolicy::default(),
            max_depth: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn entry(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.entries.push(EntrySpec::named(name, path));
        self
    }

    pub fn runtime(mut self, runtime: Arc<dyn Runtime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn alias(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.aliases.insert(from.into(), to.into());
        self
    }

    /// Add an externals pattern (exact name or `pkg/*` prefix).
    pub fn external(mut self, pattern: impl Into<String>) -> Self {
        self.externals.patterns.push(pattern.into());
        self
    }

    /// Whether unmatched bare specifiers become externals (default) or
    /// resolution errors.
    pub fn externalize_bare(mut self, externalize: bool) -> Self {
        self.externals.externalize_bare = externalize;
        self
    }

    /// Register a transition context the graph may enter.
    pub fn transition(mut self, context: TransitionContext) -> Self {
        self.transitions.insert(context);
        self
    }

    pub fn chunk_policy(mut self, policy: ChunkPolicy) -> Self {
        self.chunk_policy = policy;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the build to `Ready` or the first failure.
    pub async fn build(self) -> Result<BuildResult> {
        Build::new(self)?.execute().await
    }
}

/// Output of one `Ready` build.
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub graph: ModuleGraph,
    pub entries: Vec<ModuleId>,
    pub manifest: Manifest,
    pub plan: ChunkPlan,
    pub output: EmitOutput,
    pub fingerprint: CacheKey,
    pub statistics: GraphStatistics,
}

impl BuildResult {
    pub fn group(&self, name: &str) -> Option<&ChunkGroupHandle> {
        self.output.group(name)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &EmittedAsset> {
        self.output.assets.iter()
    }
}

/// One pipeline instance. Created fresh per build.
struct Build {
    options: BuildOptions,
    phase: BuildPhase,
    graph: ModuleGraph,
    registry: Arc<ModuleRegistry>,
}

impl Build {
    fn new(options: BuildOptions) -> Result<Self> {
        if options.entries.is_empty() {
            return Err(Error::InvalidConfig("no entries specified".to_string()));
        }
        Ok(Self {
            options,
            phase: BuildPhase::Idle,
            graph: ModuleGraph::new(),
            registry: Arc::new(ModuleRegistry::new()),
        })
    }

    fn advance(&mut self, next: BuildPhase) -> Result<()> {
        if self.options.cancel.is_cancelled() {
            self.phase = BuildPhase::Failed;
            warn!(phase = %next, "build cancelled");
            return Err(Error::Cancelled);
        }
        debug!(from = %self.phase, to = %next, "phase transition");
        self.phase = next;
        Ok(())
    }

    async fn execute(mut self) -> Result<BuildResult> {
        match self.run().await {
            Ok(result) => Ok(result),
            Err(err) => {
                self.phase = BuildPhase::Failed;
                warn!(component = %err.component(), error = %err, "build failed");
                Err(err)
            }
        }
    }

    async fn run(&mut self) -> Result<BuildResult> {
        let runtime: Arc<dyn Runtime> = match self.options.runtime.clone() {
            Some(runtime) => runtime,
            #[cfg(not(target_family = "wasm"))]
            None => Arc::new(keel_graph::NativeRuntime::new()),
            #[cfg(target_family = "wasm")]
            None => {
                return Err(Error::InvalidConfig(
                    "a runtime is required on this target".to_string(),
                ))
            }
        };

        let transitions = Arc::new(self.options.transitions.clone());
        let specifiers = SpecifierResolver::new(
            Arc::clone(&runtime),
            self.options.root.clone(),
            self.options.aliases.clone(),
            self.options.externals.clone(),
        );
        let mut resolver = GraphResolver::new(
            Arc::clone(&runtime),
            Arc::clone(&self.registry),
            specifiers,
            Arc::clone(&transitions),
        );
        if let Some(max_depth) = self.options.max_depth {
            resolver = resolver.with_max_depth(max_depth);
        }
        let engine = TransitionEngine::new(Arc::clone(&transitions), Arc::clone(&self.registry));

        let entry_paths: Vec<PathBuf> =
            self.options.entries.iter().map(|e| e.path.clone()).collect();
        let fingerprint = compute_build_key(
            &runtime,
            &entry_paths,
            &self.options.transitions,
            &self.options.chunk_policy,
        )
        .await?;

        // Resolving
        self.advance(BuildPhase::Resolving)?;
        let mut entry_ids = Vec::with_capacity(self.options.entries.len());
        let mut pending: Vec<PendingTransition> = Vec::new();
        for entry in &self.options.entries {
            let outcome = resolver
                .resolve_entry(&self.graph, &entry.path, &ContextName::server())
                .await?;
            entry_ids.push(outcome.entry);
            pending.extend(outcome.pending_transitions);
        }

        // Transitioning
        self.advance(BuildPhase::Transitioning)?;
        engine.apply_pending(&self.graph, &resolver, pending).await?;

        // Chunking (the graph is finalized from here on)
        self.advance(BuildPhase::Chunking)?;
        let entry_roots: Vec<EntryRoot> = self
            .options
            .entries
            .iter()
            .zip(entry_ids.iter())
            .map(|(entry, id)| EntryRoot {
                name: entry.name.clone(),
                id: id.clone(),
            })
            .collect();
        let planner = ChunkPlanner::new(self.options.chunk_policy);
        let plan = planner.plan(&self.graph, &entry_roots, &engine.transitioned_roots())?;

        // Emitting
        self.advance(BuildPhase::Emitting)?;
        let modules = self.graph.modules();
        let manifest = Manifest::assign(modules.iter().map(|m| m.as_ref()));
        let output = emit(&self.graph, &plan, &manifest)?;

        self.advance(BuildPhase::Ready)?;
        let statistics = self.graph.statistics();
        info!(
            modules = statistics.module_count,
            chunks = plan.chunks.len(),
            groups = plan.groups.len(),
            fingerprint = %fingerprint,
            "build ready"
        );

        Ok(BuildResult {
            graph: self.graph.clone(),
            entries: entry_ids,
            manifest,
            plan,
            output,
            fingerprint,
            statistics,
        })
    }
}

/// Run several independent builds concurrently.
///
/// Results come back in input order regardless of completion order, so
/// sibling failures never disturb a successful entry point's output.
pub async fn build_all(builds: Vec<BuildOptions>) -> Vec<Result<BuildResult>> {
    let handles: Vec<_> = builds
        .into_iter()
        .map(|options| tokio::spawn(options.build()))
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(match handle.await {
            Ok(result) => result,
            Err(join_err) => Err(Error::InvalidConfig(format!(
                "build task panicked: {join_err}"
            ))),
        });
    }
    results
}
