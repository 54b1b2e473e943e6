//! Specifier-to-source mapping.
//!
//! Relative specifiers probe the runtime for a concrete source file; bare
//! specifiers either match the externals policy or fail. Context alias
//! tables rewrite specifiers before any probing, which is how a transition
//! swaps which app/document/error modules are eligible.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use path_clean::PathClean;
use rustc_hash::FxHashMap;

use keel_graph::{Runtime, TransitionContext};

/// Extensions probed, in preference order, when a relative specifier does
/// not name an existing file outright.
const PROBE_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "ts", "tsx", "jsx", "json"];

/// Index files probed when a relative specifier names a directory.
const INDEX_BASENAMES: &[&str] = &["index.js", "index.ts", "index.tsx", "index.jsx"];

/// What a specifier resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedSpecifier {
    /// A concrete source the resolver will read and scan.
    Source(PathBuf),
    /// An intentionally unresolved module, terminal in the graph.
    External(String),
}

/// Externals policy for bare specifiers.
#[derive(Debug, Clone, Default)]
pub struct ExternalsPolicy {
    /// Patterns matched against bare specifiers: exact names, or prefixes
    /// written as `pkg/*`.
    pub patterns: Vec<String>,
    /// When true, any bare specifier that matches nothing else becomes an
    /// external instead of a resolution error. This is the default: the
    /// pipeline transports framework packages, it does not compile them.
    pub externalize_bare: bool,
}

impl ExternalsPolicy {
    pub fn externalize_all_bare() -> Self {
        Self {
            patterns: Vec::new(),
            externalize_bare: true,
        }
    }

    fn matches(&self, specifier: &str) -> bool {
        self.patterns.iter().any(|pattern| {
            if let Some(prefix) = pattern.strip_suffix("/*") {
                specifier == prefix || specifier.starts_with(&format!("{prefix}/"))
            } else {
                specifier == pattern
            }
        })
    }
}

/// Maps import specifiers to sources or externals for one build.
pub struct SpecifierResolver {
    runtime: Arc<dyn Runtime>,
    root: PathBuf,
    aliases: FxHashMap<String, String>,
    externals: ExternalsPolicy,
}

impl SpecifierResolver {
    pub fn new(
        runtime: Arc<dyn Runtime>,
        root: impl Into<PathBuf>,
        aliases: FxHashMap<String, String>,
        externals: ExternalsPolicy,
    ) -> Self {
        Self {
            runtime,
            root: root.into(),
            aliases,
            externals,
        }
    }

    /// Resolve one specifier from the directory of its importer.
    ///
    /// Returns `None` when the specifier cannot be mapped to any source or
    /// external; the caller attaches the importing module and surfaces a
    /// resolution error.
    pub async fn resolve(
        &self,
        specifier: &str,
        importer_dir: &Path,
        context: Option<&TransitionContext>,
    ) -> Option<ResolvedSpecifier> {
        // Context rewrites first, then the global alias table. A rewrite
        // result is resolved as if it had been written at the import site.
        let mut current = specifier.to_string();
        if let Some(ctx) = context {
            if let Some(rewritten) = ctx.rewrite(&current) {
                current = rewritten.to_string();
            }
        }
        if let Some(rewritten) = self.aliases.get(&current) {
            current = rewritten.clone();
        }

        if is_relative(&current) {
            return self
                .probe_relative(&current, importer_dir)
                .await
                .map(ResolvedSpecifier::Source);
        }

        if self.externals.matches(&current) || self.externals.externalize_bare {
            return Some(ResolvedSpecifier::External(current));
        }

        None
    }

    async fn probe_relative(&self, specifier: &str, importer_dir: &Path) -> Option<PathBuf> {
        let base = if let Some(rooted) = specifier.strip_prefix('/') {
            self.root.join(rooted)
        } else {
            importer_dir.join(specifier)
        }
        .clean();

        if base.extension().is_some() && self.runtime.exists(&base).await {
            return Some(base);
        }

        for ext in PROBE_EXTENSIONS {
            let candidate = base.with_extension(ext);
            if self.runtime.exists(&candidate).await {
                return Some(candidate);
            }
        }

        for index in INDEX_BASENAMES {
            let candidate = base.join(index);
            if self.runtime.exists(&candidate).await {
                return Some(candidate);
            }
        }

        // extensionless files ("." entries pointing at a real file)
        if self.runtime.exists(&base).await {
            return Some(base);
        }

        None
    }
}

fn is_relative(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/')
        || specifier == "." || specifier == ".."
}
