//! Configuration types and layered loading.
//!
//! Configuration merges, lowest to highest precedence: `keel.toml`, then
//! `keel.json`, then `KEEL_`-prefixed environment variables (nested keys
//! split on `__`, e.g. `KEEL_OUTPUT__DIR=build`).

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Json, Toml};
use figment::Figment;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};

/// One build entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryConfig {
    /// Display name; derived from the file stem when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub path: PathBuf,
}

/// Where build outputs land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub manifest: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("dist"),
            manifest: "manifest.json".to_string(),
        }
    }
}

/// Resolution surface: aliases and externals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    pub aliases: IndexMap<String, String>,
    /// Externals patterns: exact names or `pkg/*` prefixes.
    pub externals: Vec<String>,
    /// Whether unmatched bare specifiers become externals (default) or
    /// errors.
    pub externalize_bare: bool,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            aliases: IndexMap::new(),
            externals: Vec::new(),
            externalize_bare: true,
        }
    }
}

/// Compilation target of a transition context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    Node,
    #[default]
    Browser,
    Worker,
}

/// One named transition context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    pub target: TargetKind,
    /// Specifier rewrites active inside this context.
    pub aliases: IndexMap<String, String>,
}

/// Chunking policy knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_chunk_size: Option<usize>,
}

/// Full keel configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeelConfig {
    pub entries: Vec<EntryConfig>,
    pub output: OutputConfig,
    pub resolve: ResolveConfig,
    /// Transition name -> context definition.
    pub transitions: IndexMap<String, TransitionConfig>,
    pub chunking: ChunkingConfig,
}

impl KeelConfig {
    /// Load layered configuration rooted at a directory.
    pub fn load_from(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let figment = Figment::new()
            .merge(Toml::file(root.join("keel.toml")))
            .merge(Json::file(root.join("keel.json")))
            .merge(Env::prefixed("KEEL_").split("__"));
        let config: Self = figment
            .extract()
            .map_err(|err| ConfigError::Load(err.to_string()))?;
        debug!(entries = config.entries.len(), "loaded configuration");
        Ok(config)
    }

    /// Load a single explicit config file, by extension.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound);
        }
        let figment = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Figment::from(Toml::file(path)),
            Some("json") => Figment::from(Json::file(path)),
            other => {
                return Err(ConfigError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                ))
            }
        };
        figment
            .extract()
            .map_err(|err| ConfigError::Load(err.to_string()))
    }

    /// Resolved display name for an entry.
    pub fn entry_name(entry: &EntryConfig) -> String {
        entry.name.clone().unwrap_or_else(|| {
            entry
                .path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("entry")
                .to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = KeelConfig::default();
        assert!(config.entries.is_empty());
        assert_eq!(config.output.dir, PathBuf::from("dist"));
        assert_eq!(config.output.manifest, "manifest.json");
        assert!(config.resolve.externalize_bare);
        assert_eq!(config.chunking.max_chunk_size, None);
    }

    #[test]
    fn parses_toml_document() {
        let text = r#"
[[entries]]
path = "src/pages/index.js"

[[entries]]
name = "admin"
path = "src/pages/admin.js"

[output]
dir = "build"

[resolve.aliases]
"framework/app" = "./src/app.js"

[transitions.client]
target = "browser"

[transitions.client.aliases]
"framework/document" = "./src/document.client.js"

[chunking]
max_chunk_size = 250000
"#;
        let config: KeelConfig = toml::from_str(text).expect("parse");
        assert_eq!(config.entries.len(), 2);
        assert_eq!(KeelConfig::entry_name(&config.entries[0]), "index");
        assert_eq!(KeelConfig::entry_name(&config.entries[1]), "admin");
        assert_eq!(config.output.dir, PathBuf::from("build"));
        assert_eq!(
            config.transitions["client"].target,
            TargetKind::Browser
        );
        assert_eq!(
            config.transitions["client"].aliases["framework/document"],
            "./src/document.client.js"
        );
        assert_eq!(config.chunking.max_chunk_size, Some(250_000));
    }
}
