//! # keel-config
//!
//! Layered configuration for keel builds: `keel.toml`, `keel.json`, and
//! `KEEL_`-prefixed environment variables, with schema validation split
//! from filesystem validation.

pub mod config;
pub mod discovery;
pub mod error;
pub mod validation;

pub use config::{
    ChunkingConfig, EntryConfig, KeelConfig, OutputConfig, ResolveConfig, TargetKind,
    TransitionConfig,
};
pub use discovery::discover;
pub use error::{ConfigError, Result};
pub use validation::{validate_fs, validate_schema};
