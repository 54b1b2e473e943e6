//! # keel-cli
//!
//! Command-line front end for keel builds. The surface is intentionally
//! small: discover or load configuration, run a build, write the chunks
//! and manifest.

pub mod cli;
pub mod commands;
pub mod error;

pub use cli::{Cli, Commands};
pub use error::{CliError, Result};

/// Dispatch a parsed invocation.
pub async fn run(cli: Cli) -> Result<()> {
    keel_bundler::init_logging(cli.log_level.0);
    match cli.command {
        Commands::Build(args) => commands::build::run(args).await,
    }
}
