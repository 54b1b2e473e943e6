//! Command-line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use keel_bundler::LogLevel;

/// Keel: module bundling and chunk-graph builds.
#[derive(Debug, Parser)]
#[command(name = "keel", version, about)]
pub struct Cli {
    /// Log level (silent, error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info")]
    pub log_level: LogLevelArg,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a build and write chunks plus the module-id manifest.
    Build(BuildArgs),
}

#[derive(Debug, clap::Args)]
pub struct BuildArgs {
    /// Entry points. Overrides the configured entries when given.
    pub entries: Vec<PathBuf>,

    /// Explicit config file (otherwise discovered from the working
    /// directory upward).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output directory. Overrides the configured output directory.
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Resolve and plan, but write nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Thin clap-compatible wrapper over the bundler's log level.
#[derive(Debug, Clone, Copy)]
pub struct LogLevelArg(pub LogLevel);

impl std::str::FromStr for LogLevelArg {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse::<LogLevel>().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_build_invocation() {
        let cli = Cli::try_parse_from([
            "keel",
            "build",
            "src/index.js",
            "--out-dir",
            "build",
            "--log-level",
            "debug",
        ])
        .expect("parse");
        match cli.command {
            Commands::Build(args) => {
                assert_eq!(args.entries, vec![PathBuf::from("src/index.js")]);
                assert_eq!(args.out_dir, Some(PathBuf::from("build")));
                assert!(!args.dry_run);
            }
        }
        assert!(matches!(cli.log_level.0, LogLevel::Debug));
    }

    #[test]
    fn rejects_bad_log_level() {
        assert!(Cli::try_parse_from(["keel", "--log-level", "loud", "build", "a.js"]).is_err());
    }
}
