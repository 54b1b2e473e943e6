use std::process::ExitCode;

use clap::Parser;
use owo_colors::OwoColorize;

use keel_cli::{Cli, CliError};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match keel_cli::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Build(err)) => {
            // bundler failures carry component + module context; render them
            // through miette for the specifier/importer detail
            eprintln!("{:?}", miette::Report::new(err));
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
