//! The `keel build` command.

use std::path::{Path, PathBuf};

use owo_colors::OwoColorize;
use tracing::debug;

use keel_bundler::{
    BuildOptions, BuildResult, ChunkPolicy, TargetEnv, TargetRuntime, TransitionContext,
};
use keel_config::{KeelConfig, TargetKind};

use crate::cli::BuildArgs;
use crate::error::{CliError, Result};

pub async fn run(args: BuildArgs) -> Result<()> {
    let (config, root) = load_config(&args)?;

    let entries: Vec<(String, PathBuf)> = if args.entries.is_empty() {
        keel_config::validate_schema(&config)?;
        keel_config::validate_fs(&config, &root)?;
        config
            .entries
            .iter()
            .map(|entry| (KeelConfig::entry_name(entry), root.join(&entry.path)))
            .collect()
    } else {
        args.entries
            .iter()
            .map(|path| {
                let name = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .unwrap_or("entry")
                    .to_string();
                (name, path.clone())
            })
            .collect()
    };
    if entries.is_empty() {
        return Err(CliError::Usage(
            "no entries given on the command line or in configuration".to_string(),
        ));
    }

    let mut options = BuildOptions::new_multiple(Vec::<PathBuf>::new())
        .root(root.clone())
        .externalize_bare(config.resolve.externalize_bare)
        .chunk_policy(ChunkPolicy {
            max_chunk_size: config.chunking.max_chunk_size,
        });
    for (name, path) in &entries {
        options = options.entry(name.clone(), path.clone());
    }
    for (from, to) in &config.resolve.aliases {
        options = options.alias(from.clone(), to.clone());
    }
    for pattern in &config.resolve.externals {
        options = options.external(pattern.clone());
    }
    for (name, transition) in &config.transitions {
        let mut context = TransitionContext::new(name.as_str(), target_env(transition.target));
        for (from, to) in &transition.aliases {
            context = context.alias(from.clone(), to.clone());
        }
        options = options.transition(context);
    }

    let result = options.build().await?;

    if args.dry_run {
        print_summary(&result, None);
        return Ok(());
    }

    let out_dir = args.out_dir.unwrap_or_else(|| root.join(&config.output.dir));
    write_outputs(&result, &out_dir, &config.output.manifest)?;
    print_summary(&result, Some(&out_dir));
    Ok(())
}

fn load_config(args: &BuildArgs) -> Result<(KeelConfig, PathBuf)> {
    if let Some(path) = &args.config {
        let config = KeelConfig::load_file(path)?;
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        return Ok((config, root));
    }

    let cwd = std::env::current_dir().map_err(keel_config::ConfigError::Io)?;
    match keel_config::discover(&cwd) {
        Ok(root) => {
            let config = KeelConfig::load_from(&root)?;
            Ok((config, root))
        }
        Err(keel_config::ConfigError::NotFound) => {
            debug!("no configuration discovered, using defaults");
            Ok((KeelConfig::default(), cwd))
        }
        Err(err) => Err(err.into()),
    }
}

fn target_env(target: TargetKind) -> TargetEnv {
    match target {
        TargetKind::Node => TargetEnv::node(),
        TargetKind::Browser => TargetEnv::browser(),
        TargetKind::Worker => TargetEnv {
            runtime: TargetRuntime::Worker,
            conditions: vec!["worker".to_string(), "import".to_string()],
        },
    }
}

fn write_outputs(result: &BuildResult, out_dir: &Path, manifest_name: &str) -> Result<()> {
    std::fs::create_dir_all(out_dir).map_err(|source| CliError::Write {
        path: out_dir.to_path_buf(),
        source,
    })?;

    for asset in &result.output.assets {
        let path = out_dir.join(&asset.filename);
        std::fs::write(&path, &asset.code).map_err(|source| CliError::Write { path, source })?;
    }

    let manifest_path = out_dir.join(manifest_name);
    std::fs::write(&manifest_path, &result.output.manifest_json).map_err(|source| {
        CliError::Write {
            path: manifest_path,
            source,
        }
    })?;

    Ok(())
}

fn print_summary(result: &BuildResult, out_dir: Option<&Path>) {
    let stats = &result.statistics;
    println!(
        "{} {} modules, {} chunks, {} groups",
        "✓".green().bold(),
        stats.module_count,
        result.plan.chunks.len(),
        result.plan.groups.len(),
    );
    for group in &result.output.groups {
        println!(
            "  {} {} ({} chunks)",
            "→".dimmed(),
            group.name.bold(),
            group.chunks.len()
        );
    }
    println!("  fingerprint {}", result.fingerprint.to_string().dimmed());
    if let Some(out_dir) = out_dir {
        println!("  wrote {}", out_dir.display());
    }
}
