//! Compare command - diff two registry versions and gate publication.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use console::style;
use tracing::info;

use kartex_core::{RegressionRunner, VersionDiff};

use super::{load_config, load_corpus, load_registry, registry_path, replay};

/// Arguments for the compare command.
#[derive(Args)]
pub struct CompareArgs {
    /// Baseline registry version
    #[arg(required = true)]
    baseline: String,

    /// Candidate registry version
    #[arg(required = true)]
    candidate: String,

    /// Registry JSON file (default: builtin registry)
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Golden corpus JSON file (default: builtin corpus)
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Number of worker threads
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Write the diff as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Mark the candidate published in the registry file if nothing regressed
    #[arg(long)]
    publish: bool,
}

pub async fn run(args: CompareArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let path = registry_path(args.registry.as_deref(), &config);
    let publish_to = if args.publish {
        Some(path.clone().ok_or_else(|| {
            anyhow::anyhow!("--publish needs a registry file (--registry or registry.path in the config)")
        })?)
    } else {
        None
    };

    let mut registry = load_registry(path.as_deref())?;
    let baseline_version = registry
        .get(&args.baseline)
        .ok_or_else(|| anyhow::anyhow!("Unknown registry version: {}", args.baseline))?;
    let candidate_version = registry
        .get(&args.candidate)
        .ok_or_else(|| anyhow::anyhow!("Unknown registry version: {}", args.candidate))?;

    let corpus = Arc::new(load_corpus(args.corpus.as_deref(), &config)?);

    let mut runner = RegressionRunner::from_config(&config);
    if let Some(jobs) = args.jobs {
        runner = runner.with_workers(jobs);
    }
    let margin = runner.confidence_margin();

    let baseline = replay(runner.clone(), baseline_version, corpus.clone(), None).await?;
    let candidate = replay(runner, candidate_version, corpus, None).await?;
    if baseline.cancelled || candidate.cancelled {
        anyhow::bail!("Run cancelled; no verdict");
    }

    let diff = VersionDiff::compare_with_margin(&baseline, &candidate, margin);
    print!("{}", diff.render());

    if let Some(json_path) = &args.json {
        fs::write(json_path, serde_json::to_string_pretty(&diff)?)?;
        println!(
            "{} Diff written to {}",
            style("✓").green(),
            json_path.display()
        );
    }

    let Some(path) = publish_to else {
        return Ok(());
    };

    if registry.is_published(&args.candidate) {
        println!(
            "{} Registry {} is already published",
            style("ℹ").blue(),
            args.candidate
        );
        return Ok(());
    }

    registry.publish(&args.candidate, &diff)?;
    registry.to_file(&path)?;
    info!("Registry written to {}", path.display());

    println!(
        "{} Published registry {} in {}",
        style("✓").green(),
        args.candidate,
        path.display()
    );

    Ok(())
}
