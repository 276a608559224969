//! Regress command - replay the golden corpus under one registry version.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use console::style;
use tracing::info;

use kartex_core::regression::CardOutcome;
use kartex_core::{RegressionReport, RegressionRunner};

use super::{load_config, load_corpus, load_registry, registry_path, replay, resolve_version};

/// Arguments for the regress command.
#[derive(Args)]
pub struct RegressArgs {
    /// Registry version (default: configured default, then latest)
    #[arg(short = 'r', long = "registry-version")]
    registry_version: Option<String>,

    /// Registry JSON file (default: builtin registry)
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Golden corpus JSON file (default: builtin corpus)
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Saved report (from --output) to diff against
    #[arg(short, long, conflicts_with = "against")]
    baseline: Option<PathBuf>,

    /// Registry version to run first and diff against
    #[arg(long)]
    against: Option<String>,

    /// Number of worker threads
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Write the full report as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write a per-card CSV summary
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Exit with an error when regressions are found
    #[arg(long)]
    fail_on_regression: bool,
}

pub async fn run(args: RegressArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let registry = load_registry(registry_path(args.registry.as_deref(), &config).as_deref())?;
    let version = resolve_version(&registry, args.registry_version.as_deref(), &config)?;
    let corpus = Arc::new(load_corpus(args.corpus.as_deref(), &config)?);

    let mut runner = RegressionRunner::from_config(&config);
    if let Some(jobs) = args.jobs {
        runner = runner.with_workers(jobs);
    }

    let baseline = if let Some(path) = &args.baseline {
        info!("Loading baseline report from {}", path.display());
        let content = fs::read_to_string(path)?;
        let report: RegressionReport = serde_json::from_str(&content)?;
        Some(report)
    } else if let Some(id) = &args.against {
        let base_version = registry
            .get(id)
            .ok_or_else(|| anyhow::anyhow!("Unknown registry version: {}", id))?;
        Some(replay(runner.clone(), base_version, corpus.clone(), None).await?)
    } else {
        None
    };

    let report = replay(runner, version, corpus, baseline).await?;

    print!("{}", report.render());
    println!();

    let mark = if report.failed == 0 && report.crashed == 0 {
        style("✓").green()
    } else {
        style("✗").red()
    };
    println!(
        "{} {} passed, {} failed, {} crashed under registry {}",
        mark,
        style(report.passed).green(),
        style(report.failed).red(),
        style(report.crashed).red(),
        report.registry_version
    );

    if let Some(output_path) = &args.output {
        fs::write(output_path, serde_json::to_string_pretty(&report)?)?;
        println!(
            "{} Report written to {}",
            style("✓").green(),
            output_path.display()
        );
    }

    if let Some(summary_path) = &args.summary {
        write_summary(summary_path, &report.cards)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    if report.cancelled {
        anyhow::bail!("Run cancelled after {} card(s)", report.cards.len());
    }
    if args.fail_on_regression && !report.regressions.is_empty() {
        anyhow::bail!("{} regression(s) found", report.regressions.len());
    }

    Ok(())
}

fn write_summary(path: &PathBuf, cards: &[CardOutcome]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "card_id",
        "label",
        "status",
        "confidence",
        "fields_extracted",
        "processing_time_ms",
        "diagnostics",
    ])?;

    for card in cards {
        let status = if card.crashed {
            "crashed"
        } else if card.passed {
            "passed"
        } else {
            "failed"
        };
        wtr.write_record([
            card.card_id.as_str(),
            card.label.as_str(),
            status,
            &card.confidence.to_string(),
            &card.fields_extracted.to_string(),
            &card.elapsed_ms.to_string(),
            &card.diagnostics.join("; "),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
