//! Subcommands and the loaders they share.

pub mod compare;
pub mod config;
pub mod extract;
pub mod regress;
pub mod trial;
pub mod versions;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use kartex_core::{
    CancellationToken, GoldenCorpus, KartexConfig, PatternRegistry, RegistryVersion,
    RegressionReport, RegressionRunner,
};

/// Load the config file given with `--config`, or defaults.
pub(crate) fn load_config(path: Option<&str>) -> anyhow::Result<KartexConfig> {
    match path {
        Some(p) => {
            debug!("Loading config from {}", p);
            KartexConfig::from_file(Path::new(p))
                .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", p, e))
        }
        None => Ok(KartexConfig::default()),
    }
}

/// Registry file to use: the command-line override, then the config entry.
pub(crate) fn registry_path(
    override_path: Option<&Path>,
    config: &KartexConfig,
) -> Option<PathBuf> {
    override_path
        .map(Path::to_path_buf)
        .or_else(|| config.registry.path.clone())
}

/// Load the registry from `path`, or the builtin history when there is none.
pub(crate) fn load_registry(path: Option<&Path>) -> anyhow::Result<PatternRegistry> {
    let registry = match path {
        Some(p) => {
            debug!("Loading registry from {}", p.display());
            PatternRegistry::from_file(p)?
        }
        None => PatternRegistry::builtin()?,
    };

    if registry.is_empty() {
        anyhow::bail!("Registry has no versions");
    }
    Ok(registry)
}

/// Pick a version: the explicit one, then the configured default, then the latest.
pub(crate) fn resolve_version(
    registry: &PatternRegistry,
    requested: Option<&str>,
    config: &KartexConfig,
) -> anyhow::Result<Arc<RegistryVersion>> {
    match requested.or(config.registry.default_version.as_deref()) {
        Some(id) => registry
            .get(id)
            .ok_or_else(|| anyhow::anyhow!("Unknown registry version: {}", id)),
        None => registry
            .latest()
            .ok_or_else(|| anyhow::anyhow!("Registry has no versions")),
    }
}

/// Load the golden corpus from the override, the config entry, or the builtin set.
pub(crate) fn load_corpus(
    override_path: Option<&Path>,
    config: &KartexConfig,
) -> anyhow::Result<GoldenCorpus> {
    let path = override_path
        .map(Path::to_path_buf)
        .or_else(|| config.regression.corpus_path.clone());

    let corpus = match path {
        Some(p) => {
            debug!("Loading corpus from {}", p.display());
            GoldenCorpus::from_file(&p)?
        }
        None => GoldenCorpus::builtin()?,
    };
    Ok(corpus)
}

/// Replay `corpus` under `version` on a blocking thread behind a spinner.
///
/// Ctrl-C cancels the run; cards already processed stay in the report.
pub(crate) async fn replay(
    runner: RegressionRunner,
    version: Arc<RegistryVersion>,
    corpus: Arc<GoldenCorpus>,
    baseline: Option<RegressionReport>,
) -> anyhow::Result<RegressionReport> {
    let token = CancellationToken::new();
    let watcher = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, skipping remaining cards");
                token.cancel();
            }
        })
    };

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!(
        "Replaying {} card(s) under registry {}",
        corpus.len(),
        version.version()
    ));
    pb.enable_steady_tick(Duration::from_millis(100));

    let runner = runner.with_cancellation(token);
    let report = tokio::task::spawn_blocking(move || match &baseline {
        Some(b) => runner.run_against(&version, &corpus, b),
        None => runner.run(&version, &corpus),
    })
    .await?;

    pb.finish_and_clear();
    watcher.abort();
    Ok(report)
}
