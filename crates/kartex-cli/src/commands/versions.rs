//! Versions command - list the registry history.

use std::path::PathBuf;

use clap::Args;
use console::style;

use super::{load_config, load_registry, registry_path};

/// Arguments for the versions command.
#[derive(Args)]
pub struct VersionsArgs {
    /// Registry JSON file (default: builtin registry)
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Also list patterns per field
    #[arg(long)]
    patterns: bool,
}

pub async fn run(args: VersionsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let registry = load_registry(registry_path(args.registry.as_deref(), &config).as_deref())?;

    let latest = registry.latest().map(|v| v.version().to_string());

    for version in registry.versions() {
        let status = if registry.is_published(version.version()) {
            style("published").green()
        } else {
            style("draft").yellow()
        };
        let marker = if latest.as_deref() == Some(version.version()) {
            " (latest)"
        } else {
            ""
        };

        println!(
            "{}{}  {}  {}  {} pattern(s)",
            style(version.version()).bold(),
            marker,
            version.date(),
            status,
            version.pattern_count()
        );
        if !version.notes().is_empty() {
            println!("    {}", version.notes());
        }

        if args.patterns {
            for (field, defs) in version.table() {
                for (i, def) in defs.iter().enumerate() {
                    match def.secondary {
                        Some(secondary) => println!(
                            "      {:<22} #{} {}  (+{})",
                            field.as_str(),
                            i + 1,
                            def.pattern,
                            secondary
                        ),
                        None => println!("      {:<22} #{} {}", field.as_str(), i + 1, def.pattern),
                    }
                }
            }
        }
    }

    Ok(())
}
