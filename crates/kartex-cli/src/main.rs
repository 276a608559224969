//! CLI application for company card field extraction.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{compare, config, extract, regress, trial, versions};

/// kartex - Extract structured fields from company card text and
/// regression-test pattern registry versions
#[derive(Parser)]
#[command(name = "kartex")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract fields from a single card text
    Extract(extract::ExtractArgs),

    /// Replay the golden corpus under a registry version
    Regress(regress::RegressArgs),

    /// Compare two registry versions and optionally publish the candidate
    Compare(compare::CompareArgs),

    /// List registry versions
    Versions(versions::VersionsArgs),

    /// Try a single candidate pattern against the golden corpus
    Trial(trial::TrialArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Extract(args) => extract::run(args, config_path).await,
        Commands::Regress(args) => regress::run(args, config_path).await,
        Commands::Compare(args) => compare::run(args, config_path).await,
        Commands::Versions(args) => versions::run(args, config_path).await,
        Commands::Trial(args) => trial::run(args, config_path).await,
        Commands::Config(args) => config::run(args, config_path).await,
    }
}
