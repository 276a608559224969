//! Trial command - run one candidate pattern alone over the golden corpus.

use std::path::PathBuf;

use clap::Args;
use console::style;

use kartex_core::{FieldId, PatternDef, validate_pattern_on_corpus};

use super::{load_config, load_corpus};

/// Arguments for the trial command.
#[derive(Args)]
pub struct TrialArgs {
    /// Field the pattern extracts (e.g. tax_id)
    #[arg(value_parser = parse_field)]
    field: FieldId,

    /// Regular expression; the first capture group is the value
    pattern: String,

    /// Field fed by the second capture group
    #[arg(long, value_parser = parse_field)]
    secondary: Option<FieldId>,

    /// Golden corpus JSON file (default: builtin corpus)
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Print trials as JSON
    #[arg(long)]
    json: bool,
}

fn parse_field(s: &str) -> Result<FieldId, String> {
    s.parse()
}

pub async fn run(args: TrialArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let corpus = load_corpus(args.corpus.as_deref(), &config)?;

    let def = PatternDef {
        pattern: args.pattern,
        secondary: args.secondary,
    };
    let trials = validate_pattern_on_corpus(args.field, &def, &corpus)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&trials)?);
        return Ok(());
    }

    for trial in &trials {
        let mark = match (&trial.expected, trial.correct) {
            (None, _) => style("-").dim(),
            (Some(_), true) => style("✓").green(),
            (Some(_), false) => style("✗").red(),
        };
        println!(
            "{} {:<10} expected {:<30} found {}",
            mark,
            trial.card_id,
            trial.expected.as_deref().unwrap_or("-"),
            trial.found.as_deref().unwrap_or("-")
        );
    }

    let judged = trials.iter().filter(|t| t.expected.is_some()).count();
    let correct = trials.iter().filter(|t| t.correct).count();
    println!();
    println!(
        "{} {} correct on {} of {} card(s) with an expectation",
        style("ℹ").blue(),
        args.field,
        correct,
        judged
    );

    Ok(())
}
