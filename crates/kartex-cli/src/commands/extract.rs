//! Extract command - pull catalog fields out of a single card text.

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::info;

use kartex_core::{DocumentExtractionRecord, FieldId, Orchestrator, Source};

use super::{load_config, load_registry, registry_path, resolve_version};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input text file, or `-` for stdin
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Registry version (default: configured default, then latest)
    #[arg(short = 'r', long = "registry-version")]
    registry_version: Option<String>,

    /// Registry JSON file (default: builtin registry)
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Disable contextual fallbacks
    #[arg(long)]
    no_fallback: bool,

    /// Show overall confidence and missing fields
    #[arg(long)]
    show_confidence: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output, one row per field
    Csv,
    /// Plain text summary
    Text,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let text = read_input(&args.input)?;

    let registry = load_registry(registry_path(args.registry.as_deref(), &config).as_deref())?;
    let version = resolve_version(&registry, args.registry_version.as_deref(), &config)?;
    info!("Extracting {} under registry {}", args.input.display(), version.version());

    let enable_fallback = config.extraction.enable_fallback && !args.no_fallback;
    let record = Orchestrator::new(&version)
        .with_fallback(enable_fallback)
        .extract(&text);

    let output = format_record(&record, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_confidence {
        println!();
        println!(
            "{} Overall confidence: {} ({} of {} fields)",
            style("ℹ").blue(),
            record.overall_confidence(),
            record.fields_extracted(),
            FieldId::ALL.len()
        );
        let missing = record.missing_fields();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|f| f.as_str()).collect();
            println!("{} Missing: {}", style("ℹ").blue(), names.join(", "));
        }
        println!(
            "{} Processing time: {}ms",
            style("ℹ").blue(),
            start.elapsed().as_millis()
        );
    }

    Ok(())
}

fn read_input(input: &PathBuf) -> anyhow::Result<String> {
    if input.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }

    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    Ok(fs::read_to_string(input)?)
}

fn format_record(record: &DocumentExtractionRecord, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(record)?),
        OutputFormat::Csv => format_csv(record),
        OutputFormat::Text => Ok(format_text(record)),
    }
}

fn format_csv(record: &DocumentExtractionRecord) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["field", "value", "confidence", "source", "rank"])?;

    for (field, result) in &record.fields {
        wtr.write_record([
            field.as_str(),
            &result.value,
            &result.confidence.to_string(),
            source_name(result.source),
            &result.rank.map(|r| r.to_string()).unwrap_or_default(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(record: &DocumentExtractionRecord) -> String {
    let mut output = String::new();

    output.push_str(&format!("Registry version: {}\n", record.registry_version));
    output.push('\n');

    if record.fields.is_empty() {
        output.push_str("No fields extracted\n");
        return output;
    }

    for (field, result) in &record.fields {
        let provenance = match result.rank {
            Some(rank) => format!("pattern #{}", rank),
            None => source_name(result.source).to_string(),
        };
        output.push_str(&format!(
            "  {:<22} {}  [{}, {}]\n",
            field.as_str(),
            result.value,
            result.confidence,
            provenance
        ));
    }

    output
}

fn source_name(source: Source) -> &'static str {
    match source {
        Source::Pattern => "pattern",
        Source::Fallback => "fallback",
    }
}
