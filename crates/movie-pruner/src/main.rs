//! CLI entry point for the IMDb title pipeline and the column profiler.

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use movie_pruner::{
    ClassificationTable, DatasetProfiler, JoinMultiplicity, PipelineConfig, PipelineResult,
    ProfileReport, Relation, ReportGenerator, RunReport, TableLoader, TableWriter, TitlePipeline,
};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Combine and profile IMDb title extracts",
    long_about = "Joins the IMDb title.akas, title.basics, title.ratings and name.basics \
                  extracts into one relation of titles and their actors, and writes data \
                  dictionaries for tab-separated files.\n\n\
                  EXAMPLES:\n  \
                  # Combine the extracts in ./data into data/us.movies.actors.tsv\n  \
                  movie-pruner join --data-dir data\n\n  \
                  # Profile the combined file\n  \
                  movie-pruner profile -i data/us.movies.actors.tsv -o data_dict.tsv\n\n  \
                  # Look at a source table before choosing filter values\n  \
                  movie-pruner inspect -i data/title.akas.tsv --distinct region"
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Combine the four extracts into one relation
    Join(JoinArgs),
    /// Write a data dictionary for one file
    Profile(ProfileArgs),
    /// Print the shape, first rows and value counts of one file
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct JoinArgs {
    /// Directory holding the four source files
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Output file; overwritten if it exists
    #[arg(short, long, default_value = "data/us.movies.actors.tsv")]
    output: PathBuf,

    /// Regions kept from title.akas (repeatable, default US)
    #[arg(long = "region", value_delimiter = ',')]
    regions: Vec<String>,

    /// Title types kept from title.basics (default movie,tvMovie)
    #[arg(long = "title-type", value_delimiter = ',')]
    title_types: Vec<String>,

    /// Professions that qualify a person (default actor,actress)
    #[arg(long = "profession", value_delimiter = ',')]
    professions: Vec<String>,

    /// Abort on malformed join keys instead of dropping those rows
    #[arg(long)]
    no_remediation: bool,

    /// Drop output rows that repeat exactly
    #[arg(long)]
    distinct_rows: bool,

    /// Write the run report as JSON next to the output (<output>_report.json)
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Print the run result as JSON instead of a summary; disables logging
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct ProfileArgs {
    /// File to profile
    #[arg(short, long, default_value = "data/us.movies.actors.tsv")]
    input: PathBuf,

    /// Where the data dictionary is written
    #[arg(short, long, default_value = "data_dict.tsv")]
    output: PathBuf,

    /// JSON object mapping column names to nominal/ordinal/scalar
    ///
    /// Defaults to the built-in table for the combined IMDb relation.
    #[arg(short, long)]
    classifications: Option<PathBuf>,

    /// Print the profile as JSON instead of writing the dictionary; disables logging
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// File to inspect
    #[arg(short, long)]
    input: PathBuf,

    /// Number of rows to print
    #[arg(short = 'n', long, default_value = "15")]
    rows: usize,

    /// Columns whose distinct values are listed with their counts
    #[arg(long, value_delimiter = ',')]
    distinct: Vec<String>,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let json_output = match &cli.command {
        Command::Join(args) => args.json,
        Command::Profile(args) => args.json,
        Command::Inspect(_) => false,
    };
    init_logging(&cli.log_level, cli.quiet, json_output);

    match cli.command {
        Command::Join(args) => run_join(args),
        Command::Profile(args) => run_profile(args),
        Command::Inspect(args) => run_inspect(args),
    }
}

// ============================================================================
// join
// ============================================================================

fn run_join(args: JoinArgs) -> Result<()> {
    let mut builder = PipelineConfig::builder()
        .data_dir(&args.data_dir)
        .output_path(&args.output)
        .remediate_malformed_keys(!args.no_remediation);
    if !args.regions.is_empty() {
        builder = builder.regions(args.regions.clone());
    }
    if !args.title_types.is_empty() {
        builder = builder.title_types(args.title_types.clone());
    }
    if !args.professions.is_empty() {
        builder = builder.professions(args.professions.clone());
    }
    if args.distinct_rows {
        builder = builder.multiplicity(JoinMultiplicity::DistinctRows);
    }
    let config = builder.build()?;

    let pipeline = TitlePipeline::builder().config(config).build()?;
    let result = match pipeline.run() {
        Ok(result) => result,
        Err(e) => {
            if args.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "success": false,
                        "input_error": e.is_input_error(),
                        "error": e,
                    }))?
                );
            }
            if args.emit_report {
                write_run_report(&args, PipelineResult::failed(e.to_string()))?;
            }
            error!("Pipeline failed: {}", e);
            if e.is_input_error() {
                error!("The source files need fixing; re-running as is will fail the same way");
            }
            return Err(anyhow!("Pipeline failed: {}", e));
        }
    };

    if args.emit_report {
        write_run_report(&args, result.clone())?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_join_summary(&result);
    Ok(())
}

fn write_run_report(args: &JoinArgs, result: PipelineResult) -> Result<()> {
    let stem = args
        .output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let path = args.output.with_file_name(format!("{stem}_report.json"));
    ReportGenerator::default().write_json(&RunReport::new(&args.data_dir, result), &path)?;
    Ok(())
}

/// Print a human-readable summary of a join run.
fn print_join_summary(result: &PipelineResult) {
    println!();
    println!("{}", "=".repeat(80));
    println!("JOIN COMPLETE");
    println!("{}", "=".repeat(80));

    if let Some(output) = &result.output_path {
        println!("Output: {output}");
    }
    let Some(summary) = &result.summary else {
        println!("{}", "=".repeat(80));
        return;
    };
    println!(
        "Shape:  {} rows x {} columns (self-check: {} expected)",
        summary.output_shape.0, summary.output_shape.1, summary.expected_rows
    );
    println!("Duration: {}ms", summary.duration_ms);
    println!();

    println!("Stages:");
    for action in &summary.actions {
        println!("  - {action}");
    }
    println!();

    println!("Key checks:");
    for report in &summary.key_reports {
        if report.all_well_formed() {
            println!("  {:<16} all {} keys well formed", report.table, report.total);
        } else {
            println!(
                "  {:<16} {} of {} malformed, most frequent {:?}",
                report.table, report.malformed, report.total, report.top_offenders
            );
        }
    }
    println!();

    if !summary.warnings.is_empty() {
        println!("Warnings:");
        for warning in &summary.warnings {
            println!("  ! {warning}");
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("{}", "=".repeat(80));
}

// ============================================================================
// profile
// ============================================================================

fn run_profile(args: ProfileArgs) -> Result<()> {
    let classifications = match &args.classifications {
        Some(path) => ClassificationTable::from_json_file(path)
            .with_context(|| format!("reading classifications from {}", path.display()))?,
        None => ClassificationTable::imdb(),
    };

    let relation = TableLoader::default().load(&args.input, table_name(&args.input))?;
    info!(
        "Loaded {}: {} rows x {} columns",
        args.input.display(),
        relation.height(),
        relation.width()
    );

    let profile = DatasetProfiler::profile(&relation, &classifications)?;
    let report = ProfileReport::new(args.input.display().to_string(), profile);

    if args.json {
        println!("{}", report.to_json()?);
        return Ok(());
    }

    ReportGenerator::default().write_profile(&report, &args.output)?;
    println!(
        "Data dictionary for {} ({} columns) written to {}",
        args.input.display(),
        report.profile.column_profiles.len(),
        args.output.display()
    );
    Ok(())
}

// ============================================================================
// inspect
// ============================================================================

/// Preview a table the way the extracts were explored before choosing filters.
///
/// Uses `println!` for the preview itself; it is the purpose of the command.
fn run_inspect(args: InspectArgs) -> Result<()> {
    let relation = TableLoader::default().load(&args.input, table_name(&args.input))?;

    println!("{}", "=".repeat(80));
    println!("{}", args.input.display());
    println!("{}", "=".repeat(80));
    println!("Rows: {}", relation.height());
    println!("Columns: {}", relation.width());
    println!("Duplicate rows: {}", DatasetProfiler::duplicate_rows(&relation));
    println!();

    let head = TableWriter::default().to_string(&relation.head(args.rows))?;
    print!("{head}");
    println!();

    for column in &args.distinct {
        print_value_counts(&relation, column)?;
    }
    Ok(())
}

fn print_value_counts(relation: &Relation, column: &str) -> Result<()> {
    let counts = relation.value_counts(column)?;
    println!("{column}: {} distinct value(s)", counts.len());
    println!("{}", "-".repeat(40));
    for (value, count) in counts {
        let shown = value.render().unwrap_or_else(|| movie_pruner::MISSING_TOKEN.to_string());
        println!("  {:<30} {count}", truncate_str(&shown, 29));
    }
    println!();
    Ok(())
}

/// Truncate a string to max length with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Table name for a file: its name without the `.tsv` extension.
fn table_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table")
        .to_string()
}
