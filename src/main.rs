use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ans_expenses::logging::init_logging;
use ans_expenses::{consolidate, run, PipelineConfig, RunSummary, SkipReason};

#[derive(Parser, Debug)]
#[command(name = "ans-expenses", version, about = "ANS operator expense aggregation")]
struct Cli {
    /// TOML config file (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging for skipped lines
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate, enrich and aggregate the consolidated fact file (default)
    Aggregate {
        #[arg(long)]
        reference: Option<PathBuf>,
        #[arg(long)]
        facts: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Build the consolidated fact file from quarterly statements
    Consolidate {
        /// Quarterly statement files (e.g. 1T2025.csv 2T2025.csv)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Some(Command::Consolidate { inputs, output }) => {
            let output = output.unwrap_or_else(|| config.facts.clone());
            run_consolidate(&inputs, output, &config.expense_terms)
        }
        Some(Command::Aggregate {
            reference,
            facts,
            output,
            summary,
        }) => {
            if let Some(path) = reference {
                config.reference = path;
            }
            if let Some(path) = facts {
                config.facts = path;
            }
            if let Some(path) = output {
                config.output = path;
            }
            if summary.is_some() {
                config.summary = summary;
            }
            run_aggregate(&config)
        }
        None => run_aggregate(&config),
    }
}

fn run_consolidate(inputs: &[PathBuf], output: PathBuf, terms: &[String]) -> Result<()> {
    println!("🗂️  Consolidating {} statement file(s)", inputs.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let stats = consolidate(inputs, &output, terms)
        .with_context(|| format!("Consolidation into {} failed", output.display()))?;

    println!("✓ Files read:        {}", stats.files_read);
    println!("✓ Files skipped:     {}", stats.files_skipped);
    println!("✓ Rows read:         {}", stats.rows_read);
    println!("✓ Expense rows:      {}", stats.expense_rows);
    println!("\n📄 Consolidated file: {}", output.display());

    Ok(())
}

fn run_aggregate(config: &PipelineConfig) -> Result<()> {
    println!("📊 Expense aggregation: validate → enrich → aggregate");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let (summary, _rows) = run(config).context("Aggregation run failed")?;
    print_summary(&summary);

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let registry = &summary.registry;
    println!("\n🏥 Registry");
    println!("✓ Operators loaded:  {}", registry.entities);
    println!("  blank codes:       {}", registry.blank_codes);
    println!("  malformed lines:   {}", registry.malformed);
    println!("  replaced (dup):    {}", registry.replaced);

    let records = &summary.records;
    println!("\n🧾 Records");
    println!("  total lines:       {}", records.total_lines);
    println!("✓ valid records:     {}", records.valid_records);
    for reason in SkipReason::ALL {
        println!("  {:<34} {}", reason.label(), records.count(reason));
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ {} groups written to {}", summary.groups, summary.output.display());
    println!("   sha256 {}", summary.report_sha256);
}
