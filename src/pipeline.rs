// 🚚 Pipeline - one batch run: registry → normalize → join → aggregate → report
//
// Single pass, single thread. The registry is fully loaded before the first
// fact is read and is only borrowed immutably afterwards.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::aggregator::Aggregator;
use crate::config::PipelineConfig;
use crate::enrichment::{enrich, JoinOutcome};
use crate::error::{PipelineError, Result};
use crate::normalizer::{normalize, RecordLayout, SkipReason};
use crate::registry::{ReferenceTable, RegistryStats};
use crate::report::{finalize, render_report, ReportRow};
use crate::text::{decode, split_fields};

// ============================================================================
// COUNTERS
// ============================================================================

/// Per-run record bookkeeping, printed at the end of every run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordStats {
    pub total_lines: usize,
    pub valid_records: usize,
    pub missing_fields: usize,
    pub invalid_amount: usize,
    pub unknown_registry_code: usize,
    pub invalid_tax_id: usize,
}

impl RecordStats {
    pub fn record_skip(&mut self, reason: SkipReason) {
        *self.counter_mut(reason) += 1;
    }

    pub fn count(&self, reason: SkipReason) -> usize {
        match reason {
            SkipReason::MissingFields => self.missing_fields,
            SkipReason::InvalidAmount => self.invalid_amount,
            SkipReason::UnknownRegistryCode => self.unknown_registry_code,
            SkipReason::InvalidTaxId => self.invalid_tax_id,
        }
    }

    fn counter_mut(&mut self, reason: SkipReason) -> &mut usize {
        match reason {
            SkipReason::MissingFields => &mut self.missing_fields,
            SkipReason::InvalidAmount => &mut self.invalid_amount,
            SkipReason::UnknownRegistryCode => &mut self.unknown_registry_code,
            SkipReason::InvalidTaxId => &mut self.invalid_tax_id,
        }
    }

    pub fn discarded(&self) -> usize {
        SkipReason::ALL.iter().map(|r| self.count(*r)).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub registry: RegistryStats,
    pub records: RecordStats,
    pub groups: usize,
    pub output: PathBuf,
    /// SHA-256 of the report bytes, identical across reruns on the same input
    pub report_sha256: String,
}

// ============================================================================
// CORE PASS
// ============================================================================

/// Normalize, join and aggregate every line of the consolidated fact text
pub fn aggregate_facts(
    text: &str,
    table: &ReferenceTable,
    layout: &RecordLayout,
) -> (Aggregator, RecordStats) {
    let mut aggregator = Aggregator::new();
    let mut stats = RecordStats::default();

    // Every line counts, blank ones included (they carry no fields)
    for (idx, raw) in text.lines().enumerate() {
        stats.total_lines += 1;
        let line = idx + 1;

        match process_record(&split_fields(raw), table, layout, &mut aggregator) {
            Ok(()) => stats.valid_records += 1,
            Err(reason) => {
                debug!(line, %reason, "Fact line skipped");
                stats.record_skip(reason);
            }
        }
    }

    (aggregator, stats)
}

fn process_record(
    fields: &[&str],
    table: &ReferenceTable,
    layout: &RecordLayout,
    aggregator: &mut Aggregator,
) -> std::result::Result<(), SkipReason> {
    let fact = normalize(fields, layout)?;

    match enrich(fact, table) {
        JoinOutcome::NoMatch => Err(SkipReason::UnknownRegistryCode),
        JoinOutcome::Matched(enriched) if !enriched.valid_tax_id => Err(SkipReason::InvalidTaxId),
        JoinOutcome::Matched(enriched) => {
            aggregator.add(&enriched);
            Ok(())
        }
    }
}

// ============================================================================
// FULL RUN
// ============================================================================

/// Run the aggregation stage end to end.
///
/// Fatal: unreadable registry, unreadable facts, unwritable report or
/// summary. Both output files are opened before any record is processed.
pub fn run(config: &PipelineConfig) -> Result<(RunSummary, Vec<ReportRow>)> {
    let table = ReferenceTable::load(&config.reference, config.reference_header_lines)?;

    info!(path = %config.facts.display(), "Reading consolidated facts");
    let bytes = fs::read(&config.facts).map_err(|source| PipelineError::FactsUnreadable {
        path: config.facts.clone(),
        source,
    })?;

    let summary_file = match &config.summary {
        Some(path) => Some((create_output(path)?, path)),
        None => None,
    };
    let mut output = create_output(&config.output)?;

    let (aggregator, records) = aggregate_facts(&decode(&bytes), &table, &config.layout);
    info!(
        total = records.total_lines,
        valid = records.valid_records,
        discarded = records.discarded(),
        groups = aggregator.len(),
        "Facts aggregated"
    );

    let rows = finalize(&aggregator);
    let report = render_report(&rows)?;
    output
        .write_all(&report)
        .and_then(|_| output.flush())
        .map_err(|source| PipelineError::OutputUnwritable {
            path: config.output.clone(),
            source,
        })?;
    info!(path = %config.output.display(), rows = rows.len(), "Report written");

    let summary = RunSummary {
        registry: table.stats().clone(),
        records,
        groups: aggregator.len(),
        output: config.output.clone(),
        report_sha256: format!("{:x}", Sha256::digest(&report)),
    };

    if let Some((file, path)) = summary_file {
        write_summary(file, path, &summary)?;
    }

    Ok((summary, rows))
}

fn create_output(path: &Path) -> Result<File> {
    File::create(path).map_err(|source| PipelineError::OutputUnwritable {
        path: path.to_path_buf(),
        source,
    })
}

/// Write the JSON summary into an already opened file
pub fn write_summary(mut file: File, path: &Path, summary: &RunSummary) -> Result<()> {
    serde_json::to_writer_pretty(&mut file, summary)?;
    writeln!(file).map_err(|source| PipelineError::OutputUnwritable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
