// ANS Expenses - Core Library
// Registry load, validation, enrichment and aggregation of operator expenses.
// Exposes all modules for use in the CLI and tests.

pub mod text;
pub mod error;
pub mod config;
pub mod logging;
pub mod registry;       // Reference table (Relatorio_Cadop)
pub mod cnpj;           // Tax id checksum
pub mod normalizer;     // Raw line → CandidateFact
pub mod enrichment;     // CandidateFact × registry
pub mod aggregator;     // Running statistics per group
pub mod report;         // Ranked report
pub mod pipeline;       // One full run + counters
pub mod consolidate;    // Quarterly statements → consolidated fact file

// Re-export commonly used types
pub use error::{PipelineError, Result};
pub use config::PipelineConfig;
pub use registry::{ReferenceEntity, ReferenceTable, RegistryStats, RowDefect};
pub use cnpj::is_valid_cnpj;
pub use normalizer::{normalize, CandidateFact, RecordLayout, SkipReason};
pub use enrichment::{enrich, EnrichedFact, JoinOutcome};
pub use aggregator::{Aggregator, GroupAccumulator, GroupKey};
pub use report::{finalize, render_report, write_report, ReportRow, REPORT_HEADER};
pub use pipeline::{aggregate_facts, run, RecordStats, RunSummary};
pub use consolidate::{consolidate, ConsolidationStats, QuarterPeriod};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
