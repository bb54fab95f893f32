// 🗂️ Consolidation - quarterly accounting statements → consolidated fact file
//
// Each quarterly file (e.g. "3T2025.csv") has a header row. Column names drift
// between periods, so columns are located by name and a missing one reads as
// empty. Only expense lines (EVENTOS / SINISTROS) are kept.
//
// Output line (no header), the layout `normalizer` consumes:
//   Operadora 419761;419761;3T2025;1500,50

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::text::{decode, DELIMITER};

pub const REGISTRY_CODE_HEADER: &str = "REG_ANS";
pub const DESCRIPTION_HEADER: &str = "DESCRICAO";
pub const AMOUNT_HEADER: &str = "VL_SALDO_FINAL";

/// Period label when the file name carries none
pub const UNKNOWN_PERIOD: &str = "ND";

// ============================================================================
// PERIOD
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarterPeriod {
    pub quarter: u8,
    pub year: u16,
}

impl QuarterPeriod {
    /// "3T2025.csv" → 3rd quarter of 2025
    pub fn from_file_name(name: &str) -> Option<Self> {
        let bytes = name.as_bytes();
        if bytes.len() < 6 || !matches!(bytes[1], b'T' | b't') {
            return None;
        }

        let quarter = match bytes[0] {
            b'1'..=b'4' => bytes[0] - b'0',
            _ => return None,
        };

        let year_digits = &bytes[2..6];
        if !year_digits.iter().all(u8::is_ascii_digit) {
            return None;
        }
        let year = std::str::from_utf8(year_digits).ok()?.parse().ok()?;

        Some(QuarterPeriod { quarter, year })
    }
}

impl fmt::Display for QuarterPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}T{}", self.quarter, self.year)
    }
}

// ============================================================================
// STATISTICS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationStats {
    pub files_read: usize,
    pub files_skipped: usize,
    pub rows_read: usize,
    pub expense_rows: usize,
}

// ============================================================================
// CONSOLIDATION
// ============================================================================

/// Is this description an expense line?
pub fn is_expense(description: &str, expense_terms: &[String]) -> bool {
    let upper = description.to_uppercase();
    expense_terms
        .iter()
        .any(|term| upper.contains(&term.to_uppercase()))
}

/// Header columns located by name, case-insensitively
struct Columns {
    code: Option<usize>,
    description: Option<usize>,
    amount: Option<usize>,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Self {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        Columns {
            code: find(REGISTRY_CODE_HEADER),
            description: find(DESCRIPTION_HEADER),
            amount: find(AMOUNT_HEADER),
        }
    }

    fn get<'r>(record: &'r StringRecord, idx: Option<usize>) -> &'r str {
        idx.and_then(|i| record.get(i)).unwrap_or("")
    }
}

/// Filter one decoded statement, appending expense lines to `out`
pub fn consolidate_text<W: Write>(
    text: &str,
    period: &str,
    expense_terms: &[String],
    out: &mut csv::Writer<W>,
    stats: &mut ConsolidationStats,
) -> Result<()> {
    let mut reader = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let columns = Columns::locate(reader.headers()?);
    if columns.code.is_none() || columns.amount.is_none() {
        warn!(period, "Statement is missing REG_ANS or VL_SALDO_FINAL, values will be empty");
    }

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!(period, error = %e, "Skipping unreadable statement row");
                continue;
            }
        };
        stats.rows_read += 1;

        if !is_expense(Columns::get(&record, columns.description), expense_terms) {
            continue;
        }

        let code = Columns::get(&record, columns.code);
        let label = format!("Operadora {}", code);
        out.write_record([
            label.as_str(),
            code,
            period,
            Columns::get(&record, columns.amount),
        ])?;
        stats.expense_rows += 1;
    }

    Ok(())
}

/// Consolidate quarterly statements into one fact file.
///
/// An unreadable input is logged and skipped; an unwritable output is fatal.
pub fn consolidate<P: AsRef<Path>>(
    inputs: &[P],
    output: &Path,
    expense_terms: &[String],
) -> Result<ConsolidationStats> {
    let file = File::create(output).map_err(|source| PipelineError::OutputUnwritable {
        path: output.to_path_buf(),
        source,
    })?;
    let mut out = WriterBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(false)
        .from_writer(file);

    let mut stats = ConsolidationStats::default();

    for input in inputs {
        let path = input.as_ref();
        info!(path = %path.display(), "Consolidating statement");

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable statement");
                stats.files_skipped += 1;
                continue;
            }
        };

        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let period = match QuarterPeriod::from_file_name(name) {
            Some(period) => period.to_string(),
            None => {
                warn!(file = name, "No <q>T<yyyy> period in file name");
                UNKNOWN_PERIOD.to_string()
            }
        };

        consolidate_text(&decode(&bytes), &period, expense_terms, &mut out, &mut stats)?;
        stats.files_read += 1;
    }

    out.flush().map_err(|source| PipelineError::OutputUnwritable {
        path: output.to_path_buf(),
        source,
    })?;

    info!(
        files = stats.files_read,
        rows = stats.rows_read,
        expenses = stats.expense_rows,
        "Consolidation finished"
    );
    Ok(stats)
}
