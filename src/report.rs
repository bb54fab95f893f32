// 📈 Report Builder - finalize accumulators into the ranked expense report
//
// Output (despesas_agregadas.csv):
//   Razao_Social;Modalidade;UF;Total_Despesas;Media_Despesas;Desvio_Padrao
//   ACME SAUDE;Cooperativa;SP;1500.50;1500.50;0.00

use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::aggregator::Aggregator;
use crate::error::Result;
use crate::text::DELIMITER;

pub const REPORT_HEADER: [&str; 6] = [
    "Razao_Social",
    "Modalidade",
    "UF",
    "Total_Despesas",
    "Media_Despesas",
    "Desvio_Padrao",
];

// ============================================================================
// REPORT ROW
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub legal_name: String,
    pub category: String,
    pub region: String,
    pub total: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl ReportRow {
    /// Fields in output order. Numbers always use `.` and 2 decimals.
    pub fn to_record(&self) -> [String; 6] {
        [
            self.legal_name.clone(),
            self.category.clone(),
            self.region.clone(),
            format!("{:.2}", self.total),
            format!("{:.2}", self.mean),
            format!("{:.2}", self.std_dev),
        ]
    }
}

// ============================================================================
// FINALIZATION
// ============================================================================

/// Derive one row per group, sorted by total descending.
///
/// The sort is stable over first-seen group order, so equal totals keep a
/// deterministic order for a given input.
pub fn finalize(aggregator: &Aggregator) -> Vec<ReportRow> {
    let mut rows: Vec<ReportRow> = aggregator
        .groups()
        .map(|(key, acc)| ReportRow {
            legal_name: key.legal_name.clone(),
            category: key.category.clone(),
            region: key.region.clone(),
            total: acc.total(),
            mean: acc.mean(),
            std_dev: acc.std_dev(),
        })
        .collect();

    rows.sort_by(|a, b| b.total.total_cmp(&a.total));
    rows
}

// ============================================================================
// SERIALIZATION
// ============================================================================

/// Write header + rows as `;`-delimited text
pub fn write_report<W: Write>(writer: W, rows: &[ReportRow]) -> Result<()> {
    let mut wtr = WriterBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(false)
        .from_writer(writer);

    wtr.write_record(REPORT_HEADER)?;
    for row in rows {
        wtr.write_record(row.to_record())?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Render the report into memory
pub fn render_report(rows: &[ReportRow]) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_report(&mut buffer, rows)?;
    Ok(buffer)
}
