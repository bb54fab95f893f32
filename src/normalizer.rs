// 🧹 Record Normalizer - one consolidated line → CandidateFact
//
// Consolidated layout (positional, no header):
//   [0] label  [1] Registro ANS  [2] period  [3] amount ("1500,50" or "1500.50")

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::text::clean_field;

// ============================================================================
// LAYOUT
// ============================================================================

/// Column positions of the consolidated fact file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordLayout {
    pub code_column: usize,
    pub amount_column: usize,

    /// Records with fewer fields are structurally invalid
    pub min_fields: usize,
}

impl RecordLayout {
    pub const CODE_COLUMN: usize = 1;
    pub const AMOUNT_COLUMN: usize = 3;
    pub const MIN_FIELDS: usize = 4;
}

impl Default for RecordLayout {
    fn default() -> Self {
        RecordLayout {
            code_column: Self::CODE_COLUMN,
            amount_column: Self::AMOUNT_COLUMN,
            min_fields: Self::MIN_FIELDS,
        }
    }
}

// ============================================================================
// OUTCOMES
// ============================================================================

/// A line that passed structural and numeric validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateFact {
    pub registry_code: String,

    /// Always finite and > 0
    pub amount: f64,
}

/// Why a record never reached the aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkipReason {
    /// Fewer fields than the layout requires
    MissingFields,

    /// Amount is not a number, not finite, or not positive
    InvalidAmount,

    /// Registro ANS not present in the operator registry
    UnknownRegistryCode,

    /// Operator CNPJ fails the checksum
    InvalidTaxId,
}

impl SkipReason {
    pub const ALL: [SkipReason; 4] = [
        SkipReason::MissingFields,
        SkipReason::InvalidAmount,
        SkipReason::UnknownRegistryCode,
        SkipReason::InvalidTaxId,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::MissingFields => "discarded: missing fields",
            SkipReason::InvalidAmount => "discarded: invalid amount",
            SkipReason::UnknownRegistryCode => "discarded: unknown registry code",
            SkipReason::InvalidTaxId => "discarded: invalid tax id",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Normalize one positional record.
///
/// Fails closed: any structural or numeric problem yields a `SkipReason`,
/// never a panic or an error.
pub fn normalize<S: AsRef<str>>(
    fields: &[S],
    layout: &RecordLayout,
) -> Result<CandidateFact, SkipReason> {
    if fields.len() < layout.min_fields {
        return Err(SkipReason::MissingFields);
    }

    let code = fields
        .get(layout.code_column)
        .map(|f| clean_field(f.as_ref()))
        .ok_or(SkipReason::MissingFields)?;

    let amount = fields
        .get(layout.amount_column)
        .ok_or(SkipReason::MissingFields)
        .and_then(|f| parse_amount(f.as_ref()))?;

    Ok(CandidateFact {
        registry_code: code,
        amount,
    })
}

/// Parse a decimal amount with either `,` or `.` as separator.
/// Only finite values greater than zero are accepted.
pub fn parse_amount(raw: &str) -> Result<f64, SkipReason> {
    let cleaned = clean_field(raw).replace(',', ".");

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        _ => Err(SkipReason::InvalidAmount),
    }
}

// ============================================================================
// TESTS
// ============================================================================
