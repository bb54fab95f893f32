// ⚙️ Pipeline configuration - optional TOML file, defaults match the ANS run
//
//   reference = "Relatorio_Cadop.csv"
//   facts = "consolidado.csv"
//   output = "despesas_agregadas.csv"
//   summary = "resumo_execucao.json"   # optional
//   reference_header_lines = 3
//   expense_terms = ["EVENTOS", "SINISTROS"]
//
//   [layout]
//   code_column = 1
//   amount_column = 3
//   min_fields = 4

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::normalizer::RecordLayout;
use crate::registry::DEFAULT_HEADER_LINES;

pub const DEFAULT_REFERENCE: &str = "Relatorio_Cadop.csv";
pub const DEFAULT_FACTS: &str = "consolidado.csv";
pub const DEFAULT_OUTPUT: &str = "despesas_agregadas.csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Operator registry (Relatorio_Cadop.csv)
    pub reference: PathBuf,

    /// Consolidated fact file
    pub facts: PathBuf,

    /// Aggregated report
    pub output: PathBuf,

    /// Run summary as JSON, not written when absent
    pub summary: Option<PathBuf>,

    pub reference_header_lines: usize,

    pub layout: RecordLayout,

    /// Descriptions that mark an accounting line as an expense (consolidation)
    pub expense_terms: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            reference: PathBuf::from(DEFAULT_REFERENCE),
            facts: PathBuf::from(DEFAULT_FACTS),
            output: PathBuf::from(DEFAULT_OUTPUT),
            summary: None,
            reference_header_lines: DEFAULT_HEADER_LINES,
            layout: RecordLayout::default(),
            expense_terms: vec!["EVENTOS".to_string(), "SINISTROS".to_string()],
        }
    }
}

impl PipelineConfig {
    /// Load from a TOML file; missing keys keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| PipelineError::ConfigUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.reference, PathBuf::from("Relatorio_Cadop.csv"));
        assert_eq!(config.facts, PathBuf::from("consolidado.csv"));
        assert_eq!(config.output, PathBuf::from("despesas_agregadas.csv"));
        assert_eq!(config.reference_header_lines, 3);
        assert_eq!(config.layout.code_column, 1);
        assert_eq!(config.layout.amount_column, 3);
        assert_eq!(config.layout.min_fields, 4);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = PipelineConfig::from_toml(
            r#"
            output = "out/report.csv"
            summary = "out/summary.json"

            [layout]
            amount_column = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.output, PathBuf::from("out/report.csv"));
        assert_eq!(config.summary, Some(PathBuf::from("out/summary.json")));
        assert_eq!(config.layout.amount_column, 4);
        assert_eq!(config.layout.code_column, 1, "Unset layout keys keep defaults");
        assert_eq!(config.reference, PathBuf::from("Relatorio_Cadop.csv"));
    }

    #[test]
    fn test_invalid_toml() {
        let result = PipelineConfig::from_toml("reference_header_lines = \"three\"");
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_missing_config_file() {
        let result = PipelineConfig::from_file("/nope/ans.toml");
        assert!(matches!(result, Err(PipelineError::ConfigUnreadable { .. })));
    }
}
