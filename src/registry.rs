// 🏥 Operator Registry - Relatorio_Cadop reference table
//
// "Registro ANS is the IDENTITY, everything else on the row is a VALUE"
//
// The agency file is positional:
//   [0] Registro ANS  [1] CNPJ  [2] Razão Social  ...  [4] Modalidade  ...  [10] UF
// Rows are parsed ONCE into a typed `ReferenceEntity`; short rows get defaults
// instead of failing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::text::{clean_field, decode, skip_lines, split_fields};

// ============================================================================
// COLUMN LAYOUT
// ============================================================================

pub const CODE_COLUMN: usize = 0;
pub const TAX_ID_COLUMN: usize = 1;
pub const LEGAL_NAME_COLUMN: usize = 2;
pub const CATEGORY_COLUMN: usize = 4;
pub const REGION_COLUMN: usize = 10;

/// Modalidade used when the row stops before column 4
pub const DEFAULT_CATEGORY: &str = "Unknown";

/// UF used when the row stops before column 10
pub const DEFAULT_REGION: &str = "ND";

/// Metadata lines at the top of Relatorio_Cadop.csv
pub const DEFAULT_HEADER_LINES: usize = 3;

// ============================================================================
// REFERENCE ENTITY
// ============================================================================

/// One registered health plan operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntity {
    /// Registro ANS (join key)
    pub registry_code: String,

    /// CNPJ as published, may be formatted
    pub tax_id: String,

    /// Razão Social
    pub legal_name: String,

    /// Modalidade (e.g. "Cooperativa Médica")
    pub category: String,

    /// UF
    pub region: String,
}

/// Why a registry line produced no entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowDefect {
    /// Registro ANS missing or blank after cleanup
    BlankCode,

    /// Line ends before the CNPJ and Razão Social columns
    Truncated,
}

impl ReferenceEntity {
    /// Build from positional fields (trailing empty fields already dropped).
    ///
    /// Modalidade and UF fall back to defaults when the line stops short of
    /// them. CNPJ and Razão Social are required columns; present but empty
    /// values are kept and fail the CNPJ check later.
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> std::result::Result<Self, RowDefect> {
        let field = |idx: usize| fields.get(idx).map(|f| clean_field(f.as_ref()));

        let registry_code = field(CODE_COLUMN).unwrap_or_default();
        if registry_code.is_empty() {
            return Err(RowDefect::BlankCode);
        }
        if fields.len() <= LEGAL_NAME_COLUMN {
            return Err(RowDefect::Truncated);
        }

        Ok(ReferenceEntity {
            registry_code,
            tax_id: field(TAX_ID_COLUMN).unwrap_or_default(),
            legal_name: field(LEGAL_NAME_COLUMN).unwrap_or_default(),
            category: field(CATEGORY_COLUMN).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            region: field(REGION_COLUMN).unwrap_or_else(|| DEFAULT_REGION.to_string()),
        })
    }
}

// ============================================================================
// LOAD STATISTICS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Data lines seen after the metadata header
    pub lines_read: usize,

    /// Distinct registry codes in the table
    pub entities: usize,

    /// Lines whose code was blank after cleanup
    pub blank_codes: usize,

    /// Lines with a code but without CNPJ / Razão Social columns
    pub malformed: usize,

    /// Lines that replaced an earlier line with the same code
    pub replaced: usize,
}

// ============================================================================
// REFERENCE TABLE
// ============================================================================

/// Read-only lookup from Registro ANS to operator.
///
/// Duplicate codes: LAST occurrence wins. A later line for the same code
/// replaces the earlier entity and is counted in `RegistryStats::replaced`.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    entities: HashMap<String, ReferenceEntity>,
    stats: RegistryStats,
}

impl ReferenceTable {
    /// Load Relatorio_Cadop.csv, skipping `header_lines` metadata lines.
    ///
    /// A missing or unreadable file is fatal: nothing may run against a
    /// partially loaded table.
    pub fn load<P: AsRef<Path>>(path: P, header_lines: usize) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading operator registry");

        let bytes = fs::read(path).map_err(|source| PipelineError::ReferenceUnreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let table = Self::from_text(&decode(&bytes), header_lines);
        info!(
            entities = table.stats.entities,
            blank_codes = table.stats.blank_codes,
            malformed = table.stats.malformed,
            replaced = table.stats.replaced,
            "Operator registry loaded"
        );
        Ok(table)
    }

    /// Parse already decoded registry text
    pub fn from_text(text: &str, header_lines: usize) -> Self {
        let mut table = ReferenceTable::default();

        for (idx, raw) in skip_lines(text, header_lines).lines().enumerate() {
            table.stats.lines_read += 1;

            match ReferenceEntity::from_fields(&split_fields(raw)) {
                Ok(entity) => table.insert(entity),
                Err(RowDefect::BlankCode) => table.stats.blank_codes += 1,
                Err(RowDefect::Truncated) => {
                    let line = header_lines + idx + 1;
                    warn!(line, "Skipping malformed registry line, no CNPJ / Razão Social");
                    table.stats.malformed += 1;
                }
            }
        }

        table.stats.entities = table.entities.len();
        table
    }

    /// Build a table from entities already in memory (same last-wins policy)
    pub fn from_entities<I: IntoIterator<Item = ReferenceEntity>>(entities: I) -> Self {
        let mut table = ReferenceTable::default();
        for entity in entities {
            table.stats.lines_read += 1;
            table.insert(entity);
        }
        table.stats.entities = table.entities.len();
        table
    }

    fn insert(&mut self, entity: ReferenceEntity) {
        if let Some(previous) = self.entities.insert(entity.registry_code.clone(), entity) {
            debug!(code = %previous.registry_code, "Registry code repeated, keeping later line");
            self.stats.replaced += 1;
        }
    }

    /// Find an operator by Registro ANS
    pub fn lookup(&self, registry_code: &str) -> Option<&ReferenceEntity> {
        self.entities.get(registry_code)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn stats(&self) -> &RegistryStats {
        &self.stats
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "Relatorio do Cadastro de Operadoras\nGerado em 01/10/2025\n\
Registro_ANS;CNPJ;Razao_Social;Nome_Fantasia;Modalidade;Logradouro;Numero;Complemento;Bairro;Cidade;UF\n";

    fn full_row(code: &str, cnpj: &str, name: &str, modalidade: &str, uf: &str) -> String {
        format!(
            "\"{}\";\"{}\";\"{}\";\"\";\"{}\";\"RUA X\";\"1\";\"\";\"CENTRO\";\"CIDADE\";\"{}\"\n",
            code, cnpj, name, modalidade, uf
        )
    }

    #[test]
    fn test_load_skips_header_and_strips_quotes() {
        let text = format!(
            "{}{}",
            HEADER,
            full_row("33000167", "33000167000101", "ACME SAUDE", "Cooperativa", "SP")
        );
        let table = ReferenceTable::from_text(&text, DEFAULT_HEADER_LINES);

        assert_eq!(table.len(), 1);
        let entity = table.lookup("33000167").expect("entity should be loaded");
        assert_eq!(entity.tax_id, "33000167000101");
        assert_eq!(entity.legal_name, "ACME SAUDE");
        assert_eq!(entity.category, "Cooperativa");
        assert_eq!(entity.region, "SP");
        assert!(table.lookup("Registro_ANS").is_none(), "Header line must not be loaded");
    }

    #[test]
    fn test_short_rows_get_defaults() {
        let text = format!("{}123456;11222333000181;SHORT ROW;X\n", HEADER);
        let table = ReferenceTable::from_text(&text, DEFAULT_HEADER_LINES);

        let entity = table.lookup("123456").unwrap();
        assert_eq!(entity.legal_name, "SHORT ROW");
        assert_eq!(entity.category, DEFAULT_CATEGORY);
        assert_eq!(entity.region, DEFAULT_REGION);
    }

    #[test]
    fn test_row_with_category_but_no_region() {
        let text = format!("{}123456;11222333000181;NAME;FANTASIA;Autogestão;RUA\n", HEADER);
        let table = ReferenceTable::from_text(&text, DEFAULT_HEADER_LINES);

        let entity = table.lookup("123456").unwrap();
        assert_eq!(entity.category, "Autogestão");
        assert_eq!(entity.region, DEFAULT_REGION);
    }

    #[test]
    fn test_empty_trailing_columns_get_defaults() {
        let text = "h\nh\nh\n42;11222333000181;NAME;X;Coop;;;;;;\n43;11444777000161;OTHER;X;;;;;;;\n";
        let table = ReferenceTable::from_text(text, DEFAULT_HEADER_LINES);

        let coop = table.lookup("42").unwrap();
        assert_eq!(coop.category, "Coop");
        assert_eq!(coop.region, DEFAULT_REGION, "Empty trailing UF means no UF");

        let other = table.lookup("43").unwrap();
        assert_eq!(other.category, DEFAULT_CATEGORY);
        assert_eq!(other.region, DEFAULT_REGION);
    }

    #[test]
    fn test_empty_inner_column_is_kept() {
        // UF present, Modalidade empty but followed by data: not a short row
        let text = format!("{}44;11222333000181;NAME;X;;R;1;;B;C;RJ\n", HEADER);
        let table = ReferenceTable::from_text(&text, DEFAULT_HEADER_LINES);

        let entity = table.lookup("44").unwrap();
        assert_eq!(entity.category, "");
        assert_eq!(entity.region, "RJ");
    }

    #[test]
    fn test_truncated_rows_counted_as_malformed() {
        let text = format!("{}42;;\n43;11222333000181\n44;;NAME\n", HEADER);
        let table = ReferenceTable::from_text(&text, DEFAULT_HEADER_LINES);

        assert_eq!(table.stats().malformed, 2);
        assert!(table.lookup("42").is_none());
        assert!(table.lookup("43").is_none());

        // Empty CNPJ column still makes an entity; the checksum rejects it later
        assert_eq!(table.lookup("44").unwrap().tax_id, "");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_blank_codes_skipped() {
        let text = format!("{}\"  \";11222333000181;NO CODE\n;;\n", HEADER);
        let table = ReferenceTable::from_text(&text, DEFAULT_HEADER_LINES);

        assert!(table.is_empty());
        assert_eq!(table.stats().blank_codes, 2);
    }

    #[test]
    fn test_duplicate_code_last_wins() {
        let text = format!(
            "{}{}{}",
            HEADER,
            full_row("999", "11222333000181", "FIRST NAME", "Medicina de Grupo", "RJ"),
            full_row("999", "11444777000161", "SECOND NAME", "Seguradora", "MG"),
        );
        let table = ReferenceTable::from_text(&text, DEFAULT_HEADER_LINES);

        assert_eq!(table.len(), 1);
        assert_eq!(table.stats().replaced, 1);
        let entity = table.lookup("999").unwrap();
        assert_eq!(entity.legal_name, "SECOND NAME", "Later line must replace earlier");
        assert_eq!(entity.region, "MG");
    }

    #[test]
    fn test_fewer_lines_than_header() {
        let table = ReferenceTable::from_text("only one line\n", DEFAULT_HEADER_LINES);
        assert!(table.is_empty());
        assert_eq!(table.stats().lines_read, 0);
    }

    #[test]
    fn test_load_latin1_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(HEADER.as_bytes()).unwrap();
        // "SAÚDE" and "SÃO" encoded as ISO-8859-1
        file.write_all(b"42;11222333000181;SA\xdaDE S\xc3O PAULO;X;Cooperativa;;;;;;SP\n")
            .unwrap();

        let table = ReferenceTable::load(file.path(), DEFAULT_HEADER_LINES).unwrap();
        assert_eq!(table.lookup("42").unwrap().legal_name, "SAÚDE SÃO PAULO");
    }

    #[test]
    fn test_load_missing_file_is_fatal() {
        let result = ReferenceTable::load("/definitely/not/here/Relatorio_Cadop.csv", 3);
        assert!(matches!(
            result,
            Err(PipelineError::ReferenceUnreadable { .. })
        ));
    }
}
