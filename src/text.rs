// 🔤 Text helpers - decoding agency files and cleaning positional fields
//
// ANS publishes its CSVs in Windows-1252 most of the time, but consolidated
// files produced by this tool are UTF-8. Both end up as the same `String`.

use std::borrow::Cow;

use encoding_rs::WINDOWS_1252;

/// Field separator used by every agency file
pub const DELIMITER: u8 = b';';

/// Decode raw file bytes: UTF-8 when valid (BOM dropped), Latin-1 otherwise
pub fn decode(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text.strip_prefix('\u{feff}').unwrap_or(text)),
        Err(_) => {
            // Windows-1252 is a superset of the printable ISO-8859-1 range
            let (text, _had_errors) = WINDOWS_1252.decode_without_bom_handling(bytes);
            text
        }
    }
}

/// Strip quote decoration and surrounding whitespace from a field
pub fn clean_field(raw: &str) -> String {
    raw.replace('"', "").trim().to_string()
}

/// Split one positional line on `;`.
///
/// Trailing empty fields are dropped, so `42;cnpj;NAME;;;` has 3 fields and
/// a blank line has none. Positional defaults rely on this. Quotes are kept
/// and stripped per field by `clean_field`.
pub fn split_fields(line: &str) -> Vec<&str> {
    let mut fields: Vec<&str> = line.split(DELIMITER as char).collect();
    while fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }
    fields
}

/// Return the text that follows the first `lines` lines
pub fn skip_lines(text: &str, lines: usize) -> &str {
    let mut rest = text;
    for _ in 0..lines {
        match rest.find('\n') {
            Some(pos) => rest = &rest[pos + 1..],
            None => return "",
        }
    }
    rest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8_passthrough() {
        let text = decode("SÃO PAULO".as_bytes());
        assert_eq!(text, "SÃO PAULO");
    }

    #[test]
    fn test_decode_strips_bom() {
        let bytes = b"\xef\xbb\xbfREG_ANS;CD";
        assert_eq!(decode(bytes), "REG_ANS;CD");
    }

    #[test]
    fn test_decode_latin1_fallback() {
        // "SAÚDE" in ISO-8859-1
        let bytes = b"SA\xdaDE";
        assert_eq!(decode(bytes), "SAÚDE");
    }

    #[test]
    fn test_clean_field() {
        assert_eq!(clean_field("  \"33000167\" "), "33000167");
        assert_eq!(clean_field("\"\""), "");
    }

    #[test]
    fn test_skip_lines() {
        let text = "meta 1\nmeta 2\r\nmeta 3\nrow;1\nrow;2\n";
        assert_eq!(skip_lines(text, 3), "row;1\nrow;2\n");
        assert_eq!(skip_lines(text, 0), text);
        assert_eq!(skip_lines("only\n", 3), "");
    }

    #[test]
    fn test_split_fields_drops_trailing_empties() {
        assert_eq!(
            split_fields("42;11222333000181;NAME;X;Coop;;;;;;"),
            vec!["42", "11222333000181", "NAME", "X", "Coop"]
        );
        assert_eq!(split_fields("a;;b;"), vec!["a", "", "b"]);
        assert_eq!(split_fields("a;\"b"), vec!["a", "\"b"]);
    }

    #[test]
    fn test_split_fields_blank_line() {
        assert!(split_fields("").is_empty());
        assert!(split_fields(";;;").is_empty());
        assert_eq!(split_fields(" "), vec![" "], "Whitespace is not an empty field");
    }
}
