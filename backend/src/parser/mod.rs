//! Tabular parser for comma-delimited reference files.
//!
//! Turns raw text into rows of string fields with a single left-to-right scan.
//! Handles quoted fields, doubled-quote escapes and mixed `\n` / `\r` / `\r\n`
//! line endings. It never fails: an unterminated quote is closed implicitly at
//! end of input, so callers must validate field counts themselves.
//!
//! Byte input goes through [`parse_bytes_auto`], which detects the encoding
//! first (reference exports are often Windows-1252 or Latin-1).

use std::path::Path;

use crate::error::ParseError;

/// One delimited-text record: its fields in column order.
pub type ReferenceRow = Vec<String>;

/// Result of parsing raw bytes, with the encoding that was used
#[derive(Debug, Clone)]
pub struct ParsedFile {
    /// All rows, header included
    pub rows: Vec<ReferenceRow>,
    /// Detected encoding
    pub encoding: String,
}

impl ParsedFile {
    /// Header row, if the file had any rows at all
    pub fn header(&self) -> Option<&ReferenceRow> {
        self.rows.first()
    }

    /// Number of rows after the header
    pub fn data_row_count(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }
}

/// Parse comma-delimited text into rows.
///
/// The header row is returned like any other row; skip it by index.
///
/// # Example
/// ```
/// use estate_seed::parser::parse;
///
/// let rows = parse("code,name\n01,\"Ha Noi, Capital\"\r\n");
/// assert_eq!(rows.len(), 2);
/// assert_eq!(rows[1], vec!["01", "Ha Noi, Capital"]);
/// ```
pub fn parse(text: &str) -> Vec<ReferenceRow> {
    let mut rows = Vec::new();
    let mut row: ReferenceRow = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            // Escape check comes before the toggle.
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => row.push(std::mem::take(&mut field)),
            '\r' | '\n' if !in_quotes => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                if !field.is_empty() || !row.is_empty() {
                    row.push(std::mem::take(&mut field));
                    rows.push(std::mem::take(&mut row));
                }
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "utf-8-sig" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        "windows-1258" | "cp1258" => "windows-1258".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> Result<String, ParseError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes);

    let text = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8_lossy(bytes).into_owned(),
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        "windows-1258" | "cp1258" => encoding_rs::WINDOWS_1258.decode(bytes).0.into_owned(),
        other => {
            let codec = encoding_rs::Encoding::for_label(other.as_bytes())
                .ok_or_else(|| ParseError::Encoding(format!("unsupported encoding '{}'", other)))?;
            codec.decode(bytes).0.into_owned()
        }
    };

    Ok(text)
}

/// Parse bytes with encoding auto-detection.
pub fn parse_bytes_auto(bytes: &[u8]) -> Result<ParsedFile, ParseError> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;

    Ok(ParsedFile {
        rows: parse(&content),
        encoding,
    })
}

/// Parse a file from disk with encoding auto-detection.
pub fn parse_file_auto<P: AsRef<Path>>(path: P) -> Result<ParsedFile, ParseError> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rfc_encode<S: AsRef<[u8]>>(rows: &[Vec<S>]) -> String {
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(vec![]);
        for row in rows {
            writer.write_record(row).unwrap();
        }
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    /// Rows of fields mixing commas, quotes, CR/LF and spaces. A row made of a
    /// single empty field encodes as a blank line, which is not emitted, so
    /// it is left out.
    fn arb_rows() -> impl Strategy<Value = Vec<Vec<String>>> {
        let field = r#"[a-z,"\r\n ]{0,8}"#;
        let row = prop::collection::vec(field, 1..5)
            .prop_filter("single empty field", |row| !(row.len() == 1 && row[0].is_empty()));
        prop::collection::vec(row, 1..6)
    }

    proptest! {
        #[test]
        fn rfc_encoded_rows_parse_back_unchanged(rows in arb_rows()) {
            let parsed = parse(&rfc_encode(&rows));
            prop_assert_eq!(parsed, rows);
        }
    }

    #[test]
    fn test_simple_rows() {
        let rows = parse("code,name\n01,Ha Noi\n79,Ho Chi Minh");

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["code", "name"]);
        assert_eq!(rows[2], vec!["79", "Ho Chi Minh"]);
    }

    #[test]
    fn test_quoted_comma_and_escaped_quote() {
        let rows = parse("a,\"b, c\",\"say \"\"hi\"\"\"\n");

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], vec!["a", "b, c", "say \"hi\""]);
    }

    #[test]
    fn test_newline_inside_quotes_is_kept() {
        let rows = parse("id,note\n1,\"line one\r\nline two\"\n");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1], "line one\r\nline two");
    }

    #[test]
    fn test_crlf_is_one_terminator() {
        let rows = parse("a,b\r\n1,2\r\n3,4\r\n");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], vec!["3", "4"]);
    }

    #[test]
    fn test_lone_cr_and_mixed_endings() {
        let rows = parse("a,b\r1,2\n3,4\r\n5,6");
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3], vec!["5", "6"]);
    }

    #[test]
    fn test_trailing_and_blank_lines_do_not_emit_rows() {
        let rows = parse("a,b\n\n1,2\n\n\n");
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_empty_fields_preserved() {
        let rows = parse("a,,c\n,,\n");

        assert_eq!(rows[0], vec!["a", "", "c"]);
        assert_eq!(rows[1], vec!["", "", ""]);
    }

    #[test]
    fn test_unterminated_quote_closes_at_end() {
        let rows = parse("a,\"unfinished, field\nmore");

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], vec!["a", "unfinished, field\nmore"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse("").is_empty());
        assert!(parse("\r\n\n").is_empty());
    }

    #[test]
    fn test_round_trip_through_rfc_encoding() {
        let rows = vec![
            vec!["code", "name", "note"],
            vec!["01", "Thành phố Hà Nội", "capital, north"],
            vec!["79", "quote \" inside", "multi\nline"],
            vec!["92", "\"\"", "cr\r\nlf"],
            vec!["", "leading empty", ""],
        ];

        let parsed = parse(&rfc_encode(&rows));

        assert_eq!(parsed.len(), rows.len());
        for (got, want) in parsed.iter().zip(&rows) {
            assert_eq!(got, want);
        }
    }

    #[test]
    fn test_parse_bytes_auto_strips_bom() {
        let mut bytes = b"\xEF\xBB\xBF".to_vec();
        bytes.extend_from_slice(b"code,name\n01,A\n");

        let parsed = parse_bytes_auto(&bytes).unwrap();

        assert_eq!(parsed.header().unwrap()[0], "code");
        assert_eq!(parsed.data_row_count(), 1);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_parse_file_auto() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wards.csv");
        std::fs::write(&path, "ward,district\n00001,001\n").unwrap();

        let parsed = parse_file_auto(&path).unwrap();
        assert_eq!(parsed.rows, vec![vec!["ward", "district"], vec!["00001", "001"]]);
    }
}
