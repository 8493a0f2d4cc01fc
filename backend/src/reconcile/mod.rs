//! Reconciliation check between an external reference file and the store.
//!
//! Extracts the parent-code column from every data row, dedupes it, and
//! intersects it with the canonical codes already persisted. Mismatches are
//! data, not errors: they show up in `unmatchedCodes` for a human to inspect
//! before a real import is attempted. Nothing is written to the store.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::api::logs::{log_info, log_success, log_warning};
use crate::error::{ReconcileError, ReconcileResult};
use crate::parser::{parse_bytes_auto, ReferenceRow};
use crate::store::Store;

/// Options for a store-backed reconciliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReconcileOptions {
    /// Zero-based index of the parent-code column in the file
    pub column: usize,
    /// Table holding the canonical records
    pub canonical_table: String,
    /// Column of the canonical table holding the code
    pub canonical_column: String,
    /// Number of data rows echoed back for inspection
    pub sample_size: usize,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            column: 0,
            canonical_table: "provinces".to_string(),
            canonical_column: "code".to_string(),
            sample_size: 5,
        }
    }
}

/// Diagnostic report; every code list is sorted
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub total_data_rows: usize,
    pub unique_parent_codes: Vec<String>,
    pub canonical_codes: Vec<String>,
    pub matching_codes: Vec<String>,
    pub unmatched_codes: Vec<String>,
    pub sample_rows: Vec<Value>,
}

impl ReconciliationReport {
    /// Every extracted parent code exists in the store
    pub fn is_fully_matched(&self) -> bool {
        self.unmatched_codes.is_empty()
    }
}

/// Row as a JSON object keyed by header names (`column_N` past the header's
/// width). A repeated header name gets its column index as a suffix.
fn row_object(header: &[String], row: &[String]) -> Value {
    let mut object = Map::new();
    for (i, field) in row.iter().enumerate() {
        let mut key = header
            .get(i)
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| format!("column_{}", i));
        while object.contains_key(&key) {
            key = format!("{}_{}", key, i);
        }
        object.insert(key, Value::String(field.clone()));
    }
    Value::Object(object)
}

/// Cross-reference the codes in `column` against `canonical_codes`.
///
/// Row 0 is the header and is skipped. Values are trimmed; empty values are
/// ignored. Pure: the same input always yields the same report.
pub fn reconcile<I, S>(
    rows: &[ReferenceRow],
    column: usize,
    canonical_codes: I,
    sample_size: usize,
) -> ReconciliationReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let (header, data) = match rows.split_first() {
        Some((header, data)) => (header.as_slice(), data),
        None => (&[][..], &[][..]),
    };

    let parent_codes: BTreeSet<String> = data
        .iter()
        .filter_map(|row| row.get(column))
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect();

    let canonical: BTreeSet<String> = canonical_codes
        .into_iter()
        .map(|c| c.as_ref().trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    ReconciliationReport {
        total_data_rows: data.len(),
        matching_codes: parent_codes.intersection(&canonical).cloned().collect(),
        unmatched_codes: parent_codes.difference(&canonical).cloned().collect(),
        unique_parent_codes: parent_codes.into_iter().collect(),
        canonical_codes: canonical.into_iter().collect(),
        sample_rows: data
            .iter()
            .take(sample_size)
            .map(|row| row_object(header, row))
            .collect(),
    }
}

/// Decode and parse a reference file, then reconcile it against the store.
pub async fn reconcile_with_store(
    store: &dyn Store,
    bytes: &[u8],
    options: &ReconcileOptions,
) -> ReconcileResult<ReconciliationReport> {
    let parsed = parse_bytes_auto(bytes)?;
    let header = parsed.header().ok_or(ReconcileError::EmptyInput)?;
    if options.column >= header.len() {
        return Err(ReconcileError::ColumnOutOfRange {
            column: options.column,
            width: header.len(),
        });
    }
    log_info(format!(
        "📄 Reference file: {} data rows ({}), column [{}] '{}'",
        parsed.data_row_count(),
        parsed.encoding,
        options.column,
        header[options.column].trim()
    ));

    let canonical_column = options.canonical_column.as_str();
    let canonical_rows = store
        .select_all(&options.canonical_table, &[canonical_column], None)
        .await?;
    let canonical = canonical_rows.iter().filter_map(|row| match row.get(canonical_column)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });

    let report = reconcile(&parsed.rows, options.column, canonical, options.sample_size);
    if report.is_fully_matched() {
        log_success(format!(
            "All {} parent codes match {}",
            report.unique_parent_codes.len(),
            options.canonical_table
        ));
    } else {
        log_warning(format!(
            "{}/{} parent codes matched; unmatched: {}",
            report.matching_codes.len(),
            report.unique_parent_codes.len(),
            report
                .unmatched_codes
                .iter()
                .take(10)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::store::{MemoryStore, Record};
    use proptest::prelude::*;
    use serde_json::json;

    const WARDS: &str = "ward_code,ward_name,province_code\n\
        00001,Phuc Xa,01\n\
        00004,Truc Bach, 01 \n\
        26734,Ben Nghe,79\n\
        99999,Unknown,99\n\
        00007,No province,\n";

    #[test]
    fn test_matching_is_the_intersection() {
        let rows = parse("code,province\n1,11\n2,99\n3,11\n");
        let report = reconcile(&rows, 1, ["11", "12"], 5);

        assert_eq!(report.unique_parent_codes, vec!["11", "99"]);
        assert_eq!(report.canonical_codes, vec!["11", "12"]);
        assert_eq!(report.matching_codes, vec!["11"]);
        assert_eq!(report.unmatched_codes, vec!["99"]);
        assert!(!report.is_fully_matched());
    }

    #[test]
    fn test_header_skipped_values_trimmed_and_empties_dropped() {
        let rows = parse(WARDS);
        let report = reconcile(&rows, 2, Vec::<String>::new(), 0);

        assert_eq!(report.total_data_rows, 5);
        assert_eq!(report.unique_parent_codes, vec!["01", "79", "99"]);
        assert!(report.matching_codes.is_empty());
        assert!(report.sample_rows.is_empty());
    }

    #[test]
    fn test_sample_rows_keyed_by_header() {
        let rows = parse("code,name\n01,Ha Noi,extra\n79,Ho Chi Minh\n");
        let report = reconcile(&rows, 0, ["01"], 1);

        assert_eq!(report.sample_rows.len(), 1);
        assert_eq!(report.sample_rows[0], json!({ "code": "01", "name": "Ha Noi", "column_2": "extra" }));
    }

    #[test]
    fn test_repeated_header_names_keep_every_column() {
        let rows = parse("code,name,name\n01,Ha Noi,Hanoi\n");
        let report = reconcile(&rows, 0, ["01"], 1);

        assert_eq!(
            report.sample_rows[0],
            json!({ "code": "01", "name": "Ha Noi", "name_2": "Hanoi" })
        );
    }

    #[test]
    fn test_short_rows_and_empty_input() {
        let rows = parse("a,b,c\n1\n2,3,4\n");
        assert_eq!(reconcile(&rows, 2, ["4"], 5).matching_codes, vec!["4"]);

        let empty = reconcile(&[], 0, ["01"], 5);
        assert_eq!(empty.total_data_rows, 0);
        assert!(empty.unique_parent_codes.is_empty());
    }

    #[test]
    fn test_reconcile_is_repeatable() {
        let rows = parse(WARDS);
        let first = reconcile(&rows, 2, ["01", "79"], 3);
        let second = reconcile(&rows, 2, ["79", "01"], 3);
        assert_eq!(first, second);
    }

    fn single_column_rows(codes: &[String]) -> Vec<ReferenceRow> {
        std::iter::once(vec!["province_code".to_string()])
            .chain(codes.iter().map(|c| vec![c.clone()]))
            .collect()
    }

    proptest! {
        #[test]
        fn matching_codes_are_the_intersection(
            codes in prop::collection::vec(" ?[0-9]{1,2} ?", 0..20),
            canonical in prop::collection::vec("[0-9]{1,2}", 0..20),
        ) {
            let report = reconcile(&single_column_rows(&codes), 0, &canonical, 3);

            let unique: BTreeSet<String> = codes.iter().map(|c| c.trim().to_string()).collect();
            let canonical: BTreeSet<String> = canonical.into_iter().collect();
            let matching: BTreeSet<String> = report.matching_codes.iter().cloned().collect();
            let unmatched: BTreeSet<String> = report.unmatched_codes.iter().cloned().collect();

            prop_assert_eq!(report.total_data_rows, codes.len());
            prop_assert_eq!(report.unique_parent_codes.iter().cloned().collect::<BTreeSet<_>>(), unique.clone());
            prop_assert!(matching.is_disjoint(&unmatched));
            prop_assert_eq!(matching.union(&unmatched).cloned().collect::<BTreeSet<_>>(), unique.clone());
            prop_assert!(matching.is_subset(&canonical));
            prop_assert_eq!(matching, unique.intersection(&canonical).cloned().collect::<BTreeSet<_>>());
        }
    }

    fn province(code: Value) -> Record {
        json!({ "code": code, "name": "p" }).as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_reconcile_with_store_reads_canonical_codes() {
        let store = MemoryStore::new();
        store
            .insert_raw("provinces", vec![province(json!("01")), province(json!("79")), province(json!("48"))])
            .await;
        let options = ReconcileOptions {
            column: 2,
            ..ReconcileOptions::default()
        };

        let report = reconcile_with_store(&store, WARDS.as_bytes(), &options).await.unwrap();

        assert_eq!(report.canonical_codes, vec!["01", "48", "79"]);
        assert_eq!(report.matching_codes, vec!["01", "79"]);
        assert_eq!(report.unmatched_codes, vec!["99"]);
        assert_eq!(report.sample_rows.len(), 5);
        // Read-only.
        assert_eq!(store.count("provinces", None).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_reconcile_with_store_rejects_bad_column() {
        let store = MemoryStore::new();
        let options = ReconcileOptions {
            column: 7,
            ..ReconcileOptions::default()
        };

        let err = reconcile_with_store(&store, WARDS.as_bytes(), &options).await.unwrap_err();
        assert!(matches!(err, ReconcileError::ColumnOutOfRange { column: 7, width: 3 }));

        let err = reconcile_with_store(&store, b"", &ReconcileOptions::default()).await.unwrap_err();
        assert!(matches!(err, ReconcileError::EmptyInput));
    }
}
