//! Table extraction from the `CSV:` section of an analysis.
//!
//! The model is asked to end its answer with a line reading `CSV:` followed by
//! comma-separated rows. This stage makes exactly one attempt to read those
//! rows: the first row is the header, shorter rows are padded, and anything
//! the reader rejects becomes a [`TableError`] which the caller turns into a
//! warning. The analysis text itself is never modified here.

use crate::error::{AnalystError, TableError};
use crate::output::{ExtractedTable, TableOutcome, TABLE_WARNING};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// Literal marker that introduces the tabular section of an analysis.
pub const CSV_MARKER: &str = "CSV:";

/// Text after the first [`CSV_MARKER`], trimmed. `None` when there is no marker.
pub fn find_csv_section(analysis: &str) -> Option<&str> {
    analysis
        .find(CSV_MARKER)
        .map(|idx| analysis[idx + CSV_MARKER.len()..].trim())
}

// Opening fence with an optional info string, body, closing fence. Anything
// after the closing fence is prose and is dropped.
static RE_LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[\w-]*[ \t]*\r?\n(.*?)\r?\n?```").unwrap());

fn strip_code_fence(section: &str) -> &str {
    match RE_LEADING_FENCE.captures(section) {
        Some(caps) => caps.get(1).map_or(section, |m| m.as_str()),
        None => section,
    }
}

/// Parse a CSV section into a table.
///
/// Blank lines are skipped and cells are trimmed. A row with more fields than
/// the header is an error; a row with fewer is padded with empty cells.
pub fn parse_table(section: &str) -> Result<ExtractedTable, TableError> {
    let body = strip_code_fence(section.trim());

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(body.as_bytes());

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| TableError::Malformed {
            detail: e.to_string(),
        })?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        records.push(record);
    }

    let mut records = records.into_iter();
    let headers: Vec<String> = match records.next() {
        Some(header) => header.iter().map(str::to_string).collect(),
        None => return Err(TableError::Empty),
    };

    let mut rows = Vec::new();
    for (idx, record) in records.enumerate() {
        if record.len() > headers.len() {
            return Err(TableError::TooManyFields {
                // 1-indexed data rows, header excluded
                row: idx + 1,
                expected: headers.len(),
                found: record.len(),
            });
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }

    Ok(ExtractedTable { headers, rows })
}

/// Decide what to show in the table slot for `analysis`.
///
/// The parser runs only when the marker is present.
pub fn extract_table(analysis: &str) -> TableOutcome {
    let Some(section) = find_csv_section(analysis) else {
        debug!("No {} marker in analysis", CSV_MARKER);
        return TableOutcome::Absent;
    };

    match parse_table(section) {
        Ok(table) => {
            debug!(
                "Parsed table: {} columns, {} rows",
                table.headers.len(),
                table.rows.len()
            );
            TableOutcome::Parsed { table }
        }
        Err(error) => {
            warn!("Table section did not parse: {}", error);
            TableOutcome::Invalid {
                error,
                warning: TABLE_WARNING.to_string(),
            }
        }
    }
}

impl ExtractedTable {
    /// Re-serialise the table as RFC 4180 CSV, header first.
    pub fn to_csv(&self) -> Result<String, AnalystError> {
        let mut writer = WriterBuilder::new().from_writer(Vec::new());
        writer
            .write_record(&self.headers)
            .map_err(|e| AnalystError::Internal(format!("csv write: {e}")))?;
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|e| AnalystError::Internal(format!("csv write: {e}")))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| AnalystError::Internal(format!("csv flush: {e}")))?;
        String::from_utf8(bytes).map_err(|e| AnalystError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_marker_means_absent() {
        assert_eq!(find_csv_section("Summary only, no table."), None);
        assert_eq!(extract_table("Summary only."), TableOutcome::Absent);
        // Lowercase is not the marker.
        assert_eq!(extract_table("csv: a,b\n1,2"), TableOutcome::Absent);
    }

    #[test]
    fn section_starts_after_first_marker() {
        let analysis = "Summary.\nCSV:\nname,qty\nbolt,4\n";
        assert_eq!(find_csv_section(analysis), Some("name,qty\nbolt,4"));

        let twice = "CSV: a,b\n1,2\nCSV: c";
        assert_eq!(find_csv_section(twice), Some("a,b\n1,2\nCSV: c"));
    }

    #[test]
    fn parses_header_and_rows() {
        let table = parse_table("Item, Price\nApple, 1.20\n\nPear, 0.90\n").unwrap();
        assert_eq!(table.headers, vec!["Item", "Price"]);
        assert_eq!(
            table.rows,
            vec![vec!["Apple", "1.20"], vec!["Pear", "0.90"]]
        );
    }

    #[test]
    fn quoted_fields_keep_commas() {
        let table = parse_table("city,note\n\"Paris\",\"big, old\"\n").unwrap();
        assert_eq!(table.rows[0], vec!["Paris", "big, old"]);
    }

    #[test]
    fn short_rows_are_padded() {
        let table = parse_table("a,b,c\n1,2\n").unwrap();
        assert_eq!(table.rows[0], vec!["1", "2", ""]);
    }

    #[test]
    fn long_rows_are_rejected() {
        let err = parse_table("a,b\n1,2\n3,4,5\n").unwrap_err();
        assert_eq!(
            err,
            TableError::TooManyFields {
                row: 2,
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn empty_section_is_rejected() {
        assert_eq!(parse_table("   \n\n").unwrap_err(), TableError::Empty);
        assert!(matches!(
            extract_table("All done.\nCSV:\n"),
            TableOutcome::Invalid { error: TableError::Empty, .. }
        ));
    }

    #[test]
    fn fenced_section_is_unwrapped() {
        let analysis = "Summary.\nCSV:\n```csv\nk,v\nx,1\n```\nThat is all.";
        let outcome = extract_table(analysis);
        let table = outcome.table().expect("table should parse");
        assert_eq!(table.headers, vec!["k", "v"]);
        assert_eq!(table.rows, vec![vec!["x", "1"]]);
    }

    #[test]
    fn prose_after_marker_yields_warning() {
        let analysis = "Summary.\nCSV: none\nKey topics: finance, risk, audit";
        let outcome = extract_table(analysis);
        assert_eq!(outcome.warning(), Some(TABLE_WARNING));
        assert!(outcome.table().is_none());
    }

    #[test]
    fn to_csv_quotes_when_needed() {
        let table = ExtractedTable {
            headers: vec!["name".into(), "note".into()],
            rows: vec![vec!["a".into(), "x, y".into()]],
        };
        assert_eq!(table.to_csv().unwrap(), "name,note\na,\"x, y\"\n");
    }
}
