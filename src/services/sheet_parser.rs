//! Parsing of exported sheets into columns and rows.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::models::job::SampleRow;

pub const SAMPLE_ROWS: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("exported file is empty")]
    Empty,

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// A sheet with a header row; every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSheet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ParsedSheet {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// The first `limit` rows as column-name -> value mappings.
    pub fn sample(&self, limit: usize) -> Vec<SampleRow> {
        self.rows
            .iter()
            .take(limit)
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned().map(Value::String))
                    .collect()
            })
            .collect()
    }
}

/// Parse CSV bytes, treating the first record as the header.
pub fn parse_csv(bytes: &[u8]) -> Result<ParsedSheet, ParseError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut records = reader.records();
    let header = match records.next() {
        Some(record) => record?,
        None => return Err(ParseError::Empty),
    };

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    let width = rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0);

    let mut raw_columns: Vec<String> = header.iter().map(|h| h.trim().to_string()).collect();
    raw_columns.resize(width, String::new());
    let columns = name_columns(raw_columns);

    for row in &mut rows {
        row.resize(width, String::new());
    }

    Ok(ParsedSheet { columns, rows })
}

// Blank headers become "Unnamed: i"; repeats get the lowest free ".n" suffix.
fn name_columns(raw: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut next_suffix: HashMap<String, usize> = HashMap::new();
    raw.into_iter()
        .enumerate()
        .map(|(index, name)| {
            let base = if name.is_empty() {
                format!("Unnamed: {index}")
            } else {
                name
            };
            let mut unique = base.clone();
            if taken.contains(&unique) {
                let suffix = next_suffix.entry(base.clone()).or_insert(1);
                loop {
                    unique = format!("{base}.{suffix}");
                    *suffix += 1;
                    if !taken.contains(&unique) {
                        break;
                    }
                }
            }
            taken.insert(unique.clone());
            unique
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_rows() {
        let sheet = parse_csv(b"Name,Amount\nA,10\nB,20\n").unwrap();
        assert_eq!(sheet.columns, vec!["Name", "Amount"]);
        assert_eq!(sheet.row_count(), 2);

        let sample = sheet.sample(SAMPLE_ROWS);
        assert_eq!(sample.len(), 2);
        assert_eq!(sample[0]["Name"], "A");
        assert_eq!(sample[1]["Amount"], "20");
    }

    #[test]
    fn test_sample_is_capped() {
        let mut csv = String::from("n\n");
        for i in 0..12 {
            csv.push_str(&format!("{i}\n"));
        }
        let sheet = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(sheet.row_count(), 12);
        assert_eq!(sheet.sample(SAMPLE_ROWS).len(), 5);
        assert_eq!(sheet.sample(SAMPLE_ROWS)[4]["n"], "4");
    }

    #[test]
    fn test_ragged_rows_and_blank_headers() {
        let sheet = parse_csv("\u{feff}Name,,Name\nA,1\nB,2,3,4\n,,\n".as_bytes()).unwrap();
        assert_eq!(sheet.columns, vec!["Name", "Unnamed: 1", "Name.1", "Unnamed: 3"]);
        assert_eq!(sheet.row_count(), 2);
        assert_eq!(sheet.rows[0], vec!["A", "1", "", ""]);
    }

    #[test]
    fn test_repeat_does_not_reuse_existing_header() {
        let sheet = parse_csv(b"Name,Name.1,Name\nA,B,C\n").unwrap();
        assert_eq!(sheet.columns, vec!["Name", "Name.1", "Name.2"]);

        let sample = sheet.sample(SAMPLE_ROWS);
        assert_eq!(sample[0].len(), 3);
        assert_eq!(sample[0]["Name.2"], "C");

        let sheet = parse_csv(b"Name,Name,Name.1\nA,B,C\n").unwrap();
        assert_eq!(sheet.columns, vec!["Name", "Name.1", "Name.1.1"]);
    }

    #[test]
    fn test_sample_keeps_column_order() {
        let sheet = parse_csv(b"Zeta,Alpha,Mid\n1,2,3\n").unwrap();
        let sample = sheet.sample(SAMPLE_ROWS);
        assert_eq!(
            serde_json::to_string(&sample[0]).unwrap(),
            r#"{"Zeta":"1","Alpha":"2","Mid":"3"}"#
        );
    }

    #[test]
    fn test_quoted_cells() {
        let sheet = parse_csv(b"Item,Note\n\"Widget, large\",\"said \"\"hi\"\"\"\n").unwrap();
        assert_eq!(sheet.rows[0], vec!["Widget, large", "said \"hi\""]);
    }

    #[test]
    fn test_empty_export() {
        assert!(matches!(parse_csv(b""), Err(ParseError::Empty)));
    }
}
