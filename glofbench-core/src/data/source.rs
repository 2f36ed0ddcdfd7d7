//! Data source abstraction for loading delimited datasets.

use crate::error::BenchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Cell spellings treated as missing values.
const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// A table of raw records, one `String` per cell.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecordTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RecordTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Position of a column by exact, case-sensitive header match.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn require_column(&self, name: &str) -> Result<usize, BenchError> {
        self.column_index(name)
            .ok_or_else(|| BenchError::dataset(format!("missing required column '{name}'")))
    }

    /// Return a new table without the rows that are missing a value in any of `columns`.
    pub fn drop_incomplete(&self, columns: &[&str]) -> Result<RecordTable, BenchError> {
        let indices = columns
            .iter()
            .map(|c| self.require_column(c))
            .collect::<Result<Vec<_>, _>>()?;

        let rows: Vec<Vec<String>> = self
            .rows
            .iter()
            .filter(|row| {
                indices
                    .iter()
                    .all(|&i| row.get(i).is_some_and(|cell| !is_missing(cell)))
            })
            .cloned()
            .collect();

        let dropped = self.rows.len() - rows.len();
        if dropped > 0 {
            tracing::info!(dropped, remaining = rows.len(), "Dropped incomplete rows");
        }

        Ok(RecordTable {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Parse a column as `f64`. Missing cells become `None`; any other non-numeric cell is an error.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>, BenchError> {
        let idx = self.require_column(name)?;
        self.rows
            .iter()
            .enumerate()
            .map(|(row_idx, row)| {
                let cell = row.get(idx).map(String::as_str).unwrap_or_default();
                if is_missing(cell) {
                    return Ok(None);
                }
                cell.parse::<f64>().map(Some).map_err(|_| {
                    BenchError::dataset(format!(
                        "row {}: column '{name}' is not numeric: '{cell}'",
                        row_idx + 1
                    ))
                })
            })
            .collect()
    }
}

fn is_missing(cell: &str) -> bool {
    MISSING_MARKERS.contains(&cell.trim())
}

/// Trait for loading a record table from a source.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Load every record from this source.
    async fn load(&self) -> Result<RecordTable, BenchError>;

    /// Human-readable location for diagnostics.
    fn location(&self) -> String;
}

// ---------------------------------------------------------------------------
// CsvSource
// ---------------------------------------------------------------------------

/// Delimited text file data source.
pub struct CsvSource {
    pub path: PathBuf,
    pub delimiter: char,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>, delimiter: char) -> Self {
        Self {
            path: path.into(),
            delimiter,
        }
    }
}

#[async_trait]
impl DataSource for CsvSource {
    async fn load(&self) -> Result<RecordTable, BenchError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            BenchError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {e}", self.path.display()),
            ))
        })?;
        let table = parse_delimited(&content, self.delimiter)?;
        tracing::info!(
            path = %self.path.display(),
            rows = table.row_count(),
            columns = table.column_count(),
            "Loaded dataset"
        );
        Ok(table)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Parse delimited text with a header line into a [`RecordTable`].
pub fn parse_delimited(content: &str, delimiter: char) -> Result<RecordTable, BenchError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content.lines().enumerate();

    // Parse header
    let (_, header) = lines
        .by_ref()
        .find(|(_, l)| !l.trim().is_empty())
        .ok_or_else(|| BenchError::dataset("Empty CSV file"))?;
    // header names are matched exactly, so they keep their whitespace
    let columns = split_record(header, delimiter, false)?;

    let mut rows = Vec::new();
    for (line_no, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let row = split_record(line, delimiter, true)?;
        if row.len() != columns.len() {
            return Err(BenchError::dataset(format!(
                "line {}: expected {} fields, found {}",
                line_no + 1,
                columns.len(),
                row.len()
            )));
        }
        rows.push(row);
    }

    Ok(RecordTable { columns, rows })
}

/// Split one record, honouring double-quoted fields with `""` escapes.
///
/// With `trim` set, surrounding whitespace is removed from every field.
fn split_record(line: &str, delimiter: char, trim: bool) -> Result<Vec<String>, BenchError> {
    let finish = |field: &str| {
        if trim {
            field.trim().to_string()
        } else {
            field.to_string()
        }
    };
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            c if c == delimiter && !in_quotes => {
                fields.push(finish(&field));
                field.clear();
            }
            c => field.push(c),
        }
    }
    if in_quotes {
        return Err(BenchError::dataset(format!(
            "unterminated quoted field in record: {line}"
        )));
    }
    fields.push(finish(&field));
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
Lake_Area_km2,Mean_Elevation_m,Mean_Slope_deg,Flood_Occurrence,Name
0.12,5100,12.5,0.0,\"Lake, North\"
0.40,,18.0,0.2,South
0.05,4800,9.1,NA,East
";

    #[test]
    fn test_parse_header_and_rows() {
        let table = parse_delimited(SAMPLE, ',').unwrap();
        assert_eq!(table.column_count(), 5);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.rows[0][4], "Lake, North");
    }

    #[test]
    fn test_escaped_quotes() {
        let fields = split_record("a,\"say \"\"hi\"\"\",c", ',', true).unwrap();
        assert_eq!(fields, vec!["a", "say \"hi\"", "c"]);
    }

    #[test]
    fn test_unterminated_quote_fails() {
        assert!(split_record("a,\"oops", ',', true).is_err());
    }

    #[test]
    fn test_ragged_row_fails() {
        let err = parse_delimited("a,b\n1,2,3\n", ',').unwrap_err();
        assert!(matches!(err, BenchError::Dataset(_)));
    }

    #[test]
    fn test_empty_file_fails() {
        assert!(parse_delimited("\n\n", ',').is_err());
    }

    #[test]
    fn test_drop_incomplete() {
        let table = parse_delimited(SAMPLE, ',').unwrap();
        let cleaned = table
            .drop_incomplete(&["Lake_Area_km2", "Mean_Elevation_m", "Flood_Occurrence"])
            .unwrap();
        assert_eq!(cleaned.row_count(), 1);
        assert_eq!(cleaned.rows[0][0], "0.12");
    }

    #[test]
    fn test_drop_incomplete_unknown_column() {
        let table = parse_delimited(SAMPLE, ',').unwrap();
        let err = table.drop_incomplete(&["lake_area_km2"]).unwrap_err();
        assert!(err.to_string().contains("lake_area_km2"));
    }

    #[test]
    fn test_numeric_column() {
        let table = parse_delimited(SAMPLE, ',').unwrap();
        let elevation = table.numeric_column("Mean_Elevation_m").unwrap();
        assert_eq!(elevation, vec![Some(5100.0), None, Some(4800.0)]);
        assert!(table.numeric_column("Name").is_err());
    }

    #[test]
    fn test_header_names_are_not_trimmed() {
        let table = parse_delimited(" Lake_Area_km2,Flood_Occurrence\n 0.5 , 0.1\n", ',').unwrap();
        assert_eq!(table.columns, vec![" Lake_Area_km2", "Flood_Occurrence"]);
        assert_eq!(table.column_index("Lake_Area_km2"), None);
        assert_eq!(table.rows[0], vec!["0.5", "0.1"]);
    }

    #[test]
    fn test_semicolon_delimiter() {
        let table = parse_delimited("a;b\n1;2\n", ';').unwrap();
        assert_eq!(table.columns, vec!["a", "b"]);
        assert_eq!(table.rows, vec![vec!["1".to_string(), "2".to_string()]]);
    }

    #[tokio::test]
    async fn test_csv_source_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("lakes.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let source = CsvSource::new(&path, ',');
        let table = source.load().await.unwrap();
        assert_eq!(table.row_count(), 3);
        assert!(source.location().ends_with("lakes.csv"));
    }

    #[test]
    fn test_csv_source_missing_file() {
        let source = CsvSource::new("/definitely/not/here.csv", ',');
        let err = tokio_test::block_on(source.load()).unwrap_err();
        assert!(matches!(err, BenchError::Io(_)));
        assert!(err.to_string().contains("here.csv"));
    }
}
