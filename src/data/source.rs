use polars::prelude::*;
use std::path::Path;

use crate::error::{PipelineError, Result};

/// Raw tabular telemetry: a header plus one text cell per column and row.
///
/// This is the hand-off point between whatever produced the log and the
/// record parser. Cells keep their original text so that numeric and
/// timestamp interpretation happens in one place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Build from a header and positional rows; short rows are padded with
    /// missing cells, extra cells are ignored
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Build from rows given as (column, text) mappings. The header is the
    /// union of column names in first-seen order.
    pub fn from_pairs<R, K, V>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut headers: Vec<String> = Vec::new();
        let mut sparse: Vec<Vec<(usize, String)>> = Vec::new();

        for row in rows {
            let mut cells = Vec::new();
            for (key, value) in row {
                let key = key.into();
                let idx = match headers.iter().position(|h| *h == key) {
                    Some(idx) => idx,
                    None => {
                        headers.push(key);
                        headers.len() - 1
                    }
                };
                cells.push((idx, value.into()));
            }
            sparse.push(cells);
        }

        let width = headers.len();
        let rows = sparse
            .into_iter()
            .map(|cells| {
                let mut row = vec![None; width];
                for (idx, value) in cells {
                    row[idx] = Some(value);
                }
                row
            })
            .collect();

        Self { headers, rows }
    }

    /// Load a CSV or Parquet log. Every column is read as text.
    pub fn load(path: &Path) -> Result<Self> {
        profiling::scope!("load_raw_table");

        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| PipelineError::UnsupportedFormat {
                extension: String::new(),
            })?;

        let df = match extension.to_lowercase().as_str() {
            "parquet" => LazyFrame::scan_parquet(path, Default::default())?.collect()?,
            "csv" => LazyCsvReader::new(path)
                .with_has_header(true)
                // Zero inference rows reads every column as a string
                .with_infer_schema_length(Some(0))
                .with_truncate_ragged_lines(true)
                .finish()?
                .collect()?,
            ext => {
                return Err(PipelineError::UnsupportedFormat {
                    extension: ext.to_string(),
                });
            }
        };

        let table = Self::from_dataframe(&df)?;
        tracing::debug!(
            path = %path.display(),
            rows = table.height(),
            columns = table.width(),
            "loaded raw table"
        );
        Ok(table)
    }

    /// Convert a materialized DataFrame into text cells
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let headers: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut columns: Vec<Vec<Option<String>>> = Vec::with_capacity(headers.len());
        for name in &headers {
            let series = df
                .column(name)
                .map_err(|_| PipelineError::ColumnNotFound {
                    column: name.clone(),
                })?
                .as_materialized_series()
                .cast(&DataType::String)?;
            let values = series
                .str()?
                .into_iter()
                .map(|opt| opt.map(str::to_string))
                .collect();
            columns.push(values);
        }

        let height = df.height();
        let rows = (0..height)
            .map(|row_idx| {
                columns
                    .iter()
                    .map(|col| col.get(row_idx).cloned().flatten())
                    .collect()
            })
            .collect();

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Get the number of rows
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of columns
    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_from_pairs_unions_headers() {
        let table = RawTable::from_pairs(vec![
            vec![("t", "1"), ("method", "GRID")],
            vec![("t", "2"), ("collisions", "5")],
        ]);
        assert_eq!(table.headers(), &["t", "method", "collisions"]);
        assert_eq!(table.cell(0, 1), Some("GRID"));
        assert_eq!(table.cell(0, 2), None);
        assert_eq!(table.cell(1, 2), Some("5"));
    }

    #[test]
    fn test_new_pads_short_rows() {
        let table = RawTable::new(
            vec!["a".into(), "b".into()],
            vec![vec![Some("1".into())]],
        );
        assert_eq!(table.cell(0, 0), Some("1"));
        assert_eq!(table.cell(0, 1), None);
        assert_eq!(table.width(), 2);
    }

    #[test]
    fn test_csv_loading_keeps_text() {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "timestamp,collisions,method_name").unwrap();
        writeln!(file, "2024-01-15 14:30:00.5 -03:00,3,GRID").unwrap();
        writeln!(file, "garbage,oops,PATH").unwrap();
        file.flush().unwrap();

        let table = RawTable::load(file.path()).unwrap();
        assert_eq!(table.height(), 2);
        assert_eq!(table.width(), 3);
        assert_eq!(table.cell(0, 0), Some("2024-01-15 14:30:00.5 -03:00"));
        assert_eq!(table.cell(1, 1), Some("oops"));
        assert_eq!(table.cell(1, 2), Some("PATH"));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = Builder::new().suffix(".xlsx").tempfile().unwrap();
        let err = RawTable::load(file.path()).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFormat { .. }));
    }
}
