//! Record parser: raw text rows to typed, order-preserving records

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::record::{FieldKind, Record, RecordSet, Schema};
use super::source::RawTable;
use super::value::{Timestamp, Value};
use crate::constants::columns::DEFAULT_TIMESTAMP;
use crate::error::{PipelineError, Result};

/// Which columns of the raw table the pipeline reads, and how
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(default = "default_timestamp")]
    pub timestamp: String,
    #[serde(default)]
    pub numeric: Vec<String>,
    #[serde(default)]
    pub categorical: Vec<String>,
}

fn default_timestamp() -> String {
    DEFAULT_TIMESTAMP.to_string()
}

impl FieldMapping {
    pub fn new<S: Into<String>>(timestamp: impl Into<String>, numeric: impl IntoIterator<Item = S>) -> Self {
        Self {
            timestamp: timestamp.into(),
            numeric: numeric.into_iter().map(Into::into).collect(),
            categorical: Vec::new(),
        }
    }

    pub fn with_categorical<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.categorical.extend(columns.into_iter().map(Into::into));
        self
    }

    fn schema(&self) -> Result<Schema> {
        let mut fields: Vec<(String, FieldKind)> = Vec::new();
        let declared = self
            .numeric
            .iter()
            .map(|n| (n, FieldKind::Numeric))
            .chain(self.categorical.iter().map(|c| (c, FieldKind::Categorical)));

        for (name, kind) in declared {
            if *name == self.timestamp || fields.iter().any(|(n, _)| n == name) {
                return Err(PipelineError::DuplicateField { field: name.clone() });
            }
            fields.push((name.clone(), kind));
        }
        Ok(Schema::new(self.timestamp.clone(), fields))
    }
}

/// A row removed during ingestion because a numeric cell held non-numeric text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedRow {
    pub row: usize,
    pub column: String,
    pub text: String,
}

/// Parser output: the records plus everything that was recovered on the way
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub records: RecordSet,
    pub dropped: Vec<DroppedRow>,
    /// Retained records whose timestamp could not be parsed
    pub invalid_timestamps: usize,
    /// Records whose valid timestamp is earlier than one seen before them
    pub out_of_order: usize,
}

impl ParseOutcome {
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }

    /// True when valid timestamps never decrease in input order
    pub fn is_time_ordered(&self) -> bool {
        self.out_of_order == 0
    }
}

enum Cell {
    Keep(Value),
    Reject,
}

fn convert(raw: Option<&str>, kind: FieldKind) -> Cell {
    let text = match raw.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => return Cell::Keep(Value::Absent),
    };
    match kind {
        FieldKind::Categorical => Cell::Keep(Value::Text(text.to_string())),
        FieldKind::Numeric => match text.parse::<f64>() {
            Ok(v) if v.is_finite() => Cell::Keep(Value::Number(v)),
            // "NaN" and "inf" are how some writers spell a missing sample
            Ok(_) => Cell::Keep(Value::Absent),
            Err(_) => Cell::Reject,
        },
    }
}

/// Parse raw rows into records, preserving row order.
///
/// Malformed timestamps are kept as [`Timestamp::Invalid`]; rows carrying
/// non-numeric text in a numeric column are dropped and reported. An empty
/// table always yields an empty record set.
pub fn parse_table(table: &RawTable, mapping: &FieldMapping) -> Result<ParseOutcome> {
    profiling::scope!("parse_table");

    let schema = mapping.schema()?;

    if table.is_empty() {
        debug!("empty table, nothing to parse");
        return Ok(ParseOutcome {
            records: RecordSet::empty(schema),
            dropped: Vec::new(),
            invalid_timestamps: 0,
            out_of_order: 0,
        });
    }

    let ts_col = table
        .column_index(&mapping.timestamp)
        .ok_or_else(|| PipelineError::MissingTimestampColumn {
            column: mapping.timestamp.clone(),
        })?;

    let columns: Vec<(Option<usize>, FieldKind, &str)> = schema
        .names()
        .enumerate()
        .map(|(idx, name)| {
            let kind = schema.kind(idx).unwrap_or(FieldKind::Numeric);
            (table.column_index(name), kind, name)
        })
        .collect();

    let present_metrics = columns
        .iter()
        .filter(|(col, kind, _)| col.is_some() && *kind == FieldKind::Numeric)
        .count();
    if present_metrics == 0 {
        return Err(PipelineError::NoMetricColumns {
            declared: mapping.numeric.clone(),
        });
    }
    for (_, _, name) in columns.iter().filter(|(col, _, _)| col.is_none()) {
        warn!(column = %name, "declared column missing from table, treating as absent");
    }

    let mut records = Vec::with_capacity(table.height());
    let mut dropped = Vec::new();
    let mut invalid_timestamps = 0;
    let mut out_of_order = 0;
    let mut latest = None;

    'rows: for row in 0..table.height() {
        let mut values = Vec::with_capacity(columns.len());
        for (col, kind, name) in &columns {
            let raw = col.and_then(|c| table.cell(row, c));
            match convert(raw, *kind) {
                Cell::Keep(value) => values.push(value),
                Cell::Reject => {
                    dropped.push(DroppedRow {
                        row,
                        column: name.to_string(),
                        text: raw.unwrap_or_default().to_string(),
                    });
                    continue 'rows;
                }
            }
        }

        let timestamp = table
            .cell(row, ts_col)
            .map(Timestamp::parse)
            .unwrap_or(Timestamp::Invalid);
        match timestamp.instant() {
            Some(t) => {
                if latest.is_some_and(|l| t < l) {
                    out_of_order += 1;
                } else {
                    latest = Some(t);
                }
            }
            None => invalid_timestamps += 1,
        }

        records.push(Record::new(row, timestamp, values));
    }

    if !dropped.is_empty() {
        warn!(dropped = dropped.len(), "dropped rows with non-numeric metric values");
    }
    if out_of_order > 0 {
        warn!(out_of_order, "log is not time-ordered");
    }
    debug!(
        rows = table.height(),
        records = records.len(),
        invalid_timestamps,
        "parsed table"
    );

    Ok(ParseOutcome {
        records: RecordSet::new(schema, records),
        dropped,
        invalid_timestamps,
        out_of_order,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::record::FieldSource;

    fn mapping() -> FieldMapping {
        FieldMapping::new("t", ["collisions", "steps"]).with_categorical(["method"])
    }

    #[test]
    fn test_empty_table_is_not_an_error() {
        let outcome = parse_table(&RawTable::default(), &mapping()).unwrap();
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.dropped_count(), 0);
    }

    #[test]
    fn test_preserves_row_order() {
        let table = RawTable::from_pairs(vec![
            vec![("t", "2024-01-01 00:00:03"), ("collisions", "9"), ("method", "C")],
            vec![("t", "2024-01-01 00:00:01"), ("collisions", "1"), ("method", "A")],
            vec![("t", "2024-01-01 00:00:02"), ("collisions", "4"), ("method", "B")],
        ]);
        let outcome = parse_table(&table, &mapping()).unwrap();
        let methods: Vec<_> = (0..3).map(|i| outcome.records.text(i, "method").unwrap()).collect();
        assert_eq!(methods, vec!["C", "A", "B"]);
        assert_eq!(outcome.out_of_order, 1);
        assert!(!outcome.is_time_ordered());
    }

    #[test]
    fn test_invalid_timestamp_is_retained() {
        let table = RawTable::from_pairs(vec![
            vec![("t", "yesterday-ish"), ("collisions", "2")],
            vec![("t", "2024-01-01 00:00:01"), ("collisions", "3")],
        ]);
        let outcome = parse_table(&table, &mapping()).unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.invalid_timestamps, 1);
        assert_eq!(outcome.records.timestamp(0), Timestamp::Invalid);
        assert_eq!(outcome.records.numeric(0, "collisions"), Some(2.0));
    }

    #[test]
    fn test_non_numeric_row_is_dropped() {
        let table = RawTable::from_pairs(vec![
            vec![("t", "2024-01-01 00:00:01"), ("collisions", "1")],
            vec![("t", "2024-01-01 00:00:02"), ("collisions", "lots")],
            vec![("t", "2024-01-01 00:00:03"), ("collisions", "3")],
        ]);
        let outcome = parse_table(&table, &mapping()).unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(
            outcome.dropped,
            vec![DroppedRow {
                row: 1,
                column: "collisions".into(),
                text: "lots".into()
            }]
        );
        assert_eq!(outcome.records.get(1).unwrap().row(), 2);
    }

    #[test]
    fn test_missing_and_empty_cells_are_absent() {
        let table = RawTable::from_pairs(vec![vec![
            ("t", "2024-01-01 00:00:01"),
            ("collisions", " "),
            ("method", "GRID"),
        ]]);
        let outcome = parse_table(&table, &mapping()).unwrap();
        assert_eq!(outcome.records.numeric(0, "collisions"), None);
        // "steps" is declared but not in the table
        assert!(outcome.records.value(0, "steps").is_absent());
        assert_eq!(outcome.dropped_count(), 0);
    }

    #[test]
    fn test_structural_errors() {
        let no_ts = RawTable::from_pairs(vec![vec![("collisions", "1")]]);
        assert!(matches!(
            parse_table(&no_ts, &mapping()),
            Err(PipelineError::MissingTimestampColumn { .. })
        ));

        let no_metrics = RawTable::from_pairs(vec![vec![("t", "1"), ("method", "GRID")]]);
        assert!(matches!(
            parse_table(&no_metrics, &mapping()),
            Err(PipelineError::NoMetricColumns { .. })
        ));

        let duplicate = FieldMapping::new("t", ["a", "a"]);
        assert!(matches!(
            parse_table(&no_ts, &duplicate),
            Err(PipelineError::DuplicateField { .. })
        ));
    }

    #[test]
    fn test_nan_text_is_absent() {
        let table = RawTable::from_pairs(vec![vec![("t", "2024-01-01"), ("collisions", "NaN")]]);
        let outcome = parse_table(&table, &mapping()).unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records.numeric(0, "collisions"), None);
    }
}
