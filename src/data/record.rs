//! Immutable parsed records and the read-only view shared by every stage

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::value::{GroupKey, Timestamp, Value};

/// How a column is interpreted at ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Numeric,
    Categorical,
}

/// Field layout shared by every record of one ingested table
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    timestamp: String,
    fields: Vec<(String, FieldKind)>,
}

impl Schema {
    pub fn new(timestamp: impl Into<String>, fields: Vec<(String, FieldKind)>) -> Self {
        Self {
            timestamp: timestamp.into(),
            fields,
        }
    }

    pub fn timestamp_column(&self) -> &str {
        &self.timestamp
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(n, _)| n == name)
    }

    pub fn kind(&self, idx: usize) -> Option<FieldKind> {
        self.fields.get(idx).map(|(_, k)| *k)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn numeric_names(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, k)| *k == FieldKind::Numeric)
            .map(|(n, _)| n.as_str())
    }
}

/// One sampling tick after parsing
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    row: usize,
    timestamp: Timestamp,
    values: Vec<Value>,
}

impl Record {
    pub(crate) fn new(row: usize, timestamp: Timestamp, values: Vec<Value>) -> Self {
        Self {
            row,
            timestamp,
            values,
        }
    }

    /// Zero-based index of the source row this record came from
    pub fn row(&self) -> usize {
        self.row
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn value(&self, idx: usize) -> &Value {
        self.values.get(idx).unwrap_or(&Value::Absent)
    }
}

/// Ordered, immutable record sequence. Cloning shares the backing storage.
#[derive(Debug, Clone)]
pub struct RecordSet {
    schema: Arc<Schema>,
    records: Arc<[Record]>,
}

impl RecordSet {
    pub fn new(schema: Schema, records: Vec<Record>) -> Self {
        Self {
            schema: Arc::new(schema),
            records: records.into(),
        }
    }

    pub fn empty(schema: Schema) -> Self {
        Self::new(schema, Vec::new())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&Record> {
        self.records.get(idx)
    }

    /// Value of `field` on record `idx`; unknown fields read as absent
    pub fn value(&self, idx: usize, field: &str) -> &Value {
        match (self.records.get(idx), self.schema.index_of(field)) {
            (Some(record), Some(f)) => record.value(f),
            _ => &Value::Absent,
        }
    }
}

/// Read-only, index-addressed access to a record set, an enriched set or a
/// summary. The aggregator and composer only see data through this trait, so
/// each series can draw from whichever stage output it needs.
pub trait FieldSource {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn has_field(&self, field: &str) -> bool;

    /// Names of every numeric field, in declaration order
    fn numeric_fields(&self) -> Vec<String>;

    fn numeric(&self, idx: usize, field: &str) -> Option<f64>;

    fn text(&self, idx: usize, field: &str) -> Option<&str>;

    fn timestamp(&self, idx: usize) -> Timestamp;

    /// Grouping key of row `idx`, for sources produced by the aggregator
    fn group_key(&self, _idx: usize) -> Option<&GroupKey> {
        None
    }
}

impl FieldSource for RecordSet {
    fn len(&self) -> usize {
        self.records.len()
    }

    fn has_field(&self, field: &str) -> bool {
        self.schema.index_of(field).is_some()
    }

    fn numeric_fields(&self) -> Vec<String> {
        self.schema.numeric_names().map(str::to_string).collect()
    }

    fn numeric(&self, idx: usize, field: &str) -> Option<f64> {
        self.value(idx, field).as_number()
    }

    fn text(&self, idx: usize, field: &str) -> Option<&str> {
        self.value(idx, field).as_text()
    }

    fn timestamp(&self, idx: usize) -> Timestamp {
        self.records
            .get(idx)
            .map(Record::timestamp)
            .unwrap_or(Timestamp::Invalid)
    }
}
