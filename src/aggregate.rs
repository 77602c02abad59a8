//! Aggregator: partition records by a key and reduce each group to one row

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::stats::mean_of_present;
use crate::data::{FieldSource, GroupKey, Timestamp};
use crate::error::{PipelineError, Result};

/// Order in which groups are emitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupOrder {
    /// Order in which each key value first appears in the input
    #[default]
    FirstSeen,
    /// Ascending key order (numbers, then text, then absent)
    Ascending,
}

/// How a group collapses to a single summary row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reduction {
    /// Arithmetic mean of the present values of `field`
    Mean { field: String },
    /// Every numeric value of the chronologically last record
    Last,
}

/// Records sharing one key value, as indices into the source
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: GroupKey,
    pub members: Vec<usize>,
}

/// A partition of a source by one field
#[derive(Debug, Clone, PartialEq)]
pub struct Grouping {
    key_field: String,
    groups: Vec<Group>,
}

fn key_of<S: FieldSource + ?Sized>(source: &S, idx: usize, field: &str) -> GroupKey {
    if let Some(text) = source.text(idx, field) {
        GroupKey::Text(text.to_string())
    } else if let Some(value) = source.numeric(idx, field) {
        GroupKey::Number(value)
    } else {
        GroupKey::Absent
    }
}

/// Partition `source` by `key`. Every record lands in exactly one group;
/// records without a key value share the [`GroupKey::Absent`] group.
pub fn group_by<S: FieldSource + ?Sized>(source: &S, key: &str, order: GroupOrder) -> Result<Grouping> {
    profiling::scope!("group_by");

    if !source.has_field(key) {
        return Err(PipelineError::ColumnNotFound {
            column: key.to_string(),
        });
    }

    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();
    for idx in 0..source.len() {
        let value = key_of(source, idx, key);
        match index.get(&value) {
            Some(&g) => groups[g].members.push(idx),
            None => {
                index.insert(value.clone(), groups.len());
                groups.push(Group {
                    key: value,
                    members: vec![idx],
                });
            }
        }
    }

    if order == GroupOrder::Ascending {
        groups.sort_by(|a, b| a.key.cmp(&b.key));
    }

    debug!(key, groups = groups.len(), "grouped records");
    Ok(Grouping {
        key_field: key.to_string(),
        groups,
    })
}

impl Grouping {
    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, key: &GroupKey) -> Option<&Group> {
        self.groups.iter().find(|g| &g.key == key)
    }

    /// Keep only groups whose key matches one of `keys`, in the current order
    pub fn retain_keys<K: AsRef<str>>(&self, keys: &[K]) -> Grouping {
        Grouping {
            key_field: self.key_field.clone(),
            groups: self
                .groups
                .iter()
                .filter(|g| keys.iter().any(|k| g.key.matches(k.as_ref())))
                .cloned()
                .collect(),
        }
    }

    /// Collapse each group to one summary row
    pub fn reduce<S: FieldSource + ?Sized>(&self, source: &S, reduction: &Reduction) -> Result<Summary> {
        profiling::scope!("reduce");

        let (columns, rows) = match reduction {
            Reduction::Mean { field } => {
                if !source.has_field(field) {
                    return Err(PipelineError::ColumnNotFound {
                        column: field.clone(),
                    });
                }
                let rows = self
                    .groups
                    .iter()
                    .map(|group| {
                        let values: Vec<Option<f64>> =
                            group.members.iter().map(|&i| source.numeric(i, field)).collect();
                        SummaryRow {
                            key: group.key.clone(),
                            members: group.members.len(),
                            timed_members: timed_members(source, &group.members),
                            timestamp: Timestamp::Invalid,
                            values: vec![mean_of_present(&values)],
                        }
                    })
                    .collect();
                (vec![field.clone()], rows)
            }
            Reduction::Last => {
                let columns = source.numeric_fields();
                let rows = self
                    .groups
                    .iter()
                    .map(|group| {
                        let last = last_member(source, &group.members);
                        SummaryRow {
                            key: group.key.clone(),
                            members: group.members.len(),
                            timed_members: timed_members(source, &group.members),
                            timestamp: last.map(|i| source.timestamp(i)).unwrap_or(Timestamp::Invalid),
                            values: columns
                                .iter()
                                .map(|c| last.and_then(|i| source.numeric(i, c)))
                                .collect(),
                        }
                    })
                    .collect();
                (columns, rows)
            }
        };

        Ok(Summary {
            key_field: self.key_field.clone(),
            reduction: reduction.clone(),
            columns,
            rows,
        })
    }
}

/// Member with the latest valid timestamp; ties go to the later input row.
/// Members with invalid timestamps are never chosen.
fn last_member<S: FieldSource + ?Sized>(source: &S, members: &[usize]) -> Option<usize> {
    let mut best: Option<(usize, chrono::DateTime<chrono::Utc>)> = None;
    for &idx in members {
        if let Some(t) = source.timestamp(idx).instant() {
            if best.is_none_or(|(_, b)| t >= b) {
                best = Some((idx, t));
            }
        }
    }
    best.map(|(idx, _)| idx)
}

fn timed_members<S: FieldSource + ?Sized>(source: &S, members: &[usize]) -> usize {
    members.iter().filter(|&&i| source.timestamp(i).is_valid()).count()
}

/// Group then reduce in one step
pub fn summarize<S: FieldSource + ?Sized>(
    source: &S,
    key: &str,
    reduction: &Reduction,
    order: GroupOrder,
) -> Result<Summary> {
    group_by(source, key, order)?.reduce(source, reduction)
}

/// One reduced group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub key: GroupKey,
    /// Number of records in the group
    pub members: usize,
    /// Members with a valid timestamp. A "last" row with none of them has
    /// only absent values.
    pub timed_members: usize,
    /// Timestamp of the record a "last" reduction picked
    #[serde(skip)]
    pub timestamp: Timestamp,
    /// Reduced values, aligned with [`Summary::columns`]
    pub values: Vec<Option<f64>>,
}

/// One row per distinct key value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    key_field: String,
    reduction: Reduction,
    columns: Vec<String>,
    rows: Vec<SummaryRow>,
}

impl Summary {
    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    pub fn reduction(&self) -> &Reduction {
        &self.reduction
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub fn keys(&self) -> impl Iterator<Item = &GroupKey> {
        self.rows.iter().map(|r| &r.key)
    }

    /// Reduced value of `field` for the group with `key`
    pub fn value(&self, key: &GroupKey, field: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == field)?;
        self.rows
            .iter()
            .find(|r| &r.key == key)
            .and_then(|r| r.values.get(col).copied().flatten())
    }
}

impl FieldSource for Summary {
    fn len(&self) -> usize {
        self.rows.len()
    }

    fn has_field(&self, field: &str) -> bool {
        field == self.key_field || self.columns.iter().any(|c| c == field)
    }

    fn numeric_fields(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn numeric(&self, idx: usize, field: &str) -> Option<f64> {
        let row = self.rows.get(idx)?;
        if field == self.key_field {
            return row.key.as_number();
        }
        let col = self.columns.iter().position(|c| c == field)?;
        row.values.get(col).copied().flatten()
    }

    fn text(&self, idx: usize, field: &str) -> Option<&str> {
        match self.rows.get(idx) {
            Some(SummaryRow {
                key: GroupKey::Text(s),
                ..
            }) if field == self.key_field => Some(s),
            _ => None,
        }
    }

    fn timestamp(&self, idx: usize) -> Timestamp {
        self.rows
            .get(idx)
            .map(|r| r.timestamp)
            .unwrap_or(Timestamp::Invalid)
    }

    fn group_key(&self, idx: usize) -> Option<&GroupKey> {
        self.rows.get(idx).map(|r| &r.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FieldMapping, RawTable, RecordSet, parse_table};

    fn parse(rows: Vec<Vec<(&str, &str)>>, numeric: &[&str], categorical: &[&str]) -> RecordSet {
        let mapping = FieldMapping::new("t", numeric.iter().copied())
            .with_categorical(categorical.iter().copied());
        parse_table(&RawTable::from_pairs(rows), &mapping)
            .unwrap()
            .records
    }

    fn methods() -> RecordSet {
        parse(
            vec![
                vec![("t", "2024-01-01 00:00:01"), ("method", "GRID"), ("collisions", "3")],
                vec![("t", "2024-01-01 00:00:02"), ("method", "GRID"), ("collisions", "5")],
                vec![("t", "2024-01-01 00:00:01"), ("method", "PATH"), ("collisions", "1")],
            ],
            &["collisions"],
            &["method"],
        )
    }

    #[test]
    fn test_last_per_method_in_first_seen_order() {
        let summary = summarize(&methods(), "method", &Reduction::Last, GroupOrder::FirstSeen).unwrap();

        let keys: Vec<String> = summary.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["GRID", "PATH"]);
        assert_eq!(summary.value(&GroupKey::Text("GRID".into()), "collisions"), Some(5.0));
        assert_eq!(summary.value(&GroupKey::Text("PATH".into()), "collisions"), Some(1.0));
    }

    #[test]
    fn test_last_over_tick_timestamps() {
        let records = parse(
            vec![
                vec![("t", "1"), ("method", "GRID"), ("collisions", "3")],
                vec![("t", "2"), ("method", "GRID"), ("collisions", "5")],
                vec![("t", "1"), ("method", "PATH"), ("collisions", "1")],
            ],
            &["collisions"],
            &["method"],
        );
        let summary = summarize(&records, "method", &Reduction::Last, GroupOrder::FirstSeen).unwrap();

        assert_eq!(summary.value(&GroupKey::Text("GRID".into()), "collisions"), Some(5.0));
        assert_eq!(summary.value(&GroupKey::Text("PATH".into()), "collisions"), Some(1.0));
        assert_eq!(summary.rows()[0].timed_members, 2);

        let shuffled = parse(
            vec![
                vec![("t", "3"), ("k", "a"), ("v", "9")],
                vec![("t", "1"), ("k", "a"), ("v", "5")],
                vec![("t", "2"), ("k", "a"), ("v", "7")],
            ],
            &["v"],
            &["k"],
        );
        let summary = summarize(&shuffled, "k", &Reduction::Last, GroupOrder::FirstSeen).unwrap();
        assert_eq!(summary.rows()[0].values, vec![Some(9.0)]);
    }

    #[test]
    fn test_partition_law() {
        let records = parse(
            vec![
                vec![("t", "2024-01-01 00:00:01"), ("start", "5"), ("time", "10")],
                vec![("t", "2024-01-01 00:00:02"), ("start", "3"), ("time", "20")],
                vec![("t", "2024-01-01 00:00:03"), ("start", "5"), ("time", "30")],
                vec![("t", "2024-01-01 00:00:04"), ("start", ""), ("time", "40")],
            ],
            &["start", "time"],
            &[],
        );
        let grouping = group_by(&records, "start", GroupOrder::FirstSeen).unwrap();

        let mut members: Vec<usize> = grouping
            .groups()
            .iter()
            .flat_map(|g| g.members.iter().copied())
            .collect();
        members.sort_unstable();
        assert_eq!(members, vec![0, 1, 2, 3]);
        assert_eq!(grouping.len(), 3);
        assert_eq!(grouping.groups()[2].key, GroupKey::Absent);
    }

    #[test]
    fn test_mean_reduction() {
        let records = parse(
            vec![
                vec![("t", "2024-01-01 00:00:01"), ("start", "5"), ("time", "10")],
                vec![("t", "2024-01-01 00:00:02"), ("start", "5"), ("time", "20")],
                vec![("t", "2024-01-01 00:00:03"), ("start", "5"), ("time", "30")],
                vec![("t", "2024-01-01 00:00:04"), ("start", "2"), ("time", "")],
                vec![("t", "2024-01-01 00:00:05"), ("start", "2"), ("time", "")],
            ],
            &["start", "time"],
            &[],
        );
        let summary = summarize(
            &records,
            "start",
            &Reduction::Mean { field: "time".into() },
            GroupOrder::Ascending,
        )
        .unwrap();

        assert_eq!(summary.rows()[0].key, GroupKey::Number(2.0));
        assert_eq!(summary.rows()[0].values, vec![None]);
        assert_eq!(summary.rows()[1].key, GroupKey::Number(5.0));
        assert_eq!(summary.rows()[1].values, vec![Some(20.0)]);
        assert_eq!(summary.rows()[1].members, 3);
    }

    #[test]
    fn test_last_uses_timestamps_not_input_order() {
        let records = parse(
            vec![
                vec![("t", "2024-01-01 00:00:03"), ("k", "a"), ("v", "9")],
                vec![("t", "2024-01-01 00:00:01"), ("k", "a"), ("v", "5")],
                vec![("t", "garbage"), ("k", "a"), ("v", "100")],
                vec![("t", "2024-01-01 00:00:02"), ("k", "a"), ("v", "7")],
            ],
            &["v"],
            &["k"],
        );
        let summary = summarize(&records, "k", &Reduction::Last, GroupOrder::FirstSeen).unwrap();
        assert_eq!(summary.rows()[0].values, vec![Some(9.0)]);
        assert!(summary.rows()[0].timestamp.is_valid());
    }

    #[test]
    fn test_last_ties_go_to_later_row() {
        let records = parse(
            vec![
                vec![("t", "2024-01-01 00:00:01"), ("k", "a"), ("v", "1")],
                vec![("t", "2024-01-01 00:00:01"), ("k", "a"), ("v", "2")],
            ],
            &["v"],
            &["k"],
        );
        let summary = summarize(&records, "k", &Reduction::Last, GroupOrder::FirstSeen).unwrap();
        assert_eq!(summary.rows()[0].values, vec![Some(2.0)]);
    }

    #[test]
    fn test_last_without_valid_timestamps_is_absent() {
        let records = parse(
            vec![vec![("t", "??"), ("k", "a"), ("v", "1")]],
            &["v"],
            &["k"],
        );
        let summary = summarize(&records, "k", &Reduction::Last, GroupOrder::FirstSeen).unwrap();
        assert_eq!(summary.rows()[0].values, vec![None]);
        assert_eq!(summary.rows()[0].members, 1);
        assert_eq!(summary.rows()[0].timed_members, 0);
    }

    #[test]
    fn test_retain_keys() {
        let grouping = group_by(&methods(), "method", GroupOrder::FirstSeen)
            .unwrap()
            .retain_keys(&["PATH", "ORCA"]);
        assert_eq!(grouping.len(), 1);
        assert_eq!(grouping.groups()[0].key, GroupKey::Text("PATH".into()));
    }

    #[test]
    fn test_unknown_fields() {
        assert!(matches!(
            group_by(&methods(), "nope", GroupOrder::FirstSeen),
            Err(PipelineError::ColumnNotFound { .. })
        ));
        assert!(matches!(
            summarize(&methods(), "method", &Reduction::Mean { field: "nope".into() }, GroupOrder::FirstSeen),
            Err(PipelineError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_summary_as_field_source() {
        let summary = summarize(&methods(), "method", &Reduction::Last, GroupOrder::FirstSeen).unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary.text(0, "method"), Some("GRID"));
        assert_eq!(summary.numeric(1, "collisions"), Some(1.0));
        assert_eq!(summary.group_key(1), Some(&GroupKey::Text("PATH".into())));
    }

    #[test]
    fn test_reduction_is_deterministic() {
        let records = methods();
        let a = summarize(&records, "method", &Reduction::Last, GroupOrder::FirstSeen).unwrap();
        let b = summarize(&records, "method", &Reduction::Last, GroupOrder::FirstSeen).unwrap();
        assert_eq!(a, b);
    }
}
