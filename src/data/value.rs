//! Typed cell values, timestamps and grouping keys

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::datetime::*;

/// A single field value on a record
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    /// Missing cell, empty cell, or a column the table does not carry
    Absent,
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }
}

/// Sampling instant of a record.
///
/// Unparsable timestamps become `Invalid` instead of failing ingestion; stages
/// that need a valid instant skip such records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timestamp {
    Valid(DateTime<Utc>),
    Invalid,
}

impl Timestamp {
    /// Parse a raw timestamp cell, trying offset-aware formats, naive formats,
    /// the compact `YYYYMMDD HHMMSS` form and numeric Unix epochs
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Timestamp::Invalid;
        }

        // Numeric epochs (seconds or milliseconds); any other number is an
        // ordinal tick, read as nanoseconds since the epoch
        if let Ok(num) = trimmed.parse::<f64>() {
            if !num.is_finite() {
                return Timestamp::Invalid;
            }
            let dt = if num >= EPOCH_SECONDS_RANGE.0 && num <= EPOCH_SECONDS_RANGE.1 {
                DateTime::<Utc>::from_timestamp_millis((num * 1000.0).round() as i64)
            } else if num >= EPOCH_MILLIS_RANGE.0 && num <= EPOCH_MILLIS_RANGE.1 {
                DateTime::<Utc>::from_timestamp_millis(num.round() as i64)
            } else if num.abs() < TICK_LIMIT {
                Some(DateTime::<Utc>::from_timestamp_nanos(num.round() as i64))
            } else {
                None
            };
            return dt.map(Timestamp::Valid).unwrap_or(Timestamp::Invalid);
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Timestamp::Valid(dt.with_timezone(&Utc));
        }

        for format in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(trimmed, format) {
                return Timestamp::Valid(dt.with_timezone(&Utc));
            }
        }

        if let Some(dt) = parse_compact(trimmed) {
            return Timestamp::Valid(dt.and_utc());
        }

        for format in NAIVE_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Timestamp::Valid(dt.and_utc());
            }
        }

        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
                if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                    return Timestamp::Valid(dt.and_utc());
                }
            }
        }

        Timestamp::Invalid
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Timestamp::Valid(_))
    }

    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Timestamp::Valid(dt) => Some(*dt),
            Timestamp::Invalid => None,
        }
    }

    /// Seconds since the Unix epoch. Sub-second digits are kept down to the
    /// nanosecond so tick timestamps stay distinct.
    pub fn as_seconds(&self) -> Option<f64> {
        self.instant()
            .map(|dt| dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) / 1e9)
    }
}

/// `YYYYMMDD HHMMSS`
fn parse_compact(s: &str) -> Option<NaiveDateTime> {
    let mut parts = s.split_whitespace();
    let (date, time) = (parts.next()?, parts.next()?);
    if parts.next().is_some()
        || date.len() != DATE_FORMAT_LENGTH
        || time.len() != TIME_FORMAT_LENGTH
        || !date.chars().chain(time.chars()).all(|c| c.is_ascii_digit())
    {
        return None;
    }
    NaiveDateTime::parse_from_str(&format!("{date}{time}"), "%Y%m%d%H%M%S").ok()
}

/// Value of a grouping key.
///
/// Numbers are always finite (the parser turns non-finite text into `Absent`),
/// which makes the total ordering and hashing below well defined.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupKey {
    Number(f64),
    Text(String),
    Absent,
}

impl GroupKey {
    fn rank(&self) -> u8 {
        match self {
            GroupKey::Number(_) => 0,
            GroupKey::Text(_) => 1,
            GroupKey::Absent => 2,
        }
    }

    /// Matches a textual filter entry against this key
    pub fn matches(&self, wanted: &str) -> bool {
        match self {
            GroupKey::Text(s) => s == wanted,
            GroupKey::Number(v) => wanted.trim().parse::<f64>().is_ok_and(|w| w == *v),
            GroupKey::Absent => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            GroupKey::Number(v) => Some(*v),
            _ => None,
        }
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupKey {}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Numbers before text before absent
impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (GroupKey::Number(a), GroupKey::Number(b)) if a == b => Ordering::Equal,
            (GroupKey::Number(a), GroupKey::Number(b)) => a.total_cmp(b),
            (GroupKey::Text(a), GroupKey::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for GroupKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            // -0.0 == 0.0
            GroupKey::Number(v) => (if *v == 0.0 { 0.0f64 } else { *v }).to_bits().hash(state),
            GroupKey::Text(s) => s.hash(state),
            GroupKey::Absent => {}
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Number(v) if v.fract() == 0.0 && v.abs() < 1e15 => write!(f, "{}", *v as i64),
            GroupKey::Number(v) => write!(f, "{}", v),
            GroupKey::Text(s) => write!(f, "{}", s),
            GroupKey::Absent => write!(f, "(absent)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_local_now_format() {
        let ts = Timestamp::parse("2024-01-15 14:30:00.123456789 -03:00");
        let dt = ts.instant().expect("offset timestamp should parse");
        assert_eq!(dt.hour(), 17);
        assert_eq!(dt.timestamp_subsec_millis(), 123);
    }

    #[test]
    fn test_parse_common_formats() {
        assert!(Timestamp::parse("2024-01-15T14:30:00Z").is_valid());
        assert!(Timestamp::parse("2024-01-15 14:30:00").is_valid());
        assert!(Timestamp::parse("2024/01/15").is_valid());
        assert!(Timestamp::parse("20240115 143000").is_valid());

        let dt = Timestamp::parse("15 Jan 2024").instant().unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 1, 15));
    }

    #[test]
    fn test_parse_epochs() {
        let secs = Timestamp::parse("1704067200").as_seconds().unwrap();
        let millis = Timestamp::parse("1704067200500").as_seconds().unwrap();
        assert_eq!(secs, 1_704_067_200.0);
        assert_eq!(millis, 1_704_067_200.5);
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(Timestamp::parse("not a time"), Timestamp::Invalid);
        assert_eq!(Timestamp::parse(""), Timestamp::Invalid);
        assert_eq!(Timestamp::parse("2024-13-45 99:99:99"), Timestamp::Invalid);
        assert_eq!(Timestamp::parse("NaN"), Timestamp::Invalid);
        assert_eq!(Timestamp::parse("inf"), Timestamp::Invalid);
        assert_eq!(Timestamp::parse("1e30"), Timestamp::Invalid);
    }

    #[test]
    fn test_parse_ticks_are_ordered_instants() {
        let ticks: Vec<Timestamp> = ["1", "2", "3", "-4", "2.0"].iter().map(|s| Timestamp::parse(s)).collect();
        assert!(ticks.iter().all(Timestamp::is_valid));
        assert!(ticks[0].instant() < ticks[1].instant());
        assert!(ticks[1].instant() < ticks[2].instant());
        assert!(ticks[3].instant() < ticks[0].instant());
        assert_eq!(ticks[1], ticks[4]);

        let (one, two) = (ticks[0].as_seconds().unwrap(), ticks[1].as_seconds().unwrap());
        assert!(one < two);
    }

    #[test]
    fn test_group_key_ordering() {
        let mut keys = vec![
            GroupKey::Absent,
            GroupKey::Text("PATH".into()),
            GroupKey::Number(10.0),
            GroupKey::Text("GRID".into()),
            GroupKey::Number(2.0),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                GroupKey::Number(2.0),
                GroupKey::Number(10.0),
                GroupKey::Text("GRID".into()),
                GroupKey::Text("PATH".into()),
                GroupKey::Absent,
            ]
        );
    }

    #[test]
    fn test_group_key_display_and_match() {
        assert_eq!(GroupKey::Number(5.0).to_string(), "5");
        assert_eq!(GroupKey::Number(2.5).to_string(), "2.5");
        assert!(GroupKey::Number(5.0).matches("5"));
        assert!(GroupKey::Text("ORCA".into()).matches("ORCA"));
        assert!(!GroupKey::Absent.matches(""));
    }
}
