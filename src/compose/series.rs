//! Series specifications and the per-series point builder

use serde::{Deserialize, Serialize};

use super::range::Bounds;
use crate::data::{FieldSource, GroupKey};
use crate::error::{PipelineError, Result};

/// Which y-scale a series is drawn against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    #[default]
    Primary,
    Secondary,
}

/// Presentation hint for the renderer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    #[default]
    Line,
    Points,
    LineAndPoints,
    Bars,
}

/// Stage output a series reads from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceRef {
    /// The enriched per-tick records
    #[default]
    Records,
    /// A named summary
    Summary(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XSource {
    /// Record timestamp in seconds since the epoch; invalid timestamps are skipped
    Timestamp,
    Field(String),
    /// The grouping key of a summary row
    GroupKey,
    /// Position in the source
    RowIndex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YSource {
    Field(String),
    /// `numerator / denominator` over summary rows, absent when the
    /// denominator is zero
    Ratio { numerator: String, denominator: String },
}

/// Declarative description of one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSpec {
    pub label: String,
    #[serde(default)]
    pub source: SourceRef,
    pub x: XSource,
    pub y: YSource,
    #[serde(default)]
    pub axis: Axis,
    #[serde(default)]
    pub kind: SeriesKind,
}

impl SeriesSpec {
    pub fn new(label: impl Into<String>, x: XSource, y: YSource) -> Self {
        Self {
            label: label.into(),
            source: SourceRef::Records,
            x,
            y,
            axis: Axis::Primary,
            kind: SeriesKind::Line,
        }
    }

    /// `y` field over record timestamps
    pub fn over_time(label: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(label, XSource::Timestamp, YSource::Field(field.into()))
    }

    pub fn from_summary(mut self, id: impl Into<String>) -> Self {
        self.source = SourceRef::Summary(id.into());
        self
    }

    pub fn on(mut self, axis: Axis) -> Self {
        self.axis = axis;
        self
    }

    pub fn kind(mut self, kind: SeriesKind) -> Self {
        self.kind = kind;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Finalized, renderable series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub label: String,
    pub axis: Axis,
    pub kind: SeriesKind,
    pub points: Vec<Point>,
    /// Labels for category positions `0..n` when x is a text group key
    pub categories: Option<Vec<String>>,
    /// Source rows that produced no point (absent x or y)
    pub skipped: usize,
}

impl Series {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn y_bounds(&self) -> Option<Bounds> {
        Bounds::of_y(&self.points)
    }

    pub fn x_bounds(&self) -> Option<Bounds> {
        Bounds::of_x(&self.points)
    }
}

fn require(source: &dyn FieldSource, label: &str, field: &str) -> Result<()> {
    if source.has_field(field) {
        Ok(())
    } else {
        tracing::debug!(series = label, field, "series field missing from source");
        Err(PipelineError::ColumnNotFound {
            column: field.to_string(),
        })
    }
}

fn invalid(spec: &SeriesSpec, reason: &str) -> PipelineError {
    PipelineError::InvalidSeries {
        label: spec.label.clone(),
        reason: reason.to_string(),
    }
}

/// Build the points of one series from its resolved source
pub(crate) fn build_series(spec: &SeriesSpec, source: &dyn FieldSource) -> Result<Series> {
    let from_summary = matches!(spec.source, SourceRef::Summary(_));

    match &spec.x {
        XSource::Field(f) => require(source, &spec.label, f)?,
        XSource::GroupKey if !from_summary => {
            return Err(invalid(spec, "a group-key x axis needs a summary source"));
        }
        _ => {}
    }
    match &spec.y {
        YSource::Field(f) => require(source, &spec.label, f)?,
        YSource::Ratio { .. } if !from_summary => {
            return Err(invalid(spec, "ratio series are computed over summaries"));
        }
        YSource::Ratio {
            numerator,
            denominator,
        } => {
            require(source, &spec.label, numerator)?;
            require(source, &spec.label, denominator)?;
        }
    }

    // Text keys map to category positions; numeric keys stay on a linear axis
    let categorical = matches!(spec.x, XSource::GroupKey)
        && (0..source.len()).any(|i| !matches!(source.group_key(i), Some(GroupKey::Number(_))));
    let mut categories: Vec<String> = Vec::new();

    let mut points = Vec::with_capacity(source.len());
    let mut skipped = 0;
    for idx in 0..source.len() {
        let x = match &spec.x {
            XSource::Timestamp => source.timestamp(idx).as_seconds(),
            XSource::Field(f) => source.numeric(idx, f),
            XSource::RowIndex => Some(idx as f64),
            XSource::GroupKey => match source.group_key(idx) {
                Some(key) if categorical => {
                    let label = key.to_string();
                    let pos = match categories.iter().position(|c| *c == label) {
                        Some(pos) => pos,
                        None => {
                            categories.push(label);
                            categories.len() - 1
                        }
                    };
                    Some(pos as f64)
                }
                Some(key) => key.as_number(),
                None => None,
            },
        };
        let y = match &spec.y {
            YSource::Field(f) => source.numeric(idx, f),
            YSource::Ratio {
                numerator,
                denominator,
            } => match (source.numeric(idx, numerator), source.numeric(idx, denominator)) {
                (Some(_), Some(d)) if d == 0.0 => None,
                (Some(n), Some(d)) => Some(n / d).filter(|v| v.is_finite()),
                _ => None,
            },
        };

        match (x, y) {
            (Some(x), Some(y)) => points.push(Point { x, y }),
            _ => skipped += 1,
        }
    }

    // Time axes must be non-decreasing; the sort is stable so ties keep input order
    if spec.x == XSource::Timestamp {
        points.sort_by(|a, b| a.x.total_cmp(&b.x));
    }

    Ok(Series {
        label: spec.label.clone(),
        axis: spec.axis,
        kind: spec.kind,
        points,
        categories: categorical.then_some(categories),
        skipped,
    })
}
