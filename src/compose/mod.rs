//! Series composer: turns chart specifications into renderable series with
//! axis metadata and linked value ranges

pub mod range;
pub mod series;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::Summary;
use crate::data::FieldSource;
use crate::error::{PipelineError, Result};

pub use range::{Bounds, shared_bounds};
pub use series::{Axis, Point, Series, SeriesKind, SeriesSpec, SourceRef, XSource, YSource};

/// Declarative description of one chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub x_label: String,
    #[serde(default)]
    pub y_label: String,
    /// Label of the right-hand scale for dual-axis charts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_label: Option<String>,
    pub series: Vec<SeriesSpec>,
    /// Charts sharing a group name share one y-range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_group: Option<String>,
    /// Draw both axes of a dual-axis chart against one range
    #[serde(default)]
    pub link_axes: bool,
    /// Flip the y direction (screen coordinates)
    #[serde(default)]
    pub invert_y: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ChartSpec {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            x_label: String::new(),
            y_label: String::new(),
            secondary_label: None,
            series: Vec::new(),
            link_group: None,
            link_axes: false,
            invert_y: false,
            note: None,
        }
    }

    pub fn labels(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.x_label = x.into();
        self.y_label = y.into();
        self
    }

    pub fn secondary_label(mut self, label: impl Into<String>) -> Self {
        self.secondary_label = Some(label.into());
        self
    }

    pub fn series(mut self, spec: SeriesSpec) -> Self {
        self.series.push(spec);
        self
    }

    pub fn link_group(mut self, group: impl Into<String>) -> Self {
        self.link_group = Some(group.into());
        self
    }

    pub fn link_axes(mut self) -> Self {
        self.link_axes = true;
        self
    }

    pub fn invert_y(mut self) -> Self {
        self.invert_y = true;
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum XScale {
    /// Seconds since the Unix epoch
    Time,
    Linear,
    /// Positions `0..n` labelled by [`Chart::categories`]
    Category,
}

/// Present on charts with series on both axes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisCoupling {
    /// Both scales were given the same range
    pub linked: bool,
}

/// A finalized chart. Series are in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub id: String,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub secondary_label: Option<String>,
    pub x_scale: XScale,
    pub series: Vec<Series>,
    pub categories: Option<Vec<String>>,
    pub coupling: Option<AxisCoupling>,
    /// Range of the primary scale
    pub y_bounds: Option<Bounds>,
    /// Range of the secondary scale
    pub secondary_bounds: Option<Bounds>,
    pub invert_y: bool,
    pub note: Option<String>,
}

impl Chart {
    pub fn on_axis(&self, axis: Axis) -> impl Iterator<Item = &Series> {
        self.series.iter().filter(move |s| s.axis == axis)
    }

    pub fn is_dual_axis(&self) -> bool {
        self.coupling.is_some()
    }

    pub fn point_count(&self) -> usize {
        self.series.iter().map(|s| s.points.len()).sum()
    }
}

/// Shared range of one link group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkedBounds {
    pub group: String,
    /// `None` when every linked series is empty
    pub bounds: Option<Bounds>,
    /// Chart ids in the group, in declaration order
    pub charts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Composition {
    pub charts: Vec<Chart>,
    pub linked: Vec<LinkedBounds>,
}

/// Stage outputs a series may read from
pub struct Sources<'a> {
    records: &'a dyn FieldSource,
    summaries: HashMap<&'a str, &'a Summary>,
}

impl<'a> Sources<'a> {
    pub fn new(records: &'a dyn FieldSource) -> Self {
        Self {
            records,
            summaries: HashMap::new(),
        }
    }

    pub fn with_summary(mut self, id: &'a str, summary: &'a Summary) -> Self {
        self.summaries.insert(id, summary);
        self
    }

    fn resolve(&self, source: &SourceRef) -> Result<&'a dyn FieldSource> {
        match source {
            SourceRef::Records => Ok(self.records),
            SourceRef::Summary(id) => self
                .summaries
                .get(id.as_str())
                .map(|s| *s as &dyn FieldSource)
                .ok_or_else(|| PipelineError::UnknownSummary { id: id.clone() }),
        }
    }
}

fn x_scale(spec: &ChartSpec, has_categories: bool) -> XScale {
    if has_categories {
        XScale::Category
    } else if !spec.series.is_empty() && spec.series.iter().all(|s| s.x == XSource::Timestamp) {
        XScale::Time
    } else {
        XScale::Linear
    }
}

/// Compose a single chart
pub fn compose_chart(spec: &ChartSpec, sources: &Sources<'_>) -> Result<Chart> {
    let mut series = spec
        .series
        .iter()
        .map(|s| series::build_series(s, sources.resolve(&s.source)?))
        .collect::<Result<Vec<_>>>()?;

    // Series with their own category lists are remapped onto the union
    let mut categories: Vec<String> = Vec::new();
    for s in &series {
        for label in s.categories.iter().flatten() {
            if !categories.contains(label) {
                categories.push(label.clone());
            }
        }
    }
    for s in &mut series {
        if let Some(own) = s.categories.take() {
            for p in &mut s.points {
                let label = &own[p.x as usize];
                p.x = categories.iter().position(|c| c == label).unwrap_or_default() as f64;
            }
            s.categories = Some(categories.clone());
        }
    }

    let primary = shared_bounds(series.iter().filter(|s| s.axis == Axis::Primary));
    let secondary = shared_bounds(series.iter().filter(|s| s.axis == Axis::Secondary));
    let dual = series.iter().any(|s| s.axis == Axis::Primary)
        && series.iter().any(|s| s.axis == Axis::Secondary);

    let (y_bounds, secondary_bounds) = if dual && spec.link_axes {
        let shared = shared_bounds(&series);
        (shared, shared)
    } else {
        (primary, secondary)
    };

    let has_categories = !categories.is_empty();
    let chart = Chart {
        id: spec.id.clone(),
        title: spec.title.clone(),
        x_label: spec.x_label.clone(),
        y_label: spec.y_label.clone(),
        secondary_label: spec.secondary_label.clone(),
        x_scale: x_scale(spec, has_categories),
        series,
        categories: has_categories.then_some(categories),
        coupling: dual.then_some(AxisCoupling {
            linked: spec.link_axes,
        }),
        y_bounds,
        secondary_bounds,
        invert_y: spec.invert_y,
        note: spec.note.clone(),
    };
    debug!(
        chart = %chart.id,
        series = chart.series.len(),
        points = chart.point_count(),
        dual,
        "composed chart"
    );
    Ok(chart)
}

/// Compose every chart, then apply shared ranges across link groups
pub fn compose(specs: &[ChartSpec], sources: &Sources<'_>) -> Result<Composition> {
    profiling::scope!("compose");

    let mut charts = specs
        .iter()
        .map(|spec| compose_chart(spec, sources))
        .collect::<Result<Vec<_>>>()?;

    let mut linked: Vec<LinkedBounds> = Vec::new();
    for (spec, chart) in specs.iter().zip(&charts) {
        let Some(group) = &spec.link_group else { continue };
        let contribution = match (chart.y_bounds, spec.link_axes) {
            (Some(b), _) => Some(b),
            (None, true) => chart.secondary_bounds,
            (None, false) => None,
        };
        match linked.iter_mut().find(|l| &l.group == group) {
            Some(entry) => {
                entry.bounds = match (entry.bounds, contribution) {
                    (Some(a), Some(b)) => Some(a.union(b)),
                    (a, b) => a.or(b),
                };
                entry.charts.push(chart.id.clone());
            }
            None => linked.push(LinkedBounds {
                group: group.clone(),
                bounds: contribution,
                charts: vec![chart.id.clone()],
            }),
        }
    }

    for (spec, chart) in specs.iter().zip(&mut charts) {
        let Some(group) = &spec.link_group else { continue };
        if let Some(entry) = linked.iter().find(|l| &l.group == group) {
            chart.y_bounds = entry.bounds;
            if spec.link_axes {
                chart.secondary_bounds = entry.bounds;
            }
        }
    }

    for l in &linked {
        debug!(group = %l.group, charts = l.charts.len(), bounds = ?l.bounds, "linked y-range");
    }
    Ok(Composition { charts, linked })
}
