//! Off-thread report building and plot-ready point preparation
//!
//! Charts are static once a report exists, so every point transformation
//! (secondary-axis mapping, y inversion, downsampling) happens once, on the
//! worker thread, instead of every frame.

mod downsample;
mod worker;

pub use downsample::{is_sorted_by_x, lttb};
pub use worker::{BackgroundWorker, WorkerRequest, WorkerResult};

use std::sync::Arc;

use runlog_oxide::compose::{Axis, Bounds, Chart, SeriesKind};

/// Shared immutable point data
pub type SharedPoints = Arc<[[f64; 2]]>;

/// Linear map from secondary-axis values onto the primary scale, so both
/// scales can be drawn on one plot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisMap {
    primary: Bounds,
    secondary: Bounds,
}

impl AxisMap {
    pub fn new(primary: Bounds, secondary: Bounds) -> Self {
        Self { primary, secondary }
    }

    fn scale(&self) -> f64 {
        match (self.primary.span(), self.secondary.span()) {
            (p, s) if p > 0.0 && s > 0.0 => p / s,
            _ => 1.0,
        }
    }

    pub fn to_primary(&self, v: f64) -> f64 {
        self.primary.min + (v - self.secondary.min) * self.scale()
    }

    pub fn to_secondary(&self, v: f64) -> f64 {
        self.secondary.min + (v - self.primary.min) / self.scale()
    }
}

#[derive(Debug, Clone)]
pub struct PreparedSeries {
    pub label: String,
    pub axis: Axis,
    pub kind: SeriesKind,
    pub points: SharedPoints,
    /// Point count before downsampling
    pub original_len: usize,
}

/// Plot-ready data for one chart, in screen-space y
#[derive(Debug, Clone)]
pub struct PreparedChart {
    pub series: Vec<PreparedSeries>,
    pub axis_map: Option<AxisMap>,
}

/// Build the plot-ready data of `chart`. Series longer than `threshold`
/// points are downsampled when their x values are ordered.
pub fn prepare_chart(chart: &Chart, threshold: usize) -> PreparedChart {
    profiling::scope!("prepare_chart");

    let axis_map = match (chart.coupling, chart.y_bounds, chart.secondary_bounds) {
        (Some(c), Some(p), Some(s)) if !c.linked => Some(AxisMap::new(p, s)),
        _ => None,
    };
    let flip = if chart.invert_y { -1.0 } else { 1.0 };

    let series = chart
        .series
        .iter()
        .map(|s| {
            let map = axis_map.filter(|_| s.axis == Axis::Secondary);
            let points: Vec<[f64; 2]> = s
                .points
                .iter()
                .map(|p| {
                    let y = map.map_or(p.y, |m| m.to_primary(p.y));
                    [p.x, y * flip]
                })
                .collect();
            let points = if s.kind != SeriesKind::Bars && points.len() > threshold && is_sorted_by_x(&points) {
                lttb(&points, threshold)
            } else {
                points
            };
            PreparedSeries {
                label: s.label.clone(),
                axis: s.axis,
                kind: s.kind,
                points: points.into(),
                original_len: s.points.len(),
            }
        })
        .collect();

    PreparedChart { series, axis_map }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runlog_oxide::compose::{AxisCoupling, Point, Series, XScale};

    fn series(axis: Axis, ys: &[f64]) -> Series {
        Series {
            label: format!("{axis:?}"),
            axis,
            kind: SeriesKind::Line,
            points: ys.iter().enumerate().map(|(i, &y)| Point { x: i as f64, y }).collect(),
            categories: None,
            skipped: 0,
        }
    }

    fn chart(series: Vec<Series>, linked: bool) -> Chart {
        Chart {
            id: "c".into(),
            title: "c".into(),
            x_label: String::new(),
            y_label: String::new(),
            secondary_label: None,
            x_scale: XScale::Linear,
            series,
            categories: None,
            coupling: Some(AxisCoupling { linked }),
            y_bounds: Some(Bounds::new(0.0, 10.0)),
            secondary_bounds: Some(Bounds::new(100.0, 200.0)),
            invert_y: false,
            note: None,
        }
    }

    #[test]
    fn test_axis_map_round_trips() {
        let map = AxisMap::new(Bounds::new(0.0, 10.0), Bounds::new(100.0, 200.0));
        assert_eq!(map.to_primary(150.0), 5.0);
        assert_eq!(map.to_secondary(5.0), 150.0);
    }

    #[test]
    fn test_secondary_series_is_mapped() {
        let prepared = prepare_chart(
            &chart(vec![series(Axis::Primary, &[0.0, 10.0]), series(Axis::Secondary, &[100.0, 200.0])], false),
            5000,
        );
        assert!(prepared.axis_map.is_some());
        assert_eq!(&*prepared.series[1].points, &[[0.0, 0.0], [1.0, 10.0]]);
        assert_eq!(&*prepared.series[0].points, &[[0.0, 0.0], [1.0, 10.0]]);
    }

    #[test]
    fn test_linked_axes_are_not_mapped() {
        let prepared = prepare_chart(&chart(vec![series(Axis::Secondary, &[150.0])], true), 5000);
        assert!(prepared.axis_map.is_none());
        assert_eq!(&*prepared.series[0].points, &[[0.0, 150.0]]);
    }

    #[test]
    fn test_long_series_is_downsampled() {
        let ys: Vec<f64> = (0..10_000).map(|i| (i as f64).cos()).collect();
        let prepared = prepare_chart(&chart(vec![series(Axis::Primary, &ys)], false), 500);
        assert_eq!(prepared.series[0].points.len(), 500);
        assert_eq!(prepared.series[0].original_len, 10_000);
    }
}
