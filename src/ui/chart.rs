use chrono::{DateTime, Utc};
use eframe::egui::{self, Color32};
use egui_plot::{AxisHints, Bar, BarChart, GridMark, HPlacement, Legend, Line, Plot, Points};

use runlog_oxide::compose::{Chart, SeriesKind, XScale};

use crate::perf::{AxisMap, PreparedChart};
use crate::state::ViewState;

const PALETTE: [Color32; 10] = [
    Color32::from_rgb(31, 119, 180),
    Color32::from_rgb(255, 127, 14),
    Color32::from_rgb(44, 160, 44),
    Color32::from_rgb(214, 39, 40),
    Color32::from_rgb(148, 103, 189),
    Color32::from_rgb(140, 86, 75),
    Color32::from_rgb(227, 119, 194),
    Color32::from_rgb(127, 127, 127),
    Color32::from_rgb(188, 189, 34),
    Color32::from_rgb(23, 190, 207),
];

fn series_color(index: usize) -> Color32 {
    PALETTE[index % PALETTE.len()]
}

fn format_number(value: f64) -> String {
    if value.abs() < 0.01 && value != 0.0 {
        format!("{:.2e}", value)
    } else if value.abs() >= 1000.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

fn format_time(seconds: f64, separator: &str) -> String {
    let secs = seconds.floor() as i64;
    let nanos = ((seconds.fract() * 1_000_000_000.0) as u32).min(999_999_999);
    match DateTime::<Utc>::from_timestamp(secs, nanos) {
        Some(dt) => dt.format(&format!("%Y-%m-%d{separator}%H:%M:%S")).to_string(),
        None => format!("{:.2}", seconds),
    }
}

fn category_label(categories: &[String], value: f64) -> String {
    let idx = value.round();
    if (value - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    categories.get(idx as usize).cloned().unwrap_or_default()
}

/// Render one chart with egui_plot. Dual-axis charts draw the secondary scale
/// on the right-hand side, mapped onto the primary one.
pub fn render_chart(ui: &mut egui::Ui, chart: &Chart, prepared: &PreparedChart, view: &ViewState, height: f32) {
    profiling::scope!("render_chart");

    ui.horizontal(|ui| {
        ui.heading(&chart.title);
        let skipped: usize = chart.series.iter().map(|s| s.skipped).sum();
        if skipped > 0 {
            ui.weak(format!("({} rows without a value)", skipped))
                .on_hover_text("Absent values and invalid timestamps produce no point");
        }
    });

    let flip = if chart.invert_y { -1.0 } else { 1.0 };
    let mut plot = Plot::new(format!("chart_{}", chart.id))
        .height(height.max(200.0))
        .show_grid(view.show_grid)
        .x_axis_label(chart.x_label.clone());

    if view.show_legend {
        plot = plot.legend(Legend::default().position(egui_plot::Corner::RightTop));
    }
    if view.reset_bounds {
        plot = plot.reset();
    }

    // Shared ranges: both ends are included so linked charts line up
    if let Some(bounds) = chart.y_bounds {
        plot = plot.include_y(bounds.min * flip).include_y(bounds.max * flip);
    }

    let mut y_axes = vec![
        AxisHints::new_y()
            .label(chart.y_label.clone())
            .formatter(move |mark: GridMark, _range| format_number(mark.value * flip)),
    ];
    if let Some(secondary) = &chart.secondary_label {
        let map: Option<AxisMap> = prepared.axis_map;
        y_axes.push(
            AxisHints::new_y()
                .label(secondary.clone())
                .placement(HPlacement::Right)
                .formatter(move |mark: GridMark, _range| {
                    let v = mark.value * flip;
                    format_number(map.map_or(v, |m| m.to_secondary(v)))
                }),
        );
    }
    plot = plot.custom_y_axes(y_axes);

    match chart.x_scale {
        XScale::Time => {
            plot = plot
                .x_axis_formatter(|mark, _range| format_time(mark.value, "\n"))
                .label_formatter(move |name, value| {
                    let time = format_time(value.x, " ");
                    if name.is_empty() {
                        format!("{}\n{}", time, format_number(value.y * flip))
                    } else {
                        format!("{}\n{}\n{}", name, time, format_number(value.y * flip))
                    }
                });
        }
        XScale::Category => {
            let categories = chart.categories.clone().unwrap_or_default();
            plot = plot.x_axis_formatter(move |mark, _range| category_label(&categories, mark.value));
        }
        XScale::Linear => {
            plot = plot.x_axis_formatter(|mark, _range| format_number(mark.value));
        }
    }

    let bar_series = prepared.series.iter().filter(|s| s.kind == SeriesKind::Bars).count();
    let bar_width = 0.8 / bar_series.max(1) as f64;

    plot.show(ui, |plot_ui| {
        let mut bar_idx = 0;
        for (idx, series) in prepared.series.iter().enumerate() {
            let color = series_color(idx);
            let name = series.label.clone();
            let data: Vec<[f64; 2]> = series.points.to_vec();

            match series.kind {
                SeriesKind::Line => plot_ui.line(Line::new(name, data).color(color)),
                SeriesKind::Points => plot_ui.points(Points::new(name, data).radius(3.0).color(color)),
                SeriesKind::LineAndPoints => {
                    plot_ui.line(Line::new(name.clone(), data.clone()).color(color));
                    plot_ui.points(Points::new(name, data).radius(3.0).color(color));
                }
                SeriesKind::Bars => {
                    let offset = (bar_idx as f64 - (bar_series - 1) as f64 / 2.0) * bar_width;
                    let bars: Vec<Bar> = data
                        .iter()
                        .map(|&[x, y]| Bar::new(x + offset, y).width(bar_width))
                        .collect();
                    plot_ui.bar_chart(BarChart::new(name, bars).color(color));
                    bar_idx += 1;
                }
            }
        }
    });

    if let Some(note) = &chart.note {
        ui.label(egui::RichText::new(note).italics().weak());
    }
}
