//! End-to-end run: parse, derive, summarize and compose one telemetry table

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::aggregate::{Summary, group_by};
use crate::compose::{Chart, LinkedBounds, Sources, compose};
use crate::config::{ExperimentConfig, SummarySpec};
use crate::data::stats::field_stats;
use crate::data::{DroppedRow, FieldSource, RawTable, Stats, parse_table};
use crate::derive::derive;
use crate::error::Result;

/// What ingestion kept, dropped and flagged
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    /// Rows in the raw table
    pub rows: usize,
    /// Records that survived parsing
    pub records: usize,
    pub dropped: Vec<DroppedRow>,
    pub invalid_timestamps: usize,
    /// Records older than a record before them
    pub out_of_order: usize,
    /// Descriptive statistics of every numeric and derived field
    pub field_stats: Vec<(String, Stats)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedSummary {
    pub id: String,
    #[serde(flatten)]
    pub summary: Summary,
}

/// Everything a renderer needs, serializable as JSON
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub name: String,
    pub ingest: IngestReport,
    pub summaries: Vec<NamedSummary>,
    pub charts: Vec<Chart>,
    pub linked: Vec<LinkedBounds>,
}

impl Report {
    pub fn summary(&self, id: &str) -> Option<&Summary> {
        self.summaries.iter().find(|s| s.id == id).map(|s| &s.summary)
    }

    pub fn chart(&self, id: &str) -> Option<&Chart> {
        self.charts.iter().find(|c| c.id == id)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn summarize_spec<S: FieldSource + ?Sized>(source: &S, spec: &SummarySpec) -> Result<Summary> {
    let grouping = group_by(source, &spec.key, spec.order)?;
    let grouping = match &spec.include {
        Some(keys) => grouping.retain_keys(keys),
        None => grouping,
    };
    grouping.reduce(source, &spec.reduction)
}

/// Run every stage of `config` over `table`
pub fn run(table: &RawTable, config: &ExperimentConfig) -> Result<Report> {
    profiling::scope!("pipeline::run");

    config.validate()?;

    let parsed = parse_table(table, &config.fields)?;
    let enriched = derive(&parsed.records, &config.derivations)?;

    let summaries = config
        .summaries
        .iter()
        .map(|spec| {
            let summary = summarize_spec(&enriched, spec)?;
            debug!(id = %spec.id, groups = summary.len(), "summarized");
            Ok(NamedSummary {
                id: spec.id.clone(),
                summary,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let sources = summaries
        .iter()
        .fold(Sources::new(&enriched), |sources, s| sources.with_summary(&s.id, &s.summary));
    let composition = compose(&config.charts, &sources)?;

    let ingest = IngestReport {
        rows: table.height(),
        records: parsed.records.len(),
        invalid_timestamps: parsed.invalid_timestamps,
        out_of_order: parsed.out_of_order,
        field_stats: field_stats(&enriched),
        dropped: parsed.dropped,
    };
    info!(
        experiment = %config.name,
        records = ingest.records,
        dropped = ingest.dropped.len(),
        charts = composition.charts.len(),
        "pipeline finished"
    );

    Ok(Report {
        name: config.name.clone(),
        ingest,
        summaries,
        charts: composition.charts,
        linked: composition.linked,
    })
}

/// Load a CSV or Parquet log and run `config` over it
pub fn run_file(path: &Path, config: &ExperimentConfig) -> Result<Report> {
    let table = RawTable::load(path)?;
    run(&table, config)
}

/// Compact display of a reduced value; absent values show as `-`
pub fn format_value(value: Option<f64>) -> String {
    match value {
        None => "-".to_string(),
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", v as i64),
        Some(v) => format!("{:.4}", v),
    }
}

/// Render every summary as an aligned text table
pub fn render_summary_text(report: &Report) -> String {
    let mut out = String::new();
    let ingest = &report.ingest;
    let _ = writeln!(
        out,
        "{}: {} of {} rows ingested, {} dropped, {} invalid timestamps",
        report.name,
        ingest.records,
        ingest.rows,
        ingest.dropped.len(),
        ingest.invalid_timestamps
    );
    if ingest.out_of_order > 0 {
        let _ = writeln!(out, "warning: {} records are out of time order", ingest.out_of_order);
    }

    for named in &report.summaries {
        let summary = &named.summary;
        let _ = writeln!(out, "\n{} (by {}):", named.id, summary.key_field());

        let mut header = vec![summary.key_field().to_string()];
        header.extend(summary.columns().iter().cloned());
        let rows: Vec<Vec<String>> = summary
            .rows()
            .iter()
            .map(|row| {
                let mut cells = vec![row.key.to_string()];
                cells.extend(row.values.iter().map(|v| format_value(*v)));
                cells
            })
            .collect();

        let widths: Vec<usize> = (0..header.len())
            .map(|col| {
                rows.iter()
                    .map(|r| r[col].len())
                    .chain(std::iter::once(header[col].len()))
                    .max()
                    .unwrap_or_default()
            })
            .collect();

        for line in std::iter::once(&header).chain(rows.iter()) {
            let cells: Vec<String> = line
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(i, (cell, w))| {
                    if i == 0 {
                        format!("{:<w$}", cell, w = w)
                    } else {
                        format!("{:>w$}", cell, w = w)
                    }
                })
                .collect();
            let _ = writeln!(out, "{}", cells.join("  ").trim_end());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Reduction;
    use crate::compose::{ChartSpec, SeriesSpec, XSource, YSource};
    use crate::data::{FieldMapping, GroupKey};
    use crate::presets::preset;

    fn methods_table() -> RawTable {
        RawTable::from_pairs(vec![
            vec![("timestamp", "2024-01-15 14:30:01.000000000 -03:00"), ("method_name", "GRID"), ("collisions", "3"), ("total_path_length", "10"), ("actual_distance", "8")],
            vec![("timestamp", "2024-01-15 14:30:02.000000000 -03:00"), ("method_name", "GRID"), ("collisions", "5"), ("total_path_length", "12"), ("actual_distance", "4")],
            vec![("timestamp", "2024-01-15 14:30:01.000000000 -03:00"), ("method_name", "PATH"), ("collisions", "1"), ("total_path_length", "12"), ("actual_distance", "0")],
            vec![("timestamp", "2024-01-15 14:30:01.000000000 -03:00"), ("method_name", "RVO"), ("collisions", "9"), ("total_path_length", "1"), ("actual_distance", "1")],
            vec![("timestamp", "2024-01-15 14:30:03.000000000 -03:00"), ("method_name", "PATH"), ("collisions", "oops"), ("total_path_length", "1"), ("actual_distance", "1")],
        ])
    }

    #[test]
    fn test_methods_preset_end_to_end() {
        let report = run(&methods_table(), &preset("methods").unwrap()).unwrap();

        assert_eq!(report.ingest.rows, 5);
        assert_eq!(report.ingest.records, 4);
        assert_eq!(report.ingest.dropped.len(), 1);

        let last = report.summary("final").unwrap();
        let keys: Vec<String> = last.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["GRID", "PATH"]);
        assert_eq!(last.value(&GroupKey::Text("GRID".into()), "collisions"), Some(5.0));
        assert_eq!(last.value(&GroupKey::Text("PATH".into()), "collisions"), Some(1.0));

        let efficiency = report.chart("path_efficiency").unwrap();
        assert_eq!(efficiency.categories, Some(vec!["GRID".to_string(), "PATH".to_string()]));
        // PATH has zero actual distance, so only GRID gets a bar
        assert_eq!(efficiency.series[0].points.len(), 1);
        assert_eq!(efficiency.series[0].points[0].y, 3.0);
    }

    #[test]
    fn test_empty_table_yields_empty_series() {
        for name in crate::presets::names() {
            let report = run(&RawTable::default(), &preset(name).unwrap()).unwrap();
            assert_eq!(report.ingest.records, 0);
            assert!(report.charts.iter().all(|c| c.series.iter().all(|s| s.is_empty())));
        }
    }

    #[test]
    fn test_cost_preset_links_y_range() {
        let table = RawTable::from_pairs(vec![
            vec![("timestamp", "1700000000"), ("start_points", "5"), ("obstacles_amount", "1"), ("time_to_finish_in_micros", "10")],
            vec![("timestamp", "1700000001"), ("start_points", "5"), ("obstacles_amount", "2"), ("time_to_finish_in_micros", "20")],
            vec![("timestamp", "1700000002"), ("start_points", "2"), ("obstacles_amount", "2"), ("time_to_finish_in_micros", "30")],
        ]);
        let report = run(&table, &preset("cost").unwrap()).unwrap();

        // by start: 2 -> 30, 5 -> 15; by obstacles: 1 -> 10, 2 -> 25
        assert_eq!(report.linked.len(), 1);
        let bounds = report.linked[0].bounds.unwrap();
        assert_eq!((bounds.min, bounds.max), (10.0, 30.0));
        assert!(report.charts.iter().all(|c| c.y_bounds == Some(bounds)));
    }

    #[test]
    fn test_custom_config_with_mean() {
        let table = RawTable::from_pairs(vec![
            vec![("timestamp", "2024-01-01 00:00:01"), ("k", "a"), ("v", "10")],
            vec![("timestamp", "2024-01-01 00:00:02"), ("k", "a"), ("v", "20")],
            vec![("timestamp", "2024-01-01 00:00:03"), ("k", "a"), ("v", "30")],
        ]);
        let config = ExperimentConfig::new("mean", FieldMapping::new("timestamp", ["v"]).with_categorical(["k"]))
            .summary(SummarySpec::new("by_k", "k", Reduction::Mean { field: "v".into() }))
            .chart(ChartSpec::new("means", "Means").series(
                SeriesSpec::new("v", XSource::GroupKey, YSource::Field("v".into())).from_summary("by_k"),
            ));

        let report = run(&table, &config).unwrap();
        assert_eq!(report.summary("by_k").unwrap().rows()[0].values, vec![Some(20.0)]);

        let text = render_summary_text(&report);
        assert!(text.contains("by_k (by k):"));
        assert!(text.lines().any(|l| l.starts_with('a') && l.ends_with("20")));

        let json = report.to_json().unwrap();
        assert!(json.contains("\"by_k\""));
    }

    #[test]
    fn test_last_per_method_over_tick_timestamps() {
        let table = RawTable::from_pairs(vec![
            vec![("t", "1"), ("method", "GRID"), ("collisions", "3")],
            vec![("t", "2"), ("method", "GRID"), ("collisions", "5")],
            vec![("t", "1"), ("method", "PATH"), ("collisions", "1")],
            vec![("t", "soon"), ("method", "ORCA"), ("collisions", "7")],
        ]);
        let config = ExperimentConfig::new(
            "ticks",
            FieldMapping::new("t", ["collisions"]).with_categorical(["method"]),
        )
        .summary(SummarySpec::new("final", "method", Reduction::Last));

        let report = run(&table, &config).unwrap();
        assert_eq!(report.ingest.invalid_timestamps, 1);

        let last = report.summary("final").unwrap();
        assert_eq!(last.value(&GroupKey::Text("GRID".into()), "collisions"), Some(5.0));
        assert_eq!(last.value(&GroupKey::Text("PATH".into()), "collisions"), Some(1.0));
        assert_eq!(last.value(&GroupKey::Text("ORCA".into()), "collisions"), None);
        assert_eq!(last.rows()[2].timed_members, 0);

        let json = report.to_json().unwrap();
        assert!(json.contains("\"timed_members\": 0"));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(None), "-");
        assert_eq!(format_value(Some(5.0)), "5");
        assert_eq!(format_value(Some(0.5)), "0.5000");
    }
}
