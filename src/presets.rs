//! Built-in experiment configurations for the telemetry logs written by the
//! simulation programs (`stats.csv`, one row per sampling tick)

use crate::aggregate::Reduction;
use crate::compose::{Axis, ChartSpec, SeriesKind, SeriesSpec, XSource, YSource};
use crate::config::{ExperimentConfig, SummarySpec};
use crate::constants::columns::{DEFAULT_TIMESTAMP, METHOD};
use crate::data::FieldMapping;
use crate::derive::DerivationRule;
use crate::error::{PipelineError, Result};

type Builder = fn() -> ExperimentConfig;

const PRESETS: &[(&str, &str, Builder)] = &[
    ("clicks", "Clicks over time and mouse trajectory", clicks),
    ("hull", "Convex hull point counts against memory use", hull),
    ("minkowski", "Minkowski sum time by points amount", minkowski),
    ("cost", "Mean time to finish by start points and by obstacles", cost),
    ("steps", "Agent steps against planned path length", steps),
    ("methods", "Final totals per collision-avoidance method", methods),
];

/// Names of all built-in presets
pub fn names() -> impl Iterator<Item = &'static str> {
    PRESETS.iter().map(|(name, _, _)| *name)
}

/// `(name, description)` for every preset
pub fn catalog() -> impl Iterator<Item = (&'static str, &'static str)> {
    PRESETS.iter().map(|(name, description, _)| (*name, *description))
}

pub fn preset(name: &str) -> Result<ExperimentConfig> {
    PRESETS
        .iter()
        .find(|(n, _, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, _, build)| build())
        .ok_or_else(|| PipelineError::UnknownPreset {
            name: name.to_string(),
        })
}

fn clicks() -> ExperimentConfig {
    let fields = FieldMapping::new(
        DEFAULT_TIMESTAMP,
        ["clicks_on_dots", "clicks_on_lines", "number_of_clicks", "mouse_x", "mouse_y"],
    );
    ExperimentConfig::new("clicks", fields)
        .describe("Clicks over time and mouse trajectory")
        .chart(
            ChartSpec::new("clicks_over_time", "Clicks over Time")
                .labels("Timestamp", "Clicks")
                .series(SeriesSpec::over_time("Clicks on Dots", "clicks_on_dots"))
                .series(SeriesSpec::over_time("Clicks on Lines", "clicks_on_lines"))
                .series(SeriesSpec::over_time("Total Clicks", "number_of_clicks")),
        )
        .chart(
            ChartSpec::new("mouse_trajectory", "Mouse Trajectory")
                .labels("Mouse X", "Mouse Y")
                .series(
                    SeriesSpec::new(
                        "Mouse",
                        XSource::Field("mouse_x".into()),
                        YSource::Field("mouse_y".into()),
                    )
                    .kind(SeriesKind::LineAndPoints),
                )
                // Screen coordinates grow downwards
                .invert_y(),
        )
}

fn hull() -> ExperimentConfig {
    let fields = FieldMapping::new(
        DEFAULT_TIMESTAMP,
        ["points_on_hull", "points_inside_hull", "memory_kb"],
    );
    ExperimentConfig::new("hull", fields)
        .describe("Convex hull point counts against memory use")
        .chart(
            ChartSpec::new("points_and_memory", "Points and Memory Usage Over Time")
                .labels("Timestamp", "Points")
                .secondary_label("Memory (KB)")
                .series(SeriesSpec::over_time("Points on Hull", "points_on_hull").kind(SeriesKind::LineAndPoints))
                .series(
                    SeriesSpec::over_time("Points Inside Hull", "points_inside_hull")
                        .kind(SeriesKind::LineAndPoints),
                )
                .series(
                    SeriesSpec::over_time("Memory (KB)", "memory_kb")
                        .on(Axis::Secondary)
                        .kind(SeriesKind::LineAndPoints),
                ),
        )
}

fn minkowski() -> ExperimentConfig {
    let fields = FieldMapping::new(DEFAULT_TIMESTAMP, ["points_amount", "time_to_finish_in_micros"]);
    ExperimentConfig::new("minkowski", fields)
        .describe("Minkowski sum time by points amount")
        .chart(
            ChartSpec::new("minkowski_time", "Minkowski Sum Time by Points Amount")
                .labels("Points Amount", "Minkowski Sum Time to Finish")
                .series(
                    SeriesSpec::new(
                        "Minkowski Sum Time",
                        XSource::Field("points_amount".into()),
                        YSource::Field("time_to_finish_in_micros".into()),
                    )
                    .kind(SeriesKind::LineAndPoints),
                ),
        )
}

fn cost() -> ExperimentConfig {
    let fields = FieldMapping::new(
        DEFAULT_TIMESTAMP,
        ["start_points", "obstacles_amount", "time_to_finish_in_micros"],
    );
    let mean_time = || Reduction::Mean {
        field: "time_to_finish_in_micros".into(),
    };
    let by = |id: &str, title: &str, x_label: &str, label: &str| {
        ChartSpec::new(id, title)
            .labels(x_label, "Time to Finish (\u{3bc}s)")
            .series(
                SeriesSpec::new(
                    label,
                    XSource::GroupKey,
                    YSource::Field("time_to_finish_in_micros".into()),
                )
                .from_summary(id)
                .kind(SeriesKind::LineAndPoints),
            )
            .link_group("cost")
    };

    ExperimentConfig::new("cost", fields)
        .describe("Mean time to finish by start points and by obstacles")
        .summary(SummarySpec::new("by_start_points", "start_points", mean_time()).ascending())
        .summary(SummarySpec::new("by_obstacles", "obstacles_amount", mean_time()).ascending())
        .chart(by(
            "by_start_points",
            "Computational Cost by Start Points",
            "Start Points",
            "Avg Time per Start Points",
        ))
        .chart(by(
            "by_obstacles",
            "Computational Cost by Obstacles",
            "Obstacles Amount",
            "Avg Time per Obstacles",
        ))
}

fn steps() -> ExperimentConfig {
    let fields = FieldMapping::new(
        DEFAULT_TIMESTAMP,
        [
            "how_many_steps_agents_made",
            "total_agents_path_length",
            "how_many_recalculations",
            "how_many_detections",
        ],
    );
    ExperimentConfig::new("steps", fields)
        .describe("Agent steps against planned path length")
        .derive(DerivationRule::clipped_difference(
            "extra_steps",
            "how_many_steps_agents_made",
            "total_agents_path_length",
        ))
        .chart(
            ChartSpec::new("steps_vs_path", "Steps vs. Planned Path")
                .labels("Time", "Steps")
                .series(SeriesSpec::over_time("Actual steps", "how_many_steps_agents_made"))
                .series(SeriesSpec::over_time("Baseline (A*)", "total_agents_path_length"))
                .note(
                    "Temporal evolution of collision detections and path recalculations. \
                     Recalculations remain bounded, indicating stable collision resolution behavior.",
                ),
        )
        .chart(
            ChartSpec::new("extra_steps", "Extra Steps")
                .labels("Time", "Extra steps")
                .series(SeriesSpec::over_time("Extra steps", "extra_steps")),
        )
        .chart(
            ChartSpec::new("recalculations", "Collisions vs. Recalculations")
                .labels("Time", "Count")
                .series(SeriesSpec::over_time("Recalculations", "how_many_recalculations"))
                .series(SeriesSpec::over_time("Collision detections", "how_many_detections")),
        )
}

fn methods() -> ExperimentConfig {
    let fields = FieldMapping::new(
        DEFAULT_TIMESTAMP,
        [
            "collisions",
            "recalculations",
            "total_steps",
            "total_path_length",
            "actual_distance",
            "reached_goal_count",
        ],
    )
    .with_categorical([METHOD]);

    let bars = |id: &str, title: &str, y_label: &str, y: YSource| {
        ChartSpec::new(id, title).labels("Method", y_label).series(
            SeriesSpec::new(y_label, XSource::GroupKey, y)
                .from_summary("final")
                .kind(SeriesKind::Bars),
        )
    };

    ExperimentConfig::new("methods", fields)
        .describe("Final totals per collision-avoidance method")
        .summary(SummarySpec::new("final", METHOD, Reduction::Last).include(["GRID", "PATH", "ORCA"]))
        .chart(bars(
            "collisions",
            "Total Collisions Comparison",
            "Total Collisions",
            YSource::Field("collisions".into()),
        ))
        .chart(bars(
            "total_steps",
            "Computational Cost Comparison",
            "Total Simulation Steps",
            YSource::Field("total_steps".into()),
        ))
        .chart(bars(
            "path_efficiency",
            "Path Quality Comparison",
            "Path Efficiency (planned / actual)",
            YSource::Ratio {
                numerator: "total_path_length".into(),
                denominator: "actual_distance".into(),
            },
        ))
        .chart(bars(
            "actual_distance",
            "Total Distance Traveled",
            "Actual Distance Traveled",
            YSource::Field("actual_distance".into()),
        ))
}
