//! Viewer state
//!
//! Split into focused parts: what is loaded, how it is displayed, and
//! transient UI feedback.

mod ui;
mod view;

pub use ui::UiState;
pub use view::{ChartLayout, TablePanel, ViewState};

use std::path::PathBuf;
use std::sync::Arc;

use runlog_oxide::ExperimentConfig;
use runlog_oxide::compose::Chart;
use runlog_oxide::pipeline::Report;

use crate::perf::PreparedChart;

const MAX_RECENT_FILES: usize = 8;

pub struct AppState {
    /// Configuration applied to every loaded log
    pub config: ExperimentConfig,

    /// Last finished report and its plot-ready data
    pub report: Option<Arc<Report>>,
    pub prepared: Vec<PreparedChart>,

    pub view: ViewState,
    pub ui: UiState,

    /// Log the report was built from
    pub current_file: Option<PathBuf>,
    pub recent_files: Vec<PathBuf>,

    /// A run is queued on the worker
    pub loading: bool,
}

impl AppState {
    pub fn new(config: ExperimentConfig) -> Self {
        Self {
            config,
            report: None,
            prepared: Vec::new(),
            view: ViewState::default(),
            ui: UiState::default(),
            current_file: None,
            recent_files: Vec::new(),
            loading: false,
        }
    }

    pub fn has_report(&self) -> bool {
        self.report.is_some()
    }

    /// Install a finished report
    pub fn set_report(&mut self, path: PathBuf, report: Arc<Report>, prepared: Vec<PreparedChart>) {
        self.view.on_report(report.charts.len(), report.summaries.len());
        self.report = Some(report);
        self.prepared = prepared;
        self.push_recent(path.clone());
        self.current_file = Some(path);
        self.loading = false;
        self.ui.clear_error();
    }

    fn push_recent(&mut self, path: PathBuf) {
        self.recent_files.retain(|p| *p != path);
        self.recent_files.insert(0, path);
        self.recent_files.truncate(MAX_RECENT_FILES);
    }

    pub fn selected_chart(&self) -> Option<(&Chart, &PreparedChart)> {
        let report = self.report.as_ref()?;
        let idx = self.view.selected_chart;
        Some((report.charts.get(idx)?, self.prepared.get(idx)?))
    }
}
