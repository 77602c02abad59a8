//! View and display state

use runlog_oxide::constants::performance::DOWNSAMPLE_THRESHOLD;

/// Which chart(s) the central panel shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartLayout {
    /// The selected chart fills the panel
    #[default]
    Single,
    /// Every chart, stacked
    All,
}

/// Bottom panel content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TablePanel {
    #[default]
    Summaries,
    Fields,
    Dropped,
}

#[derive(Debug, Clone)]
pub struct ViewState {
    pub dark_mode: bool,
    pub show_grid: bool,
    pub show_legend: bool,
    pub show_table: bool,
    pub show_help: bool,

    /// Reset zoom bounds on the next frame
    pub reset_bounds: bool,

    pub layout: ChartLayout,
    pub table_panel: TablePanel,

    /// Index into the report's charts
    pub selected_chart: usize,
    /// Index into the report's summaries
    pub selected_summary: usize,

    /// Series longer than this are downsampled before drawing
    pub downsample_threshold: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            dark_mode: true,
            show_grid: true,
            show_legend: true,
            show_table: true,
            show_help: false,
            reset_bounds: false,
            layout: ChartLayout::default(),
            table_panel: TablePanel::default(),
            selected_chart: 0,
            selected_summary: 0,
            downsample_threshold: DOWNSAMPLE_THRESHOLD,
        }
    }
}

impl ViewState {
    pub fn toggle_dark_mode(&mut self) {
        self.dark_mode = !self.dark_mode;
    }

    /// Forget per-report selections after a new report arrives
    pub fn on_report(&mut self, charts: usize, summaries: usize) {
        self.selected_chart = self.selected_chart.min(charts.saturating_sub(1));
        self.selected_summary = self.selected_summary.min(summaries.saturating_sub(1));
        self.reset_bounds = true;
    }
}
