use std::path::PathBuf;

use eframe::App;
use eframe::egui::{self, CentralPanel, ScrollArea, SidePanel, TopBottomPanel};

use runlog_oxide::ExperimentConfig;
use runlog_oxide::constants::layout::{CHART_LIST_WIDTH, SUMMARY_PANEL_HEIGHT};

use crate::perf::{BackgroundWorker, WorkerRequest, WorkerResult};
use crate::state::{AppState, ChartLayout};
use crate::ui;

/// Height of each chart when all charts are stacked
const STACKED_CHART_HEIGHT: f32 = 320.0;

pub struct ReportViewer {
    pub state: AppState,
    worker: BackgroundWorker,
}

impl ReportViewer {
    pub fn new(config: ExperimentConfig, file: Option<PathBuf>) -> Self {
        let mut viewer = Self {
            state: AppState::new(config),
            worker: BackgroundWorker::spawn(),
        };
        if let Some(path) = file {
            viewer.load_file(path);
        }
        viewer
    }

    /// Queue a run of the active configuration over `path`
    pub fn load_file(&mut self, path: PathBuf) {
        tracing::info!(path = %path.display(), config = %self.state.config.name, "loading log");
        self.state.loading = true;
        self.state.ui.clear_error();
        self.worker.request(WorkerRequest::Run {
            path,
            config: Box::new(self.state.config.clone()),
            downsample: self.state.view.downsample_threshold,
        });
    }

    /// Switch configuration and re-run it over the current log
    pub fn set_config(&mut self, config: ExperimentConfig) {
        self.state.config = config;
        if let Some(path) = self.state.current_file.clone() {
            self.load_file(path);
        }
    }

    fn poll_worker(&mut self) {
        while let Some(result) = self.worker.poll() {
            match result {
                WorkerResult::Ready { path, report, charts } => {
                    self.state.set_report(path, report, charts);
                }
                WorkerResult::Failed { path, error } => {
                    self.state.loading = false;
                    self.state
                        .ui
                        .set_error(format!("{}: {}", error.title(), error.user_message()));
                    tracing::debug!(path = %path.display(), "load failed");
                }
            }
        }
        if !self.worker.is_busy() {
            self.state.loading = false;
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        let chart_count = self.state.report.as_ref().map_or(0, |r| r.charts.len());
        let view = &mut self.state.view;
        ctx.input(|i| {
            if i.key_pressed(egui::Key::R) {
                view.reset_bounds = true;
            }
            if i.key_pressed(egui::Key::G) {
                view.show_grid = !view.show_grid;
            }
            if i.key_pressed(egui::Key::L) {
                view.show_legend = !view.show_legend;
            }
            if i.key_pressed(egui::Key::T) {
                view.toggle_dark_mode();
            }
            if i.key_pressed(egui::Key::S) {
                view.show_table = !view.show_table;
            }
            if i.key_pressed(egui::Key::A) {
                view.layout = match view.layout {
                    ChartLayout::Single => ChartLayout::All,
                    ChartLayout::All => ChartLayout::Single,
                };
            }
            if i.key_pressed(egui::Key::ArrowDown) && view.selected_chart + 1 < chart_count {
                view.selected_chart += 1;
            }
            if i.key_pressed(egui::Key::ArrowUp) {
                view.selected_chart = view.selected_chart.saturating_sub(1);
            }
            if i.key_pressed(egui::Key::H) || i.key_pressed(egui::Key::F1) {
                view.show_help = !view.show_help;
            }
            if i.key_pressed(egui::Key::Escape) {
                view.show_help = false;
            }
        });
    }

    fn render_chart_list(&mut self, ui: &mut egui::Ui) {
        let Some(report) = self.state.report.clone() else {
            return;
        };

        ui.heading(&report.name);
        if !self.state.config.description.is_empty() {
            ui.weak(&self.state.config.description);
        }
        ui.separator();

        ScrollArea::vertical().show(ui, |ui| {
            for (idx, chart) in report.charts.iter().enumerate() {
                let selected = self.state.view.selected_chart == idx;
                let mut label = chart.title.clone();
                if chart.is_dual_axis() {
                    label.push_str(" ⇅");
                }
                let response = ui.selectable_label(selected, label);
                let response = match report.linked.iter().find(|l| l.charts.contains(&chart.id)) {
                    Some(link) => response.on_hover_text(format!("Shares its y-range with group '{}'", link.group)),
                    None => response,
                };
                if response.clicked() {
                    self.state.view.selected_chart = idx;
                    self.state.view.layout = ChartLayout::Single;
                }
            }
        });
    }

    fn render_charts(&mut self, ui: &mut egui::Ui) {
        let Some(report) = self.state.report.clone() else {
            ui.vertical_centered(|ui| {
                ui.add_space(40.0);
                if self.state.loading {
                    ui.spinner();
                    ui.label("Running pipeline...");
                } else {
                    ui.heading("No log loaded");
                    ui.label("Open a CSV or Parquet telemetry log, or drop one on the window");
                    ui.weak(format!("Configuration: {}", self.state.config.name));
                }
            });
            return;
        };

        match self.state.view.layout {
            ChartLayout::Single => {
                if let Some((chart, prepared)) = self.state.selected_chart() {
                    let height = ui.available_height() - 40.0;
                    ui::render_chart(ui, chart, prepared, &self.state.view, height);
                }
            }
            ChartLayout::All => {
                ScrollArea::vertical().show(ui, |ui| {
                    for (chart, prepared) in report.charts.iter().zip(&self.state.prepared) {
                        ui::render_chart(ui, chart, prepared, &self.state.view, STACKED_CHART_HEIGHT);
                        ui.separator();
                    }
                });
            }
        }
        self.state.view.reset_bounds = false;
    }

    fn render_status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if let Some(file) = &self.state.current_file {
                if let Some(name) = file.file_name() {
                    ui.label(format!("📁 {}", name.to_string_lossy()))
                        .on_hover_text(file.display().to_string());
                    ui.separator();
                }
            }
            if let Some(report) = &self.state.report {
                let ingest = &report.ingest;
                ui.label(format!("Records: {} / {}", ingest.records, ingest.rows));
                if !ingest.dropped.is_empty() {
                    ui.separator();
                    ui.label(format!("Dropped: {}", ingest.dropped.len()));
                }
                if ingest.out_of_order > 0 {
                    ui.separator();
                    ui.colored_label(egui::Color32::YELLOW, format!("Out of order: {}", ingest.out_of_order))
                        .on_hover_text("Timestamps go backwards; \"last\" summaries use the latest timestamp");
                }
                ui.separator();
                ui.label(format!("Charts: {}", report.charts.len()));
            }
            if self.state.loading {
                ui.separator();
                ui.spinner();
            }
            if let Some(error) = &self.state.ui.error_message {
                ui.separator();
                ui.colored_label(egui::Color32::RED, error);
            } else if let Some(status) = &self.state.ui.status {
                ui.separator();
                ui.weak(status);
            }
        });
    }
}

impl App for ReportViewer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        profiling::finish_frame!();
        profiling::scope!("update");

        self.poll_worker();
        if self.state.loading {
            ctx.request_repaint();
        }

        if self.state.view.dark_mode {
            ctx.set_visuals(egui::Visuals::dark());
        } else {
            ctx.set_visuals(egui::Visuals::light());
        }
        self.handle_shortcuts(ctx);

        TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui::render_toolbar(self, ctx, ui);
        });

        TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            self.render_status_bar(ui);
        });

        if self.state.view.show_table && self.state.has_report() {
            TopBottomPanel::bottom("summary_panel")
                .resizable(true)
                .default_height(SUMMARY_PANEL_HEIGHT)
                .show(ctx, |ui| {
                    ui::render_table_panel(&mut self.state, ui);
                });
        }

        if self.state.has_report() {
            SidePanel::left("chart_list")
                .resizable(true)
                .default_width(CHART_LIST_WIDTH)
                .show(ctx, |ui| {
                    self.render_chart_list(ui);
                });
        }

        CentralPanel::default().show(ctx, |ui| {
            self.render_charts(ui);
        });

        ui::render_help_dialog(&mut self.state.view, ctx);
    }
}
