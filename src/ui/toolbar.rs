use std::fs;
use std::path::PathBuf;

use eframe::egui::{self, ComboBox};

use runlog_oxide::constants::config::CONFIG_FILE;
use runlog_oxide::{ExperimentConfig, presets};

use crate::app::ReportViewer;
use crate::state::ChartLayout;

fn pick_log() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter("Telemetry logs", &["csv", "parquet"])
        .pick_file()
}

/// Top toolbar: file and configuration actions plus display toggles
pub fn render_toolbar(app: &mut ReportViewer, ctx: &egui::Context, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        if ui.button("📂").on_hover_text("Open telemetry log").clicked() {
            if let Some(path) = pick_log() {
                app.load_file(path);
            }
        }

        if !app.state.recent_files.is_empty() {
            ComboBox::from_id_salt("recent_files")
                .selected_text("📋")
                .show_ui(ui, |ui| {
                    ui.label("Recent Files:");
                    ui.separator();
                    for path in app.state.recent_files.clone() {
                        let name = path
                            .file_name()
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or_else(|| path.display().to_string());
                        if ui.button(name).clicked() {
                            app.load_file(path);
                        }
                    }
                });
        }

        ui.separator();

        // Preset selection replaces the whole configuration
        let current = app.state.config.name.clone();
        ComboBox::from_id_salt("preset_select")
            .selected_text(format!("⚙ {}", current))
            .show_ui(ui, |ui| {
                for (name, description) in presets::catalog() {
                    if ui
                        .selectable_label(current == name, name)
                        .on_hover_text(description)
                        .clicked()
                    {
                        match presets::preset(name) {
                            Ok(config) => app.set_config(config),
                            Err(e) => app.state.ui.set_error(e.user_message()),
                        }
                    }
                }
            });

        if ui.button("Load config").on_hover_text("Load a JSON configuration").clicked() {
            if let Some(path) = rfd::FileDialog::new().add_filter("JSON", &["json"]).pick_file() {
                match ExperimentConfig::load(&path) {
                    Ok(config) => app.set_config(config),
                    Err(e) => app.state.ui.set_error(e.user_message()),
                }
            }
        }

        if ui.button("Save config").on_hover_text("Save the active configuration as JSON").clicked() {
            if let Some(path) = rfd::FileDialog::new()
                .add_filter("JSON", &["json"])
                .set_file_name(CONFIG_FILE)
                .save_file()
            {
                match app.state.config.save(&path) {
                    Ok(()) => app.state.ui.set_status(format!("Saved {}", path.display())),
                    Err(e) => app.state.ui.set_error(e.user_message()),
                }
            }
        }

        if let Some(report) = app.state.report.clone() {
            if ui.button("Export report").on_hover_text("Write the report as JSON").clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("JSON", &["json"])
                    .set_file_name(format!("{}-report.json", report.name))
                    .save_file()
                {
                    let written = report
                        .to_json()
                        .and_then(|json| fs::write(&path, json).map_err(Into::into));
                    match written {
                        Ok(()) => app.state.ui.set_status(format!("Exported {}", path.display())),
                        Err(e) => app.state.ui.set_error(e.user_message()),
                    }
                }
            }
        }

        ui.separator();

        let view = &mut app.state.view;
        ui.toggle_value(&mut view.show_grid, "⊞").on_hover_text("Grid (G)");
        ui.toggle_value(&mut view.show_legend, "☰").on_hover_text("Legend (L)");
        ui.toggle_value(&mut view.show_table, "▦").on_hover_text("Summary table (S)");
        let mut all = view.layout == ChartLayout::All;
        if ui.toggle_value(&mut all, "⊟").on_hover_text("Show all charts (A)").changed() {
            view.layout = if all { ChartLayout::All } else { ChartLayout::Single };
        }
        if ui.button("🔄").on_hover_text("Reset zoom (R)").clicked() {
            view.reset_bounds = true;
        }
        if ui.button("❓").on_hover_text("Help (H)").clicked() {
            view.show_help = !view.show_help;
        }
    });

    // Drag and drop
    let dropped = ctx.input(|i| i.raw.dropped_files.first().and_then(|f| f.path.clone()));
    if let Some(path) = dropped {
        app.load_file(path);
    }
}
