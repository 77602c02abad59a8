use eframe::egui::{self, ComboBox};
use egui_extras::{Column, TableBuilder};

use runlog_oxide::aggregate::Summary;
use runlog_oxide::constants::layout::{TABLE_HEADER_HEIGHT, TABLE_ROW_HEIGHT};
use runlog_oxide::pipeline::{Report, format_value};

use crate::state::{AppState, TablePanel};

/// Tab-separated text of a summary, header first
pub fn summary_tsv(summary: &Summary) -> String {
    let mut out = String::new();
    let mut header = vec![summary.key_field().to_string()];
    header.extend(summary.columns().iter().cloned());
    out.push_str(&header.join("\t"));
    out.push('\n');

    for row in summary.rows() {
        let mut cells = vec![row.key.to_string()];
        cells.extend(row.values.iter().map(|v| match v {
            Some(v) => v.to_string(),
            None => String::new(),
        }));
        out.push_str(&cells.join("\t"));
        out.push('\n');
    }
    out
}

fn copy_to_clipboard(text: String) -> Result<(), arboard::Error> {
    arboard::Clipboard::new()?.set_text(text)
}

/// Bottom panel: summary tables, field statistics and dropped rows
pub fn render_table_panel(state: &mut AppState, ui: &mut egui::Ui) {
    profiling::scope!("render_table_panel");

    let Some(report) = state.report.clone() else {
        return;
    };

    ui.horizontal(|ui| {
        ui.selectable_value(&mut state.view.table_panel, TablePanel::Summaries, "Summaries");
        ui.selectable_value(&mut state.view.table_panel, TablePanel::Fields, "Fields");
        ui.selectable_value(
            &mut state.view.table_panel,
            TablePanel::Dropped,
            format!("Dropped ({})", report.ingest.dropped.len()),
        );
    });
    ui.separator();

    let panel = state.view.table_panel;
    match panel {
        TablePanel::Summaries => render_summaries(state, &report, ui),
        TablePanel::Fields => render_fields(&report, ui),
        TablePanel::Dropped => render_dropped(&report, ui),
    }
}

fn render_summaries(state: &mut AppState, report: &Report, ui: &mut egui::Ui) {
    if report.summaries.is_empty() {
        ui.weak("This configuration computes no summaries");
        return;
    }

    let idx = state.view.selected_summary.min(report.summaries.len() - 1);
    let named = &report.summaries[idx];
    let summary = &named.summary;

    ui.horizontal(|ui| {
        ComboBox::from_id_salt("summary_select")
            .selected_text(&named.id)
            .show_ui(ui, |ui| {
                for (i, s) in report.summaries.iter().enumerate() {
                    ui.selectable_value(&mut state.view.selected_summary, i, &s.id);
                }
            });
        ui.label(format!("{} groups by '{}'", summary.rows().len(), summary.key_field()));
        if ui.small_button("Copy").on_hover_text("Copy as tab-separated text").clicked() {
            match copy_to_clipboard(summary_tsv(summary)) {
                Ok(()) => state.ui.set_status(format!("Copied summary '{}'", named.id)),
                Err(e) => state.ui.set_error(format!("Clipboard error: {}", e)),
            }
        }
    });

    TableBuilder::new(ui)
        .id_salt("summary_table")
        .striped(true)
        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
        .column(Column::initial(100.0).resizable(true))
        .column(Column::initial(60.0))
        .columns(Column::initial(100.0).resizable(true).clip(true), summary.columns().len())
        .header(TABLE_HEADER_HEIGHT, |mut header| {
            header.col(|ui| {
                ui.strong(summary.key_field());
            });
            header.col(|ui| {
                ui.strong("n");
            });
            for column in summary.columns() {
                header.col(|ui| {
                    ui.strong(column);
                });
            }
        })
        .body(|body| {
            body.rows(TABLE_ROW_HEIGHT, summary.rows().len(), |mut row| {
                let Some(data) = summary.rows().get(row.index()) else {
                    return;
                };
                row.col(|ui| {
                    ui.label(data.key.to_string());
                });
                row.col(|ui| {
                    ui.label(data.members.to_string());
                });
                for value in &data.values {
                    row.col(|ui| {
                        ui.label(format_value(*value));
                    });
                }
            });
        });
}

fn render_fields(report: &Report, ui: &mut egui::Ui) {
    const HEADERS: [&str; 8] = ["Field", "Count", "Absent", "Mean", "Std Dev", "Median", "Min", "Max"];

    TableBuilder::new(ui)
        .id_salt("field_stats_table")
        .striped(true)
        .column(Column::initial(180.0).resizable(true))
        .columns(Column::initial(80.0).resizable(true), HEADERS.len() - 1)
        .header(TABLE_HEADER_HEIGHT, |mut header| {
            for title in HEADERS {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|body| {
            body.rows(TABLE_ROW_HEIGHT, report.ingest.field_stats.len(), |mut row| {
                let Some((name, stats)) = report.ingest.field_stats.get(row.index()) else {
                    return;
                };
                let cells = [
                    name.clone(),
                    stats.count.to_string(),
                    stats.absent.to_string(),
                    format_value(stats.mean),
                    format_value(stats.std_dev),
                    format_value(stats.median),
                    format_value(stats.min),
                    format_value(stats.max),
                ];
                for cell in cells {
                    row.col(|ui| {
                        ui.label(cell);
                    });
                }
            });
        });
}

fn render_dropped(report: &Report, ui: &mut egui::Ui) {
    let ingest = &report.ingest;
    ui.label(format!(
        "{} of {} rows ingested, {} invalid timestamps, {} out of time order",
        ingest.records, ingest.rows, ingest.invalid_timestamps, ingest.out_of_order
    ));
    if ingest.dropped.is_empty() {
        return;
    }

    TableBuilder::new(ui)
        .id_salt("dropped_rows_table")
        .striped(true)
        .column(Column::initial(60.0))
        .column(Column::initial(160.0).resizable(true))
        .column(Column::remainder().clip(true))
        .header(TABLE_HEADER_HEIGHT, |mut header| {
            for title in ["Row", "Column", "Text"] {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|body| {
            body.rows(TABLE_ROW_HEIGHT, ingest.dropped.len(), |mut row| {
                let Some(dropped) = ingest.dropped.get(row.index()) else {
                    return;
                };
                row.col(|ui| {
                    // Data rows are numbered after the header line
                    ui.label((dropped.row + 1).to_string());
                });
                row.col(|ui| {
                    ui.label(&dropped.column);
                });
                row.col(|ui| {
                    ui.monospace(&dropped.text);
                });
            });
        });
}
