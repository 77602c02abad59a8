use crate::state::ViewState;

pub fn render_help_dialog(view: &mut ViewState, ctx: &eframe::egui::Context) {
    if view.show_help {
        eframe::egui::Window::new("⌨ Keyboard Shortcuts")
            .anchor(eframe::egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .collapsible(false)
            .show(ctx, |ui| {
                ui.heading("View");
                ui.label("R - Reset zoom");
                ui.label("G - Toggle grid");
                ui.label("L - Toggle legend");
                ui.label("T - Toggle dark/light theme");
                ui.label("S - Toggle summary table");
                ui.label("A - Show all charts / selected chart");
                ui.label("Up / Down - Previous / next chart");
                ui.label("H / F1 - Toggle help");
                ui.label("ESC - Close help");

                ui.separator();
                ui.heading("Mouse Controls");
                ui.label("Scroll - Zoom in/out");
                ui.label("Drag - Pan view");
                ui.label("Double-click - Reset view");

                ui.separator();
                ui.heading("Files");
                ui.label("Drop a CSV or Parquet log on the window to load it");
                ui.label("The active configuration is re-applied when it changes");

                ui.separator();
                if ui.button("Close").clicked() {
                    view.show_help = false;
                }
            });
    }
}
