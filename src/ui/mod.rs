mod chart;
mod help_dialog;
mod summary_table;
mod toolbar;

pub use chart::render_chart;
pub use help_dialog::render_help_dialog;
pub use summary_table::render_table_panel;
pub use toolbar::render_toolbar;
