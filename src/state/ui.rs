//! Transient UI state: errors and status text

#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// Error message shown in the status bar
    pub error_message: Option<String>,

    /// Short status line, e.g. the last copy action
    pub status: Option<String>,
}

impl UiState {
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }
}
