//! Observable state of the injected controls.
//!
//! The controller mutates this together with the session in the same event
//! turn and hands a snapshot to [`crate::page::HostPage::render`].

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    #[default]
    None,
    Success,
    Error,
    Syncing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Status {
    pub message: String,
    pub kind: StatusKind,
}

impl Status {
    pub fn new(message: impl Into<String>, kind: StatusKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.message.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UiState {
    /// Controls have been attached to the host page
    pub controls_installed: bool,
    /// Toggle shows "Live" and the restore/sync buttons are visible
    pub active: bool,
    /// Foreign stream currently embedded
    pub foreign_id: Option<String>,
    /// Platform of the embedded content, used as the toggle label
    pub foreign_name: String,
    /// Auto-sync checkbox
    pub auto_sync: bool,
    /// Pre-filled input when nothing was remembered for this channel
    pub suggestion: Option<String>,
    pub status: Status,
}

impl UiState {
    pub fn set_status(&mut self, message: impl Into<String>, kind: StatusKind) {
        self.status = Status::new(message, kind);
    }

    pub fn clear_status(&mut self) {
        self.status = Status::default();
    }
}
