//! Shared state types for the egui UI.

use crate::diagnostics::SystemInfo;
use crate::egui_app::ui::style::{self, StatusTone};
use egui::Color32;

/// Top-level UI model consumed by the egui renderer.
#[derive(Clone, Debug)]
pub struct UiState {
    pub status: StatusBarState,
    pub failure_report: FailureReportUiState,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            status: StatusBarState::idle(),
            failure_report: FailureReportUiState::default(),
        }
    }
}

/// Status badge + text shown in the footer.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusBarState {
    pub text: String,
    pub badge_label: String,
    pub badge_color: Color32,
}

impl StatusBarState {
    pub fn idle() -> Self {
        Self::new("Ready", StatusTone::Idle)
    }

    pub fn new(text: impl Into<String>, tone: StatusTone) -> Self {
        Self {
            text: text.into(),
            badge_label: tone.label().into(),
            badge_color: style::status_badge_color(tone),
        }
    }
}

/// Lifecycle of a single report submission.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SubmissionStatus {
    #[default]
    Idle,
    Submitting,
    Success,
    Error,
}

/// UI state for the "Report a failure" modal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FailureReportUiState {
    /// Whether the modal is visible.
    pub open: bool,
    /// What the user says went wrong.
    pub description: String,
    pub status: SubmissionStatus,
    /// Hosted issue URL, or the pre-filled link that was opened.
    pub derived_issue_url: Option<String>,
    /// Diagnostics for this open; `None` while collection is pending.
    pub system_info: Option<SystemInfo>,
    /// Error lines scraped from recent logs.
    pub recent_errors: Vec<String>,
    /// Blocking notice shown when submission is refused before dispatch.
    pub validation_notice: Option<String>,
    /// Failure detail shown next to the manual report link.
    pub last_error: Option<String>,
    /// Confirmation text shown after a successful submission.
    pub success_message: Option<String>,
    /// Whether to focus the description field on the next frame.
    pub focus_description_requested: bool,
}

impl FailureReportUiState {
    pub fn is_submitting(&self) -> bool {
        self.status == SubmissionStatus::Submitting
    }

    pub fn diagnostics_loading(&self) -> bool {
        self.system_info.is_none()
    }

    /// Whether the submit button should be enabled.
    pub fn can_submit(&self) -> bool {
        !self.is_submitting()
            && self.status != SubmissionStatus::Success
            && !self.description.trim().is_empty()
    }
}
