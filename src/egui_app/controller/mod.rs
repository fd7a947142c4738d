//! Controller bridging the failure report flow to the egui renderer.

mod background_jobs;
mod failure_report;
pub(crate) mod jobs;

use std::sync::Arc;

use crate::egui_app::state::{StatusBarState, UiState};
use crate::egui_app::ui::style::StatusTone;
use crate::services::ReportServices;
use crate::settings::ReporterSettings;

pub use failure_report::{EMPTY_DESCRIPTION_NOTICE, SubmitError};

/// Maintains app state and dispatches background work for the UI.
pub struct EguiController {
    pub ui: UiState,
    settings: ReporterSettings,
    services: Arc<dyn ReportServices>,
    jobs: jobs::ControllerJobs,
    /// Bumped on every open; results tagged with an older value are stale.
    report_generation: u64,
}

impl EguiController {
    pub fn new(settings: ReporterSettings, services: Arc<dyn ReportServices>) -> Self {
        Self {
            ui: UiState::default(),
            settings,
            services,
            jobs: jobs::ControllerJobs::new(),
            report_generation: 0,
        }
    }

    pub fn settings(&self) -> &ReporterSettings {
        &self.settings
    }

    /// Update the footer status text and badge.
    pub fn set_status(&mut self, text: impl Into<String>, tone: StatusTone) {
        self.ui.status = StatusBarState::new(text, tone);
    }

    /// True while any background job has not reported back yet.
    pub fn has_pending_jobs(&self) -> bool {
        self.jobs.any_in_progress()
    }
}
