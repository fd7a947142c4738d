use super::EguiController;
use super::jobs::{Delivery, SubmissionJob};
use crate::backend::BackendError;
use crate::diagnostics::SystemInfo;
use crate::egui_app::state::{FailureReportUiState, SubmissionStatus};
use crate::egui_app::ui::style::StatusTone;
use crate::github::issues::{self, CreateIssueError, IssueLinkError};
use crate::report::FailureReport;
use crate::settings::{DEFAULT_REPOSITORY, ReportStrategy};

/// Notice shown when the user tries to submit without describing the failure.
pub const EMPTY_DESCRIPTION_NOTICE: &str = "Please describe the failure before submitting.";

/// Why a report could not be delivered.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("{0}")]
    Backend(#[from] BackendError),
    #[error("{0}")]
    GithubApi(#[from] CreateIssueError),
    #[error("Could not open the browser: {0}")]
    OpenUrl(String),
    #[error("{0}")]
    IssueLink(#[from] IssueLinkError),
}

impl EguiController {
    /// Mirror an externally driven open flag, acting only on transitions.
    pub fn sync_open(&mut self, is_open: bool) {
        match (self.ui.failure_report.open, is_open) {
            (false, true) => self.open_failure_report(),
            (true, false) => {
                self.request_close();
            }
            _ => {}
        }
    }

    /// Open the modal, resetting the form and starting diagnostics collection.
    ///
    /// Opening an already open modal changes nothing.
    pub fn open_failure_report(&mut self) {
        if self.ui.failure_report.open {
            return;
        }
        self.report_generation += 1;
        self.ui.failure_report = FailureReportUiState {
            open: true,
            focus_description_requested: true,
            ..FailureReportUiState::default()
        };
        tracing::debug!(
            "Failure report opened (generation {})",
            self.report_generation
        );
        self.jobs
            .begin_diagnostics(self.report_generation, self.services.clone());
        self.jobs
            .begin_recent_errors(self.report_generation, self.services.clone());
    }

    /// Close the modal unless a submission is in flight. Returns whether it closed.
    pub fn request_close(&mut self) -> bool {
        if !self.ui.failure_report.open {
            return true;
        }
        if self.ui.failure_report.is_submitting() {
            tracing::debug!("Ignoring close request while a report is submitting");
            return false;
        }
        self.report_generation += 1;
        self.ui.failure_report = FailureReportUiState::default();
        self.jobs.clear_diagnostics();
        self.jobs.clear_recent_errors();
        true
    }

    /// Validate the description and dispatch the report using the configured strategy.
    pub fn submit_failure_report(&mut self) {
        let state = &self.ui.failure_report;
        if !state.open || state.is_submitting() {
            return;
        }
        let system_info = state
            .system_info
            .clone()
            .unwrap_or_else(|| SystemInfo::unavailable(&self.services.platform()));
        let Some(report) = FailureReport::new(
            &state.description,
            system_info,
            state.recent_errors.clone(),
            crate::logging::now_local_or_utc(),
        ) else {
            self.ui.failure_report.validation_notice = Some(EMPTY_DESCRIPTION_NOTICE.to_string());
            return;
        };

        let delivery = match self.settings.report.strategy {
            ReportStrategy::Backend => Delivery::Backend,
            ReportStrategy::GithubApi => Delivery::GithubApi,
            ReportStrategy::IssueLink => {
                let report_settings = &self.settings.report;
                match issues::new_issue_url(
                    &report_settings.repository,
                    &report,
                    &report_settings.labels,
                ) {
                    Ok(url) => Delivery::IssueLink { url: url.into() },
                    Err(err) => {
                        self.fail_submission(&report, SubmitError::from(err));
                        return;
                    }
                }
            }
        };

        let state = &mut self.ui.failure_report;
        state.status = SubmissionStatus::Submitting;
        state.last_error = None;
        state.success_message = None;
        state.derived_issue_url = None;
        self.set_status("Submitting failure report…", StatusTone::Busy);
        self.jobs.begin_submission(
            SubmissionJob {
                generation: self.report_generation,
                report,
                delivery,
            },
            self.services.clone(),
        );
    }

    /// Dismiss the blocking validation notice.
    pub fn dismiss_validation_notice(&mut self) {
        self.ui.failure_report.validation_notice = None;
        self.ui.failure_report.focus_description_requested = true;
    }

    /// Fallback page for filing a report by hand.
    ///
    /// An unusable configured repository falls back to the default one so the
    /// error branch always has somewhere to send the user.
    pub fn manual_report_url(&self) -> Option<String> {
        let repository = &self.settings.report.repository;
        issues::manual_report_url(repository)
            .or_else(|err| {
                tracing::warn!("{err}; linking {DEFAULT_REPOSITORY} instead");
                issues::manual_report_url(DEFAULT_REPOSITORY)
            })
            .ok()
            .map(String::from)
    }

    /// Open a link shown in the modal with the platform URL handler.
    pub fn open_link(&mut self, url: &str) {
        if let Err(err) = self.services.open_url(url) {
            tracing::warn!("Failed to open {url}: {err}");
            self.set_status(format!("Open this link manually: {url}"), StatusTone::Warning);
        }
    }

    pub(super) fn fail_submission(&mut self, report: &FailureReport, err: SubmitError) {
        tracing::error!("Failed to submit failure report: {err}");
        tracing::error!(
            "FAILURE REPORT (manual processing required): {}",
            report.log_summary()
        );
        let state = &mut self.ui.failure_report;
        state.status = SubmissionStatus::Error;
        state.last_error = Some(err.to_string());
        self.set_status("Failure report not sent", StatusTone::Error);
    }
}
