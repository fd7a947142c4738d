use super::EguiController;
use super::jobs::{DiagnosticsResult, JobMessage, RecentErrorsResult, SubmissionResult};
use crate::egui_app::state::SubmissionStatus;
use crate::egui_app::ui::style::StatusTone;

impl EguiController {
    /// Apply every finished background job to the UI state.
    pub fn poll_background_jobs(&mut self) {
        while let Ok(message) = self.jobs.try_recv_message() {
            match message {
                JobMessage::DiagnosticsCollected(message) => self.handle_diagnostics(message),
                JobMessage::RecentErrorsCollected(message) => self.handle_recent_errors(message),
                JobMessage::ReportSubmitted(message) => self.handle_submission(message),
            }
        }
    }

    fn is_current(&self, generation: u64, what: &str) -> bool {
        let current = generation == self.report_generation && self.ui.failure_report.open;
        if !current {
            tracing::debug!(
                "Dropping stale {what} from generation {generation} (current {})",
                self.report_generation
            );
        }
        current
    }

    fn handle_diagnostics(&mut self, message: DiagnosticsResult) {
        if !self.is_current(message.generation, "diagnostics") {
            return;
        }
        self.jobs.clear_diagnostics();
        self.ui.failure_report.system_info = Some(message.system_info);
    }

    fn handle_recent_errors(&mut self, message: RecentErrorsResult) {
        if !self.is_current(message.generation, "recent errors") {
            return;
        }
        self.jobs.clear_recent_errors();
        self.ui.failure_report.recent_errors = message.lines;
    }

    fn handle_submission(&mut self, message: SubmissionResult) {
        self.jobs.clear_submission();
        if !self.is_current(message.generation, "submission result") {
            return;
        }
        match message.result {
            Ok(receipt) => {
                if let Some(url) = receipt.issue_url.as_deref() {
                    tracing::info!("Failure report submitted: {url}");
                } else {
                    tracing::info!("Failure report submitted");
                }
                let state = &mut self.ui.failure_report;
                state.status = SubmissionStatus::Success;
                state.last_error = None;
                state.success_message = receipt.message;
                state.derived_issue_url = receipt.issue_url;
                self.set_status("Failure report submitted", StatusTone::Info);
            }
            Err(err) => self.fail_submission(&message.report, err),
        }
    }
}
