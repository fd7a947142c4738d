use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread;

use super::failure_report::SubmitError;
use crate::diagnostics::SystemInfo;
use crate::report::{FailureReport, ReportReceipt};
use crate::services::ReportServices;

pub(crate) enum JobMessage {
    DiagnosticsCollected(DiagnosticsResult),
    RecentErrorsCollected(RecentErrorsResult),
    ReportSubmitted(SubmissionResult),
}

#[derive(Debug)]
pub(crate) struct DiagnosticsResult {
    pub(crate) generation: u64,
    pub(crate) system_info: SystemInfo,
}

#[derive(Debug)]
pub(crate) struct RecentErrorsResult {
    pub(crate) generation: u64,
    pub(crate) lines: Vec<String>,
}

/// How a submission leaves the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Delivery {
    Backend,
    GithubApi,
    IssueLink { url: String },
}

#[derive(Debug)]
pub(crate) struct SubmissionJob {
    pub(crate) generation: u64,
    pub(crate) report: FailureReport,
    pub(crate) delivery: Delivery,
}

#[derive(Debug)]
pub(crate) struct SubmissionResult {
    pub(crate) generation: u64,
    pub(crate) report: FailureReport,
    pub(crate) result: Result<ReportReceipt, SubmitError>,
}

pub(crate) struct ControllerJobs {
    message_tx: Sender<JobMessage>,
    message_rx: Receiver<JobMessage>,
    pub(super) diagnostics_in_progress: bool,
    pub(super) recent_errors_in_progress: bool,
    pub(super) submission_in_progress: bool,
}

impl ControllerJobs {
    pub(super) fn new() -> Self {
        let (message_tx, message_rx) = std::sync::mpsc::channel::<JobMessage>();
        Self {
            message_tx,
            message_rx,
            diagnostics_in_progress: false,
            recent_errors_in_progress: false,
            submission_in_progress: false,
        }
    }

    pub(super) fn try_recv_message(&self) -> Result<JobMessage, TryRecvError> {
        self.message_rx.try_recv()
    }

    pub(super) fn any_in_progress(&self) -> bool {
        self.diagnostics_in_progress || self.recent_errors_in_progress || self.submission_in_progress
    }

    /// Collect diagnostics on a worker thread; a previous run may still be in flight.
    pub(super) fn begin_diagnostics(&mut self, generation: u64, services: Arc<dyn ReportServices>) {
        self.diagnostics_in_progress = true;
        let tx = self.message_tx.clone();
        thread::spawn(move || {
            let system_info = services.collect_system_info();
            let _ = tx.send(JobMessage::DiagnosticsCollected(DiagnosticsResult {
                generation,
                system_info,
            }));
        });
    }

    pub(super) fn begin_recent_errors(
        &mut self,
        generation: u64,
        services: Arc<dyn ReportServices>,
    ) {
        self.recent_errors_in_progress = true;
        let tx = self.message_tx.clone();
        thread::spawn(move || {
            let lines = services.recent_errors();
            let _ = tx.send(JobMessage::RecentErrorsCollected(RecentErrorsResult {
                generation,
                lines,
            }));
        });
    }

    pub(super) fn begin_submission(
        &mut self,
        job: SubmissionJob,
        services: Arc<dyn ReportServices>,
    ) {
        if self.submission_in_progress {
            return;
        }
        self.submission_in_progress = true;
        let tx = self.message_tx.clone();
        thread::spawn(move || {
            let result = deliver(&job, services.as_ref());
            let _ = tx.send(JobMessage::ReportSubmitted(SubmissionResult {
                generation: job.generation,
                report: job.report,
                result,
            }));
        });
    }

    pub(super) fn clear_diagnostics(&mut self) {
        self.diagnostics_in_progress = false;
    }

    pub(super) fn clear_recent_errors(&mut self) {
        self.recent_errors_in_progress = false;
    }

    pub(super) fn clear_submission(&mut self) {
        self.submission_in_progress = false;
    }
}

fn deliver(
    job: &SubmissionJob,
    services: &dyn ReportServices,
) -> Result<ReportReceipt, SubmitError> {
    match &job.delivery {
        Delivery::Backend => services
            .submit_report(&job.report)
            .map_err(SubmitError::Backend),
        Delivery::GithubApi => services
            .create_github_issue(&job.report)
            .map_err(SubmitError::GithubApi),
        Delivery::IssueLink { url } => {
            services
                .open_url(url)
                .map_err(|err| SubmitError::OpenUrl(err.to_string()))?;
            Ok(ReportReceipt {
                issue_url: Some(url.clone()),
                message: None,
            })
        }
    }
}
