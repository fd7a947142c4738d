use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use failure_report::backend::BackendError;
use failure_report::diagnostics::{PlatformInfo, SystemInfo};
use failure_report::egui_app::controller::EguiController;
use failure_report::github::issues::CreateIssueError;
use failure_report::report::{FailureReport, ReportReceipt};
use failure_report::services::ReportServices;
use failure_report::settings::{ReportStrategy, ReporterSettings};

/// Scripted stand-in for the backend, log scan and URL opener.
pub struct FakeServices {
    pub extension_counts: Mutex<Vec<u32>>,
    pub provider: Option<String>,
    pub recent_errors: Vec<String>,
    pub submit_result: Mutex<Option<Result<ReportReceipt, BackendError>>>,
    pub github_result: Mutex<Option<Result<ReportReceipt, CreateIssueError>>>,
    pub github_issues: Mutex<Vec<FailureReport>>,
    pub open_fails: bool,
    pub diagnostics_calls: AtomicUsize,
    pub submitted: Mutex<Vec<FailureReport>>,
    pub opened: Mutex<Vec<String>>,
    /// When set, the first diagnostics call blocks until a message arrives.
    pub first_diagnostics_gate: Mutex<Option<Receiver<()>>>,
    /// When set, every submission blocks until a message arrives.
    pub submit_gate: Mutex<Option<Receiver<()>>>,
}

impl Default for FakeServices {
    fn default() -> Self {
        Self {
            extension_counts: Mutex::new(vec![2]),
            provider: Some("anthropic".to_string()),
            recent_errors: vec!["2025-01-01 10:00:00 ERROR app: boom".to_string()],
            submit_result: Mutex::new(None),
            github_result: Mutex::new(None),
            github_issues: Mutex::new(Vec::new()),
            open_fails: false,
            diagnostics_calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
            opened: Mutex::new(Vec::new()),
            first_diagnostics_gate: Mutex::new(None),
            submit_gate: Mutex::new(None),
        }
    }
}

impl FakeServices {
    pub fn with_submit_result(result: Result<ReportReceipt, BackendError>) -> Self {
        Self {
            submit_result: Mutex::new(Some(result)),
            ..Self::default()
        }
    }

    pub fn with_github_result(result: Result<ReportReceipt, CreateIssueError>) -> Self {
        Self {
            github_result: Mutex::new(Some(result)),
            ..Self::default()
        }
    }

    /// Install a gate on the first diagnostics call and return its release handle.
    pub fn gate_first_diagnostics(&self) -> Sender<()> {
        let (tx, rx) = channel();
        *self.first_diagnostics_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn gate_submissions(&self) -> Sender<()> {
        let (tx, rx) = channel();
        *self.submit_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn submitted_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    pub fn opened_urls(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl ReportServices for FakeServices {
    fn collect_system_info(&self) -> SystemInfo {
        let call = self.diagnostics_calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            let gate = self.first_diagnostics_gate.lock().unwrap().take();
            if let Some(gate) = gate {
                let _ = gate.recv_timeout(Duration::from_secs(5));
            }
        }
        let counts = self.extension_counts.lock().unwrap();
        let extension_count = counts
            .get(call)
            .or_else(|| counts.last())
            .copied()
            .unwrap_or(0);
        SystemInfo {
            provider_name: self.provider.clone(),
            extension_count,
            ..SystemInfo::unavailable(&self.platform())
        }
    }

    fn recent_errors(&self) -> Vec<String> {
        self.recent_errors.clone()
    }

    fn platform(&self) -> PlatformInfo {
        PlatformInfo {
            version: Some("1.5.0".to_string()),
            os_descriptor: Some("Linux (Test)".to_string()),
            platform: "linux".to_string(),
            architecture: "x86_64".to_string(),
        }
    }

    fn submit_report(&self, report: &FailureReport) -> Result<ReportReceipt, BackendError> {
        if let Some(gate) = self.submit_gate.lock().unwrap().as_ref() {
            let _ = gate.recv_timeout(Duration::from_secs(5));
        }
        self.submitted.lock().unwrap().push(report.clone());
        self.submit_result
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(ReportReceipt::default()))
    }

    fn create_github_issue(
        &self,
        report: &FailureReport,
    ) -> Result<ReportReceipt, CreateIssueError> {
        self.github_issues.lock().unwrap().push(report.clone());
        self.github_result
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(CreateIssueError::MissingToken))
    }

    fn open_url(&self, url: &str) -> std::io::Result<()> {
        if self.open_fails {
            return Err(std::io::Error::other("no browser available"));
        }
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

pub fn settings(strategy: ReportStrategy) -> ReporterSettings {
    let mut settings = ReporterSettings::default();
    settings.report.strategy = strategy;
    settings
}

pub fn controller(strategy: ReportStrategy, services: Arc<FakeServices>) -> EguiController {
    EguiController::new(settings(strategy), services)
}

/// Poll the controller until `done` holds, panicking after ~2 seconds.
pub fn wait_until(controller: &mut EguiController, mut done: impl FnMut(&EguiController) -> bool) {
    for _ in 0..400 {
        controller.poll_background_jobs();
        if done(controller) {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("condition not reached in time");
}
