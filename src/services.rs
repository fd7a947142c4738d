//! Side effects the failure report controller depends on.
//!
//! The controller only talks to [`ReportServices`], which lets tests drive the
//! whole open/collect/submit cycle without a backend or a browser.

use std::sync::Arc;

use crate::backend::{BackendClient, BackendError};
use crate::diagnostics::{self, DiagnosticsSource, PlatformInfo, SystemInfo};
use crate::github::issues::{self, CreateIssueError};
use crate::report::{FailureReport, ReportReceipt};
use crate::secret_store::{SecretKeyStore, SecretKind};
use crate::settings::{ProviderLookup, ReportSettings, ReporterSettings};

/// Everything the failure report flow needs from the outside world.
pub trait ReportServices: Send + Sync {
    /// Gather diagnostics; must never fail.
    fn collect_system_info(&self) -> SystemInfo;
    /// Recent error lines from local logs; must never fail.
    fn recent_errors(&self) -> Vec<String>;
    /// Platform facts available without any network call.
    fn platform(&self) -> PlatformInfo;
    /// Deliver a report through the backend's report route.
    fn submit_report(&self, report: &FailureReport) -> Result<ReportReceipt, BackendError>;
    /// File the report as a GitHub issue through the REST API.
    fn create_github_issue(
        &self,
        report: &FailureReport,
    ) -> Result<ReportReceipt, CreateIssueError>;
    /// Hand a URL to the platform's external-link handler.
    fn open_url(&self, url: &str) -> std::io::Result<()>;
}

/// Production services backed by the agent backend, local logs and `open`.
pub struct LiveServices {
    client: BackendClient,
    provider_lookup: ProviderLookup,
    active_session_id: Option<String>,
    app_version: Option<String>,
    report: ReportSettings,
}

impl LiveServices {
    pub fn new(settings: &ReporterSettings) -> Self {
        let backend_store = SecretKeyStore::new(SecretKind::BackendKey);
        let secret_key = match backend_store.and_then(|store| store.get()) {
            Ok(key) => key,
            Err(err) => {
                tracing::warn!("Secret key unavailable, sending unauthenticated requests: {err}");
                None
            }
        };
        Self {
            client: BackendClient::new(settings.backend.base_url.clone(), secret_key),
            provider_lookup: settings.backend.provider_lookup,
            active_session_id: settings.backend.active_session_id.clone(),
            app_version: settings.report.app_version.clone(),
            report: settings.report.clone(),
        }
    }

    /// Read the token on every submission so `failure-report-secret` changes apply
    /// without a restart.
    fn github_token(&self) -> Result<String, CreateIssueError> {
        let store = SecretKeyStore::new(SecretKind::GithubToken).map_err(|err| {
            tracing::warn!("GitHub token store unavailable: {err}");
            CreateIssueError::MissingToken
        })?;
        match store.get() {
            Ok(Some(token)) => Ok(token),
            Ok(None) => Err(CreateIssueError::MissingToken),
            Err(err) => {
                tracing::warn!("Failed to read GitHub token: {err}");
                Err(CreateIssueError::MissingToken)
            }
        }
    }

    pub fn shared(settings: &ReporterSettings) -> Arc<dyn ReportServices> {
        Arc::new(Self::new(settings))
    }
}

impl DiagnosticsSource for LiveServices {
    type Error = BackendError;

    fn platform(&self) -> PlatformInfo {
        PlatformInfo::current(self.app_version.clone())
    }

    fn extension_count(&self) -> Result<u32, BackendError> {
        self.client.extension_count()
    }

    fn provider_name(&self) -> Result<Option<String>, BackendError> {
        match (self.provider_lookup, self.active_session_id.as_deref()) {
            (ProviderLookup::Session, Some(session_id)) => self.client.session_provider(session_id),
            (ProviderLookup::Session, None) => Ok(None),
            (ProviderLookup::Providers, _) => self.client.configured_provider(),
        }
    }
}

impl ReportServices for LiveServices {
    fn collect_system_info(&self) -> SystemInfo {
        diagnostics::collect_system_info(self)
    }

    fn recent_errors(&self) -> Vec<String> {
        diagnostics::recent_errors::collect()
    }

    fn platform(&self) -> PlatformInfo {
        DiagnosticsSource::platform(self)
    }

    fn submit_report(&self, report: &FailureReport) -> Result<ReportReceipt, BackendError> {
        tracing::info!(
            "Submitting failure report to {}: {}",
            self.client.base_url(),
            report.title
        );
        self.client.submit_report(report)
    }

    fn create_github_issue(
        &self,
        report: &FailureReport,
    ) -> Result<ReportReceipt, CreateIssueError> {
        let token = self.github_token()?;
        tracing::info!(
            "Creating GitHub issue in {}: {}",
            self.report.repository,
            report.title
        );
        let issue = issues::create_issue(
            &self.report.github_api_url,
            &self.report.repository,
            &token,
            report,
            &self.report.labels,
        )?;
        Ok(ReportReceipt {
            issue_url: Some(issue.html_url),
            message: Some(format!("Created issue #{}", issue.number)),
        })
    }

    fn open_url(&self, url: &str) -> std::io::Result<()> {
        open::that(url)
    }
}
