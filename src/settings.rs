//! Persisted reporter settings loaded from `config.toml`.
//!
//! Every field is defaulted so a missing or partial file still yields a usable
//! configuration. Environment overrides are applied after the file is read.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs;
use crate::github::issues;

/// Default filename used to store the reporter configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// Environment variable carrying the host application's version string.
pub const APP_VERSION_ENV: &str = "GOOSE_VERSION";
/// Environment variable selecting the backend base URL.
pub const BACKEND_URL_ENV: &str = "GOOSE_API_HOST";

const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:3000";
/// Repository used when none, or an unusable one, is configured.
pub const DEFAULT_REPOSITORY: &str = "block/goose";

/// Errors that may occur while loading reporter settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The application directory could not be prepared.
    #[error("Unable to resolve config directory: {0}")]
    AppDir(#[from] app_dirs::AppDirError),
    /// Failed to read the config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse the TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Top-level settings for the failure reporter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReporterSettings {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub report: ReportSettings,
}

/// Where and how diagnostics are fetched from the agent backend.
///
/// Config keys: `base_url`, `provider_lookup`, `active_session_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(default = "default_backend_url")]
    pub base_url: String,
    #[serde(default)]
    pub provider_lookup: ProviderLookup,
    /// Session consulted when `provider_lookup = "session"`.
    #[serde(default)]
    pub active_session_id: Option<String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            provider_lookup: ProviderLookup::default(),
            active_session_id: None,
        }
    }
}

/// Source of the provider name attached to a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderLookup {
    /// First configured provider from the global provider list.
    #[default]
    Providers,
    /// Provider recorded in the active session's metadata.
    Session,
}

/// How reports are delivered and where they end up.
///
/// Config keys: `strategy`, `repository`, `labels`, `app_version`, `github_api_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSettings {
    #[serde(default)]
    pub strategy: ReportStrategy,
    /// GitHub repository slug (`OWNER/REPO`).
    #[serde(default = "default_repository")]
    pub repository: String,
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,
    /// Host application version; falls back to `GOOSE_VERSION`.
    #[serde(default)]
    pub app_version: Option<String>,
    /// REST endpoint used by the `github_api` strategy.
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            strategy: ReportStrategy::default(),
            repository: default_repository(),
            labels: default_labels(),
            app_version: None,
            github_api_url: default_github_api_url(),
        }
    }
}

/// Delivery strategy for a submitted report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStrategy {
    /// Pre-fill a GitHub "new issue" page and open it in the browser.
    #[default]
    IssueLink,
    /// POST a structured report to the backend, which files the issue.
    Backend,
    /// File the issue directly through the GitHub REST API with a stored token.
    GithubApi,
}

impl ReporterSettings {
    /// Load settings from the app directory, returning defaults if the file is missing.
    pub fn load_or_default() -> Result<Self, SettingsError> {
        let path = config_path()?;
        let mut settings = load_settings_from(&path)?;
        settings.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(BACKEND_URL_ENV).filter(|value| !value.trim().is_empty()) {
            self.backend.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if self.report.app_version.is_none() {
            self.report.app_version =
                lookup(APP_VERSION_ENV).filter(|value| !value.trim().is_empty());
        }
    }

    fn normalized(mut self) -> Self {
        let trimmed = self.backend.base_url.trim().trim_end_matches('/');
        self.backend.base_url = if trimmed.is_empty() {
            default_backend_url()
        } else {
            trimmed.to_string()
        };
        let repository = self.report.repository.trim().trim_matches('/');
        self.report.repository = if issues::is_valid_repo(repository) {
            repository.to_string()
        } else {
            tracing::warn!(
                "Ignoring invalid repository {:?}; using {DEFAULT_REPOSITORY}",
                self.report.repository
            );
            default_repository()
        };
        let api_url = self.report.github_api_url.trim().trim_end_matches('/');
        self.report.github_api_url = if api_url.is_empty() {
            default_github_api_url()
        } else {
            api_url.to_string()
        };
        self.report.labels.retain(|label| !label.trim().is_empty());
        self
    }
}

/// Resolve the configuration file path, ensuring the parent directory exists.
pub fn config_path() -> Result<PathBuf, SettingsError> {
    Ok(app_dirs::app_root_dir()?.join(CONFIG_FILE_NAME))
}

pub(crate) fn load_settings_from(path: &Path) -> Result<ReporterSettings, SettingsError> {
    if !path.exists() {
        return Ok(ReporterSettings::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<ReporterSettings>(&text)
        .map(ReporterSettings::normalized)
        .map_err(|source| SettingsError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_repository() -> String {
    DEFAULT_REPOSITORY.to_string()
}

fn default_github_api_url() -> String {
    issues::DEFAULT_API_URL.to_string()
}

fn default_labels() -> Vec<String> {
    ["bug", "needs-triage", "failure-report"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let settings = load_settings_from(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(settings, ReporterSettings::default());
        assert_eq!(settings.report.strategy, ReportStrategy::IssueLink);
        assert_eq!(settings.report.labels, vec!["bug", "needs-triage", "failure-report"]);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "[backend]\nbase_url = \"http://localhost:9000/\"\nprovider_lookup = \"session\"\nactive_session_id = \"abc\"\n\n[report]\nstrategy = \"backend\"\n",
        )
        .unwrap();

        let settings = load_settings_from(&path).unwrap();
        assert_eq!(settings.backend.base_url, "http://localhost:9000");
        assert_eq!(settings.backend.provider_lookup, ProviderLookup::Session);
        assert_eq!(settings.backend.active_session_id.as_deref(), Some("abc"));
        assert_eq!(settings.report.strategy, ReportStrategy::Backend);
        assert_eq!(settings.report.repository, "block/goose");
    }

    #[test]
    fn invalid_repository_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[report]\nrepository = \"nope\"\nlabels = [\"bug\", \" \"]\n").unwrap();
        let settings = load_settings_from(&path).unwrap();
        assert_eq!(settings.report.repository, "block/goose");
        assert_eq!(settings.report.labels, vec!["bug"]);
    }

    #[test]
    fn repository_must_be_a_plain_slug() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        for (configured, expected) in [
            ("block/goose/issues", DEFAULT_REPOSITORY),
            ("my org/goose", DEFAULT_REPOSITORY),
            ("/acme/tools/", "acme/tools"),
        ] {
            std::fs::write(&path, format!("[report]\nrepository = \"{configured}\"\n")).unwrap();
            let settings = load_settings_from(&path).unwrap();
            assert_eq!(settings.report.repository, expected, "{configured}");
            assert!(issues::manual_report_url(&settings.report.repository).is_ok());
        }
    }

    #[test]
    fn github_api_strategy_parses_with_endpoint() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "[report]\nstrategy = \"github_api\"\ngithub_api_url = \"https://ghe.example.com/api/v3/\"\n",
        )
        .unwrap();
        let settings = load_settings_from(&path).unwrap();
        assert_eq!(settings.report.strategy, ReportStrategy::GithubApi);
        assert_eq!(settings.report.github_api_url, "https://ghe.example.com/api/v3");
        assert_eq!(
            ReporterSettings::default().report.github_api_url,
            "https://api.github.com"
        );
    }

    #[test]
    fn malformed_toml_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[report\nstrategy = ").unwrap();
        let err = load_settings_from(&path).unwrap_err();
        assert!(matches!(err, SettingsError::ParseToml { .. }));
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn env_overrides_fill_version_and_backend() {
        let mut settings = ReporterSettings::default();
        settings.apply_env_overrides(|key| match key {
            APP_VERSION_ENV => Some("1.2.3".to_string()),
            BACKEND_URL_ENV => Some(" http://10.0.0.2:4000 ".to_string()),
            _ => None,
        });
        assert_eq!(settings.report.app_version.as_deref(), Some("1.2.3"));
        assert_eq!(settings.backend.base_url, "http://10.0.0.2:4000");
    }

    #[test]
    fn configured_version_wins_over_env() {
        let mut settings = ReporterSettings::default();
        settings.report.app_version = Some("9.9.9".to_string());
        settings.apply_env_overrides(|_| Some("1.0.0".to_string()));
        assert_eq!(settings.report.app_version.as_deref(), Some("9.9.9"));
    }
}
