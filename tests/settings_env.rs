mod support;

use std::fs;

use failure_report::app_dirs::{self, APP_DIR_NAME};
use failure_report::diagnostics::recent_errors;
use failure_report::settings::{
    BACKEND_URL_ENV, CONFIG_FILE_NAME, ProviderLookup, ReportStrategy, ReporterSettings,
};
use support::env::ConfigHomeGuard;
use tempfile::tempdir;

#[test]
fn loads_config_from_overridden_home() {
    let dir = tempdir().unwrap();
    let _guard = ConfigHomeGuard::set(dir.path().to_path_buf());
    let root = dir.path().join(APP_DIR_NAME);
    fs::create_dir_all(&root).unwrap();
    fs::write(
        root.join(CONFIG_FILE_NAME),
        "[backend]\nbase_url = \"http://localhost:4100/\"\nprovider_lookup = \"session\"\n\
         active_session_id = \"20250101_1\"\n\n[report]\nstrategy = \"backend\"\n\
         app_version = \"1.9.0\"\n",
    )
    .unwrap();
    // SAFETY: the config home guard serializes environment mutation across tests.
    unsafe {
        std::env::remove_var(BACKEND_URL_ENV);
    }

    let settings = ReporterSettings::load_or_default().unwrap();

    assert_eq!(settings.backend.base_url, "http://localhost:4100");
    assert_eq!(settings.backend.provider_lookup, ProviderLookup::Session);
    assert_eq!(settings.backend.active_session_id.as_deref(), Some("20250101_1"));
    assert_eq!(settings.report.strategy, ReportStrategy::Backend);
    assert_eq!(settings.report.app_version.as_deref(), Some("1.9.0"));
}

#[test]
fn missing_config_yields_defaults_and_env_host_wins() {
    let dir = tempdir().unwrap();
    let _guard = ConfigHomeGuard::set(dir.path().to_path_buf());
    // SAFETY: the config home guard serializes environment mutation across tests.
    unsafe {
        std::env::set_var(BACKEND_URL_ENV, "http://127.0.0.1:5555/");
    }

    let settings = ReporterSettings::load_or_default();
    // SAFETY: see above.
    unsafe {
        std::env::remove_var(BACKEND_URL_ENV);
    }

    let settings = settings.unwrap();
    assert_eq!(settings.backend.base_url, "http://127.0.0.1:5555");
    assert_eq!(settings.report.strategy, ReportStrategy::IssueLink);
    assert!(dir.path().join(APP_DIR_NAME).is_dir());
}

#[test]
fn recent_errors_come_from_the_app_log_directory() {
    let dir = tempdir().unwrap();
    let _guard = ConfigHomeGuard::set(dir.path().to_path_buf());
    let logs = app_dirs::logs_dir().unwrap();
    assert!(logs.starts_with(dir.path()));
    fs::write(
        logs.join("failure-report-2025-01-01_10-00-00.log"),
        "2025-01-01T10:00:00Z  INFO failure_report: started\n\
         2025-01-01T10:00:01Z ERROR failure_report::backend: connection refused\n",
    )
    .unwrap();

    let lines = recent_errors::collect();

    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("connection refused"));
}
