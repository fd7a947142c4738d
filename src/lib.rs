//! Library exports for the failure reporter binaries and integration tests.
/// Application directory resolution.
pub mod app_dirs;
/// Agent backend client.
pub mod backend;
/// Diagnostics gathered for each report.
pub mod diagnostics;
/// egui modal, controller and host window.
pub mod egui_app;
/// GitHub issue link helpers.
pub mod github;
pub(crate) mod http_client;
/// Tracing subscriber setup.
pub mod logging;
/// Report payload types.
pub mod report;
/// Backend secret key storage.
pub mod secret_store;
/// Side-effect seam used by the controller.
pub mod services;
/// `config.toml` loading.
pub mod settings;
