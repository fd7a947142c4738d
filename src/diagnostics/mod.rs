//! Environment facts attached to a failure report.
//!
//! Collection is best-effort: every lookup has a default, and no failure here
//! ever reaches the user.

pub mod recent_errors;

use serde::Serialize;

/// Version shown when the host application did not announce one.
pub const DEVELOPMENT_VERSION: &str = "Development";
/// Placeholder for any platform descriptor that could not be read.
pub const UNKNOWN: &str = "Unknown";

/// Non-sensitive environment facts attached to a report.
///
/// Serialized with the field names the backend's `/report-failure` route expects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
    #[serde(rename = "gooseVersion")]
    pub version: String,
    #[serde(rename = "osVersion")]
    pub os_descriptor: String,
    pub platform: String,
    pub architecture: String,
    #[serde(rename = "providerType")]
    pub provider_name: Option<String>,
    #[serde(rename = "extensionCount")]
    pub extension_count: u32,
}

impl SystemInfo {
    /// Placeholder used when a report is submitted before collection finishes.
    pub fn unavailable(platform: &PlatformInfo) -> Self {
        Self {
            version: platform.version_or_default(),
            os_descriptor: platform.os_descriptor_or_default(),
            platform: platform.platform.clone(),
            architecture: platform.architecture.clone(),
            provider_name: None,
            extension_count: 0,
        }
    }

    /// Provider label for display and issue bodies.
    pub fn provider_label(&self) -> &str {
        self.provider_name.as_deref().unwrap_or(UNKNOWN)
    }
}

/// Process-wide platform facts, read once per collection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlatformInfo {
    pub version: Option<String>,
    pub os_descriptor: Option<String>,
    pub platform: String,
    pub architecture: String,
}

impl PlatformInfo {
    /// Read the current process's platform, using `version` for the host app.
    pub fn current(version: Option<String>) -> Self {
        Self {
            version,
            os_descriptor: sysinfo::System::long_os_version(),
            platform: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
        }
    }

    fn version_or_default(&self) -> String {
        non_empty(self.version.as_deref()).unwrap_or_else(|| DEVELOPMENT_VERSION.to_string())
    }

    fn os_descriptor_or_default(&self) -> String {
        non_empty(self.os_descriptor.as_deref()).unwrap_or_else(|| UNKNOWN.to_string())
    }
}

/// Lookups the collector depends on; implemented over the backend in production.
pub trait DiagnosticsSource {
    type Error: std::fmt::Display;

    fn platform(&self) -> PlatformInfo;
    fn extension_count(&self) -> Result<u32, Self::Error>;
    fn provider_name(&self) -> Result<Option<String>, Self::Error>;
}

/// Gather a populated [`SystemInfo`], defaulting every field that fails.
pub fn collect_system_info<S: DiagnosticsSource + ?Sized>(source: &S) -> SystemInfo {
    let platform = source.platform();
    let extension_count = match source.extension_count() {
        Ok(count) => count,
        Err(err) => {
            tracing::warn!("Failed to fetch extensions for failure report: {err}");
            0
        }
    };
    let provider_name = match source.provider_name() {
        Ok(name) => name.and_then(|name| non_empty(Some(&name))),
        Err(err) => {
            tracing::debug!("Provider lookup unavailable: {err}");
            None
        }
    };
    SystemInfo {
        provider_name,
        extension_count,
        ..SystemInfo::unavailable(&platform)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
