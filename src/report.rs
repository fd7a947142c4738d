//! Failure report payload shared by both delivery strategies.

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::diagnostics::SystemInfo;

/// Prefix applied to every report title.
pub const TITLE_PREFIX: &str = "[FAILURE REPORT] ";
const MAX_TITLE_CHARS: usize = 80;
const FALLBACK_TITLE: &str = "Failure report";

/// Body POSTed to the backend's `/report-failure` route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReport {
    pub title: String,
    pub description: String,
    pub system_info: SystemInfo,
    pub recent_errors: Vec<String>,
    /// RFC 3339 creation time.
    pub timestamp: String,
}

impl FailureReport {
    /// Build a report from the user's description, or `None` if it is blank.
    pub fn new(
        description: &str,
        system_info: SystemInfo,
        recent_errors: Vec<String>,
        now: OffsetDateTime,
    ) -> Option<Self> {
        let description = description.trim();
        if description.is_empty() {
            return None;
        }
        Some(Self {
            title: derive_title(description),
            description: description.to_string(),
            system_info,
            recent_errors,
            timestamp: format_timestamp(now),
        })
    }

    /// Title as filed in the tracker.
    pub fn issue_title(&self) -> String {
        format!("{TITLE_PREFIX}{}", self.title)
    }

    /// One-line summary for logs when a report could not be delivered.
    pub fn log_summary(&self) -> String {
        let info = &self.system_info;
        format!(
            "Title: {}, Description: {}, System: {}/{}/{}, Timestamp: {}",
            self.title,
            self.description,
            info.platform,
            info.architecture,
            info.version,
            self.timestamp
        )
    }
}

/// Backend reply to a submitted report.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportReceipt {
    #[serde(default)]
    pub issue_url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// First non-empty line of `description`, capped at 80 characters.
pub fn derive_title(description: &str) -> String {
    let first_line = description
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or(FALLBACK_TITLE);
    if first_line.chars().count() <= MAX_TITLE_CHARS {
        return first_line.to_string();
    }
    let mut title: String = first_line.chars().take(MAX_TITLE_CHARS - 1).collect();
    title.push('…');
    title
}

fn format_timestamp(now: OffsetDateTime) -> String {
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}
