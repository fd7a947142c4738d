//! Pull the latest error lines out of this application's own log files.

use std::path::Path;

/// Maximum number of error lines attached to a report.
pub const MAX_RECENT_ERRORS: usize = 10;
const MAX_LINE_CHARS: usize = 500;

/// Return up to [`MAX_RECENT_ERRORS`] error lines from the newest log in `dir`, oldest first.
///
/// Any I/O problem yields an empty list.
pub fn collect_from_dir(dir: &Path) -> Vec<String> {
    let newest = match crate::logging::newest_log_file(dir) {
        Ok(Some(path)) => path,
        Ok(None) => return Vec::new(),
        Err(err) => {
            tracing::debug!("Recent error scan skipped: {err}");
            return Vec::new();
        }
    };
    match std::fs::read(&newest) {
        Ok(bytes) => extract_error_lines(&String::from_utf8_lossy(&bytes), MAX_RECENT_ERRORS),
        Err(err) => {
            tracing::debug!("Failed to read {}: {err}", newest.display());
            Vec::new()
        }
    }
}

/// Collect from the application's log directory.
pub fn collect() -> Vec<String> {
    match crate::app_dirs::logs_dir() {
        Ok(dir) => collect_from_dir(&dir),
        Err(err) => {
            tracing::debug!("Recent error scan skipped: {err}");
            Vec::new()
        }
    }
}

fn extract_error_lines(text: &str, limit: usize) -> Vec<String> {
    let mut lines: Vec<String> = text
        .lines()
        .rev()
        .filter(|line| is_error_line(line))
        .take(limit)
        .map(truncate_line)
        .collect();
    lines.reverse();
    lines
}

fn is_error_line(line: &str) -> bool {
    line.split_whitespace().take(4).any(|token| token == "ERROR")
}

fn truncate_line(line: &str) -> String {
    let line = line.trim_end();
    if line.chars().count() <= MAX_LINE_CHARS {
        return line.to_string();
    }
    let mut out: String = line.chars().take(MAX_LINE_CHARS - 1).collect();
    out.push('…');
    out
}
