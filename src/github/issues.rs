//! GitHub issues for failure reports: pre-filled "new issue" links and
//! direct creation through the REST API.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::http_client;
use crate::report::FailureReport;

/// Public GitHub REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";
/// Longest pre-filled link handed to the browser; GitHub rejects longer ones.
pub const MAX_ISSUE_URL_LEN: usize = 8_000;
const TRUNCATED_MARKER: &str = "\n\n_(truncated)_";
const MAX_API_RESPONSE_BYTES: usize = 256 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum IssueLinkError {
    #[error("Invalid repository slug (expected OWNER/REPO): {0}")]
    InvalidRepo(String),
    #[error("Invalid issue URL: {0}")]
    Url(#[from] url::ParseError),
}

/// A successfully created GitHub issue.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CreatedIssue {
    /// Issue number within the repository.
    pub number: u64,
    /// HTML URL of the created issue.
    pub html_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateIssueError {
    #[error("Invalid repository slug (expected OWNER/REPO): {0}")]
    InvalidRepo(String),
    #[error(
        "Missing GitHub token (set `GITHUB_TOKEN` or run `failure-report-secret --github set <token>`)"
    )]
    MissingToken,
    #[error("GitHub API error: {0}")]
    Http(String),
    #[error("JSON error: {0}")]
    Json(String),
}

#[derive(Clone, Debug, Serialize)]
struct IssueCreatePayload<'a> {
    title: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "no_labels")]
    labels: &'a [String],
}

fn no_labels(labels: &&[String]) -> bool {
    labels.is_empty()
}

/// Render the Markdown body used for tracker issues.
pub fn issue_body(report: &FailureReport) -> String {
    let info = &report.system_info;
    let errors = if report.recent_errors.is_empty() {
        "No recent errors captured.".to_string()
    } else {
        report.recent_errors.join("\n")
    };
    format!(
        "**Describe the bug**\n\n\
         {description}\n\n\
         **Please provide following information:**\n\
         - **OS & Arch:** {platform} {arch}\n\
         - **OS Version:** {os}\n\
         - **Interface:** UI (Desktop App)\n\
         - **Version:** {version}\n\
         - **Provider & Model:** {provider}\n\
         - **Extensions:** {extensions}\n\n\
         **Recent Errors/Logs:**\n\
         ```\n{errors}\n```\n\n\
         **Additional context**\n\
         - **Timestamp:** {timestamp}\n\
         - **Reported via:** Desktop app failure reporting\n",
        description = report.description,
        platform = info.platform,
        arch = info.architecture,
        os = info.os_descriptor,
        version = info.version,
        provider = info.provider_label(),
        extensions = info.extension_count,
        timestamp = report.timestamp,
    )
}

/// Build `https://github.com/{repo}/issues/new?title=…&body=…&labels=…`.
pub fn new_issue_url(
    repo: &str,
    report: &FailureReport,
    labels: &[String],
) -> Result<Url, IssueLinkError> {
    let base = repo_url(repo, "issues/new")?;
    let title = report.issue_title();
    let labels = labels.join(",");
    let body = issue_body(report);
    let mut keep = body.chars().count();
    let mut url = issue_url_with_body(&base, &title, &body, &labels)?;
    // Shrink the body until the encoded link fits; each pass drops at least one char.
    while url.as_str().len() > MAX_ISSUE_URL_LEN && keep > 0 {
        let scaled = keep * MAX_ISSUE_URL_LEN / url.as_str().len();
        keep = scaled.min(keep - 1);
        let clamped = clamp_body(&body, keep);
        url = issue_url_with_body(&base, &title, &clamped, &labels)?;
    }
    Ok(url)
}

fn issue_url_with_body(
    base: &Url,
    title: &str,
    body: &str,
    labels: &str,
) -> Result<Url, IssueLinkError> {
    let mut params = vec![("title", title), ("body", body)];
    if !labels.is_empty() {
        params.push(("labels", labels));
    }
    Ok(Url::parse_with_params(base.as_str(), &params)?)
}

/// Create the issue in `repo` through the REST API at `api_url`.
///
/// Labels the repository does not have make GitHub answer 422; the request is
/// then retried once without labels.
pub fn create_issue(
    api_url: &str,
    repo: &str,
    token: &str,
    report: &FailureReport,
    labels: &[String],
) -> Result<CreatedIssue, CreateIssueError> {
    let repo = repo.trim().trim_matches('/');
    if !is_valid_repo(repo) {
        return Err(CreateIssueError::InvalidRepo(repo.to_string()));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(CreateIssueError::MissingToken);
    }
    let url = format!("{}/repos/{repo}/issues", api_url.trim_end_matches('/'));
    let title = report.issue_title();
    let body = issue_body(report);
    let with_labels = IssueCreatePayload {
        title: &title,
        body: &body,
        labels,
    };
    match post_issue(&url, token, &with_labels) {
        Err(CreateIssueError::Http(err))
            if !labels.is_empty() && looks_like_missing_label(&err) =>
        {
            tracing::warn!("GitHub refused the report labels, retrying without them: {err}");
            let without_labels = IssueCreatePayload {
                labels: &[],
                ..with_labels
            };
            post_issue(&url, token, &without_labels)
        }
        result => result,
    }
}

fn post_issue(
    url: &str,
    token: &str,
    payload: &IssueCreatePayload<'_>,
) -> Result<CreatedIssue, CreateIssueError> {
    let request = http_client::agent()
        .post(url)
        .set("Accept", "application/vnd.github+json")
        .set("Authorization", &format!("Bearer {token}"));

    let response = match request.send_json(payload) {
        Ok(response) => response,
        Err(ureq::Error::Status(code, response)) => {
            let body = http_client::read_response_text(response, MAX_API_RESPONSE_BYTES)
                .unwrap_or_default();
            return Err(CreateIssueError::Http(format!("HTTP {code}: {body}")));
        }
        Err(ureq::Error::Transport(err)) => {
            return Err(CreateIssueError::Http(err.to_string()));
        }
    };

    let text = http_client::read_response_text(response, MAX_API_RESPONSE_BYTES)
        .map_err(|err| CreateIssueError::Http(err.to_string()))?;
    serde_json::from_str::<CreatedIssue>(&text)
        .map_err(|err| CreateIssueError::Json(err.to_string()))
}

fn looks_like_missing_label(error: &str) -> bool {
    let lower = error.to_lowercase();
    lower.contains("http 422") && lower.contains("label")
}

/// Template page offered when automatic submission fails.
pub fn manual_report_url(repo: &str) -> Result<Url, IssueLinkError> {
    let base = repo_url(repo, "issues/new")?;
    Ok(Url::parse_with_params(
        base.as_str(),
        &[("template", "bug_report.md")],
    )?)
}

/// Whether `repo` is a plain `OWNER/REPO` slug GitHub URLs can be built from.
pub fn is_valid_repo(repo: &str) -> bool {
    repo.trim()
        .trim_matches('/')
        .split_once('/')
        .is_some_and(|(owner, name)| is_slug_part(owner) && is_slug_part(name))
}

fn repo_url(repo: &str, path: &str) -> Result<Url, IssueLinkError> {
    let repo = repo.trim().trim_matches('/');
    if !is_valid_repo(repo) {
        return Err(IssueLinkError::InvalidRepo(repo.to_string()));
    }
    Ok(Url::parse(&format!("https://github.com/{repo}/{path}"))?)
}

fn is_slug_part(part: &str) -> bool {
    !part.is_empty()
        && part
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
}

fn clamp_body(body: &str, keep_chars: usize) -> String {
    let mut clamped: String = body.chars().take(keep_chars).collect();
    clamped.push_str(TRUNCATED_MARKER);
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::SystemInfo;
    use crate::http_client::test_server::{json_response, serve_once, serve_sequence};
    use std::collections::HashMap;

    fn report(errors: Vec<String>) -> FailureReport {
        FailureReport {
            title: "Crash when saving".to_string(),
            description: "Crash when saving\nevery time".to_string(),
            system_info: SystemInfo {
                version: "1.3.0".to_string(),
                os_descriptor: "macOS 14.5".to_string(),
                platform: "macos".to_string(),
                architecture: "aarch64".to_string(),
                provider_name: Some("openai".to_string()),
                extension_count: 4,
            },
            recent_errors: errors,
            timestamp: "2024-05-01T12:00:00Z".to_string(),
        }
    }

    #[test]
    fn body_lists_diagnostics() {
        let body = issue_body(&report(vec!["ERROR a".to_string(), "ERROR b".to_string()]));
        assert!(body.contains("Crash when saving\nevery time"));
        assert!(body.contains("- **OS & Arch:** macos aarch64"));
        assert!(body.contains("- **Version:** 1.3.0"));
        assert!(body.contains("- **Provider & Model:** openai"));
        assert!(body.contains("```\nERROR a\nERROR b\n```"));
        assert!(body.contains("2024-05-01T12:00:00Z"));
    }

    #[test]
    fn body_notes_missing_errors() {
        assert!(issue_body(&report(Vec::new())).contains("No recent errors captured."));
    }

    #[test]
    fn new_issue_url_encodes_query() {
        let labels = vec!["bug".to_string(), "failure-report".to_string()];
        let url = new_issue_url("block/goose", &report(Vec::new()), &labels).unwrap();
        assert_eq!(url.host_str(), Some("github.com"));
        assert_eq!(url.path(), "/block/goose/issues/new");
        let query: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(query["title"], "[FAILURE REPORT] Crash when saving");
        assert_eq!(query["labels"], "bug,failure-report");
        assert!(query["body"].starts_with("**Describe the bug**"));
        assert!(!url.as_str().contains(' '));
    }

    #[test]
    fn labels_param_is_omitted_when_empty() {
        let url = new_issue_url("block/goose", &report(Vec::new()), &[]).unwrap();
        assert!(url.query_pairs().all(|(key, _)| key != "labels"));
    }

    fn body_param(url: &Url) -> String {
        url.query_pairs()
            .find(|(key, _)| key == "body")
            .map(|(_, value)| value.into_owned())
            .unwrap()
    }

    #[test]
    fn oversized_bodies_are_clamped() {
        let mut long = report(Vec::new());
        long.description = "y".repeat(20_000);
        let url = new_issue_url("block/goose", &long, &[]).unwrap();
        assert!(url.as_str().len() <= MAX_ISSUE_URL_LEN);
        assert!(body_param(&url).ends_with("_(truncated)_"));
    }

    #[test]
    fn clamp_counts_encoded_length() {
        let labels = vec!["bug".to_string(), "needs-triage".to_string()];
        for description in ["ü\n".repeat(3_000), "漢字 ".repeat(2_500), "\n".repeat(5_900)] {
            let mut long = report(vec!["ERROR ünïcödé".to_string(); 10]);
            long.description = description;
            let url = new_issue_url("block/goose", &long, &labels).unwrap();
            assert!(
                url.as_str().len() <= MAX_ISSUE_URL_LEN,
                "encoded link is {} bytes",
                url.as_str().len()
            );
            let body = body_param(&url);
            assert!(body.starts_with("**Describe the bug**"));
            assert!(body.ends_with("_(truncated)_"));
        }
    }

    #[test]
    fn short_bodies_are_not_truncated() {
        let url = new_issue_url("block/goose", &report(Vec::new()), &[]).unwrap();
        assert!(!body_param(&url).contains("_(truncated)_"));
    }

    #[test]
    fn rejects_bad_repo_slugs() {
        for slug in ["", "goose", "block/", "block/go ose", "a/b/c", "block/goose/issues"] {
            assert!(!is_valid_repo(slug), "{slug} should be invalid");
            assert!(
                matches!(manual_report_url(slug), Err(IssueLinkError::InvalidRepo(_))),
                "{slug} should be rejected"
            );
        }
        assert!(is_valid_repo(" block/goose/ "));
        assert!(is_valid_repo("some-org/repo.rs"));
    }

    #[test]
    fn create_issue_posts_report_and_returns_html_url() {
        let (api, requests) = serve_once(json_response(
            "201 Created",
            r#"{"number":42,"html_url":"https://github.com/block/goose/issues/42"}"#,
        ));
        let labels = vec!["bug".to_string(), "failure-report".to_string()];
        let issue = create_issue(&api, "block/goose", "ghp_test", &report(Vec::new()), &labels)
            .unwrap();
        assert_eq!(issue.number, 42);
        assert_eq!(issue.html_url, "https://github.com/block/goose/issues/42");

        let request = requests.recv().unwrap();
        assert!(request.starts_with("POST /repos/block/goose/issues "));
        assert!(request.to_lowercase().contains("authorization: bearer ghp_test"));
        let payload = request_json(&request);
        assert_eq!(payload["title"], "[FAILURE REPORT] Crash when saving");
        assert_eq!(payload["labels"], serde_json::json!(["bug", "failure-report"]));
        assert!(
            payload["body"]
                .as_str()
                .unwrap()
                .contains("- **Provider & Model:** openai")
        );
    }

    #[test]
    fn create_issue_retries_without_unknown_labels() {
        let (api, requests) = serve_sequence(vec![
            json_response(
                "422 Unprocessable Entity",
                r#"{"message":"Validation Failed","errors":[{"field":"labels"}]}"#,
            ),
            json_response(
                "201 Created",
                r#"{"number":7,"html_url":"https://github.com/block/goose/issues/7"}"#,
            ),
        ]);
        let labels = vec!["needs-triage".to_string()];
        let issue =
            create_issue(&api, "block/goose", "tok", &report(Vec::new()), &labels).unwrap();
        assert_eq!(issue.number, 7);

        let first = request_json(&requests.recv().unwrap());
        let second = request_json(&requests.recv().unwrap());
        assert_eq!(first["labels"], serde_json::json!(["needs-triage"]));
        assert!(second.get("labels").is_none());
    }

    #[test]
    fn create_issue_surfaces_api_errors() {
        let (api, _requests) =
            serve_once(json_response("401 Unauthorized", r#"{"message":"Bad credentials"}"#));
        let err = create_issue(&api, "block/goose", "tok", &report(Vec::new()), &[]).unwrap_err();
        match err {
            CreateIssueError::Http(message) => {
                assert!(message.contains("HTTP 401"));
                assert!(message.contains("Bad credentials"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn create_issue_checks_inputs_before_sending() {
        assert!(matches!(
            create_issue(DEFAULT_API_URL, "block/goose", "  ", &report(Vec::new()), &[]),
            Err(CreateIssueError::MissingToken)
        ));
        assert!(matches!(
            create_issue(DEFAULT_API_URL, "goose", "tok", &report(Vec::new()), &[]),
            Err(CreateIssueError::InvalidRepo(_))
        ));
    }

    fn request_json(request: &str) -> serde_json::Value {
        let (_, body) = request.split_once("\r\n\r\n").unwrap();
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn manual_url_points_at_template() {
        let url = manual_report_url("block/goose").unwrap();
        assert_eq!(
            url.as_str(),
            "https://github.com/block/goose/issues/new?template=bug_report.md"
        );
    }
}
