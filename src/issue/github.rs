use async_trait::async_trait;
use reqwest::header::ACCEPT;
use tracing::{debug, instrument};

use super::types::{CreatedIssue, Issue};
use super::{IssueTracker, TrackerError};
use crate::config::TrackerSettings;

const USER_AGENT: &str = concat!("diff-triage/", env!("CARGO_PKG_VERSION"));

/// GitHub REST issue creation.
pub struct GitHubTracker {
    client: reqwest::Client,
    settings: TrackerSettings,
}

impl GitHubTracker {
    pub fn new(settings: TrackerSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, settings })
    }

    pub fn issues_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/issues",
            self.settings.api_base, self.settings.owner, self.settings.repo
        )
    }
}

#[async_trait]
impl IssueTracker for GitHubTracker {
    #[instrument(skip_all, fields(owner = %self.settings.owner, repo = %self.settings.repo))]
    async fn create_issue(&self, issue: &Issue) -> Result<CreatedIssue, TrackerError> {
        debug!(labels = %issue.labels, "posting issue");
        let response = self
            .client
            .post(self.issues_url())
            .bearer_auth(&self.settings.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .json(issue)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // The issue exists once we see a 2xx; an odd body must not trigger a retry.
        let body = response.text().await.unwrap_or_default();
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::LabelSet;
    use crate::testing::{http_response, serve};
    use std::time::Duration;

    fn tracker(api_base: &str) -> GitHubTracker {
        GitHubTracker::new(TrackerSettings {
            api_base: api_base.to_string(),
            token: "gh-token".to_string(),
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            timeout: Duration::from_secs(10),
        })
        .unwrap()
    }

    fn issue() -> Issue {
        Issue {
            title: "🤖 Commit Analysis Report".to_string(),
            body: "- **High:** missing validation".to_string(),
            labels: LabelSet::from_iter(["ai-analysis", "high"]),
        }
    }

    async fn create_against(response: String) -> (Result<CreatedIssue, TrackerError>, String) {
        let (base_url, server) = serve(vec![response]).await;
        let result = tracker(&base_url).create_issue(&issue()).await;
        let mut requests = server.await.unwrap();
        (result, requests.remove(0))
    }

    #[test]
    fn test_issues_url() {
        assert_eq!(
            tracker("https://api.github.com").issues_url(),
            "https://api.github.com/repos/acme/widgets/issues"
        );
    }

    #[tokio::test]
    async fn test_created_issue_is_parsed() {
        let body = r#"{"number":42,"html_url":"https://github.com/acme/widgets/issues/42","state":"open"}"#;
        let (result, request) = create_against(http_response("201 Created", &[], body)).await;

        assert_eq!(
            result.unwrap(),
            CreatedIssue {
                number: Some(42),
                html_url: Some("https://github.com/acme/widgets/issues/42".to_string()),
            }
        );
        assert!(request.starts_with("POST /repos/acme/widgets/issues HTTP/1.1"));
        assert!(request.contains("authorization: Bearer gh-token"));
        assert!(request.contains("accept: application/vnd.github+json"));
        assert!(request.contains(r#""labels":["ai-analysis","high"]"#));
        assert!(request.contains("🤖 Commit Analysis Report"));
    }

    #[tokio::test]
    async fn test_created_with_odd_body_still_succeeds() {
        let (result, _) = create_against(http_response("201 Created", &[], "not json")).await;
        assert_eq!(result.unwrap(), CreatedIssue::default());
    }

    #[tokio::test]
    async fn test_rejected_payload_maps_to_status() {
        let body = r#"{"message":"Validation Failed"}"#;
        let (result, _) = create_against(http_response("422 Unprocessable Entity", &[], body)).await;
        assert!(matches!(
            result,
            Err(TrackerError::Status { status: 422, body }) if body.contains("Validation Failed")
        ));
    }

    #[tokio::test]
    async fn test_unreachable_api_is_transport_error() {
        let result = tracker("http://127.0.0.1:1").create_issue(&issue()).await;
        assert!(matches!(result, Err(TrackerError::Transport(_))));
    }
}
