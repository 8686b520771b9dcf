pub mod github;
pub mod types;

pub use github::GitHubTracker;
pub use types::{CreatedIssue, Issue, LabelSet, AI_ANALYSIS_LABEL};

use async_trait::async_trait;
use colored::Colorize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::report::{Report, Severity};
use crate::retry::{ErrorClass, RetryError, RetryPolicy, Retryable};

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("issue tracker request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("issue tracker returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl Retryable for TrackerError {
    fn class(&self) -> ErrorClass {
        match self {
            TrackerError::Transport(_) => ErrorClass::Transient,
            TrackerError::Status { status: 429, .. } => ErrorClass::RateLimited { retry_after: None },
            TrackerError::Status { status, .. } if *status == 408 || *status >= 500 => {
                ErrorClass::Transient
            }
            // 401/403/404/422: bad token, unknown repo or rejected payload.
            TrackerError::Status { .. } => ErrorClass::Fatal,
        }
    }
}

/// Somewhere issues can be filed.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Create one issue. One attempt; retries belong to the caller.
    async fn create_issue(&self, issue: &Issue) -> Result<CreatedIssue, TrackerError>;
}

/// Derive issue labels from report text.
///
/// A severity label is present iff its keyword (`Critical`, `High`, `Medium`,
/// `Low`) occurs verbatim in the report; this also covers the bold
/// `**High:**` form. [`AI_ANALYSIS_LABEL`] is always present, so the set is
/// never empty.
pub fn extract_labels(report: &str) -> LabelSet {
    let mut labels: LabelSet = Severity::ALL
        .into_iter()
        .filter(|s| s.appears_in(report))
        .map(Severity::label)
        .collect();
    labels.insert(AI_ANALYSIS_LABEL);
    labels
}

pub fn build_issue(title: &str, report: &Report) -> Issue {
    Issue {
        title: title.to_string(),
        body: report.as_str().to_string(),
        labels: extract_labels(report.as_str()),
    }
}

/// Files one issue per report.
pub struct IssueFiler<'a> {
    tracker: &'a dyn IssueTracker,
    policy: RetryPolicy,
    title: String,
}

impl<'a> IssueFiler<'a> {
    pub fn new(tracker: &'a dyn IssueTracker, policy: RetryPolicy, title: impl Into<String>) -> Self {
        Self {
            tracker,
            policy,
            title: title.into(),
        }
    }

    /// Submit the report as an issue, returning the tracker's reply and the
    /// labels that were sent. Exhausted or rejected attempts are returned to
    /// the caller; there is no fallback after this stage.
    #[instrument(skip_all, fields(title = %self.title))]
    pub async fn file(
        &self,
        report: &Report,
    ) -> Result<(CreatedIssue, LabelSet), RetryError<TrackerError>> {
        let issue = build_issue(&self.title, report);
        info!(labels = %issue.labels, "labels extracted");

        let created = self
            .policy
            .run(|attempt| {
                let issue = &issue;
                async move {
                    debug!(attempt, "creating issue");
                    self.tracker.create_issue(issue).await
                }
            })
            .await?;

        info!(
            url = created.html_url.as_deref().unwrap_or("<unknown>"),
            labels = %issue.labels,
            "issue created"
        );
        Ok((created, issue.labels))
    }
}

/// Print the payload that would be filed.
pub fn print_issue(issue: &Issue) {
    println!();
    println!("{} {}", "Title: ".bold(), issue.title);
    println!("{} {}", "Labels:".bold(), issue.labels.to_string().cyan());
    println!();
    println!("{}", issue.body);
}

pub fn print_created(created: &CreatedIssue, labels: &LabelSet) {
    let location = match (&created.html_url, created.number) {
        (Some(url), _) => url.clone(),
        (None, Some(number)) => format!("#{number}"),
        (None, None) => "<unknown>".to_string(),
    };
    println!("{} {}", "Issue created:".green().bold(), location);
    println!("Labels: {}", labels.to_string().cyan());
    if labels.contains(Severity::Critical.label()) {
        println!("{}", "Critical findings reported".red().bold());
    }
}
