use std::path::Path;

use thiserror::Error;
use tracing::{info, info_span, Instrument};

use crate::analysis::DiffAnalyzer;
use crate::config::{Config, ConfigError};
use crate::git;
use crate::issue::{self, CreatedIssue, GitHubTracker, IssueFiler, IssueTracker, TrackerError};
use crate::model::{HttpModelClient, ModelClient};
use crate::report::{self, Report, ReportError};
use crate::retry::RetryError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("Failed to initialise HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Issue creation failed: {0}")]
    Filing(#[from] RetryError<TrackerError>),
}

impl PipelineError {
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Config(_) => 2,
            PipelineError::Report(ReportError::Missing(_) | ReportError::Empty(_)) => 3,
            PipelineError::Filing(_) => 4,
            PipelineError::Report(_) | PipelineError::HttpClient(_) => 1,
        }
    }
}

/// Options for the analysis stage.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions<'a> {
    pub repo_dir: &'a Path,
    pub report_path: &'a Path,
    /// Run the filing stage in-process once the report is saved.
    pub file_issue: bool,
}

/// Analyze the last commit, persist the report, then file it.
///
/// All required settings are validated before git or the network is touched.
pub async fn run_analyze(config: &Config, opts: AnalyzeOptions<'_>) -> Result<(), PipelineError> {
    let model = config.model_settings()?;
    let tracker = if opts.file_issue {
        Some(config.tracker_settings()?)
    } else {
        None
    };

    let client = HttpModelClient::new(model)?;
    let report = analyze_and_persist(&client, config, opts.repo_dir, opts.report_path).await?;
    report::print_summary(&report, opts.report_path);

    if let Some(settings) = tracker {
        let tracker = GitHubTracker::new(settings)?;
        let (created, labels) = file_report(&tracker, config, &report).await?;
        issue::print_created(&created, &labels);
    }
    Ok(())
}

/// Read a persisted report and file it, or print the payload on `dry_run`.
pub async fn run_file_issue(
    config: &Config,
    report_path: &Path,
    dry_run: bool,
) -> Result<(), PipelineError> {
    let settings = if dry_run {
        None
    } else {
        Some(config.tracker_settings()?)
    };

    let report = report::read_report(report_path)?;

    match settings {
        None => {
            let issue = issue::build_issue(&config.tracker.title, &report);
            info!(labels = %issue.labels, "dry run; not creating issue");
            issue::print_issue(&issue);
        }
        Some(settings) => {
            let tracker = GitHubTracker::new(settings)?;
            let (created, labels) = file_report(&tracker, config, &report).await?;
            issue::print_created(&created, &labels);
        }
    }
    Ok(())
}

/// Stage one: diff, analyze, persist. Returns the report for the next stage.
pub async fn analyze_and_persist(
    client: &dyn ModelClient,
    config: &Config,
    repo_dir: &Path,
    report_path: &Path,
) -> Result<Report, PipelineError> {
    async {
        let diff = git::acquire_diff(repo_dir).await;
        let analyzer = DiffAnalyzer::new(
            client,
            config.retry.model.policy(),
            config.report.max_diff_bytes,
        );
        let report = analyzer.analyze(&diff).await;
        report::persist(&report, report_path)?;
        Ok::<_, PipelineError>(report)
    }
    .instrument(info_span!("analyze"))
    .await
}

/// Stage two: label and submit an in-memory report.
pub async fn file_report(
    tracker: &dyn IssueTracker,
    config: &Config,
    report: &Report,
) -> Result<(CreatedIssue, issue::LabelSet), PipelineError> {
    async {
        let filer = IssueFiler::new(
            tracker,
            config.retry.tracker.policy(),
            config.tracker.title.clone(),
        );
        Ok::<_, PipelineError>(filer.file(report).await?)
    }
    .instrument(info_span!("file_issue"))
    .await
}
