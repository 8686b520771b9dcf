pub mod diff;
pub mod types;

pub use diff::{summarize, truncate};
pub use types::{DiffSummary, DiffText};

use std::path::Path;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("git diff exited with {status:?}: {stderr}")]
    Failed { status: Option<i32>, stderr: String },
}

/// Diff between the second-most-recent and most-recent commit in `repo_dir`.
///
/// Never fails: a missing parent commit or any git failure yields
/// [`DiffText::NoHistory`], an empty diff yields [`DiffText::NoChanges`].
#[instrument(skip_all, fields(repo_dir = %repo_dir.display()))]
pub async fn acquire_diff(repo_dir: &Path) -> DiffText {
    match run_git_diff(repo_dir).await {
        Ok(text) if text.trim().is_empty() => {
            info!("last commit has no textual changes");
            DiffText::NoChanges
        }
        Ok(text) => {
            debug!(diff_bytes = text.len(), "captured commit diff");
            DiffText::classify(text)
        }
        Err(e) => {
            warn!(error = %e, "no diff available for the last commit");
            DiffText::NoHistory
        }
    }
}

async fn run_git_diff(repo_dir: &Path) -> Result<String, GitError> {
    let output = Command::new("git")
        .args(["diff", "HEAD~1", "HEAD"])
        .current_dir(repo_dir)
        .output()
        .await?;

    if !output.status.success() {
        return Err(GitError::Failed {
            status: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
