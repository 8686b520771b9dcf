pub mod prompt;

use tracing::{debug, error, info, instrument};

use crate::git::{self, DiffText};
use crate::model::{ModelClient, ModelError};
use crate::report::{Report, Severity};
use crate::retry::RetryPolicy;

/// Turns the latest commit diff into a [`Report`].
///
/// Always yields a well-formed report: sentinels and exhausted retries both
/// fall back to [`Report::mock`].
pub struct DiffAnalyzer<'a> {
    client: &'a dyn ModelClient,
    policy: RetryPolicy,
    max_diff_bytes: usize,
}

impl<'a> DiffAnalyzer<'a> {
    pub fn new(client: &'a dyn ModelClient, policy: RetryPolicy, max_diff_bytes: usize) -> Self {
        Self {
            client,
            policy,
            max_diff_bytes,
        }
    }

    #[instrument(skip_all, fields(sentinel = diff.is_sentinel()))]
    pub async fn analyze(&self, diff: &DiffText) -> Report {
        let text = match diff {
            DiffText::Changes(text) => text,
            sentinel => {
                info!(reason = sentinel.as_str(), "nothing to analyze; using mock report");
                return Report::mock();
            }
        };

        let summary = git::summarize(text);
        info!(
            files = summary.files.len(),
            additions = summary.additions(),
            deletions = summary.deletions(),
            "sending diff to model"
        );
        let prompt = prompt::build(text, &summary, self.max_diff_bytes);

        let result = self
            .policy
            .run(|attempt| {
                let prompt = &prompt;
                async move {
                    debug!(attempt, "requesting analysis");
                    let reply = self.client.generate(prompt).await?;
                    check_severities(&reply)?;
                    Ok::<_, ModelError>(reply)
                }
            })
            .await;

        match result {
            Ok(reply) => {
                info!(chars = reply.chars().count(), "model analysis complete");
                Report::new(reply)
            }
            Err(e) => {
                error!(error = %e, "model analysis failed; using mock report");
                Report::mock()
            }
        }
    }
}

/// A usable reply names every severity bucket it was asked to fill.
fn check_severities(reply: &str) -> Result<(), ModelError> {
    let missing: Vec<&str> = Severity::ALL
        .into_iter()
        .filter(|s| !s.appears_in(reply))
        .map(Severity::keyword)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ModelError::MissingSeverities {
            missing: missing.join(", "),
        })
    }
}
