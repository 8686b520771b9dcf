use crate::git::{self, DiffSummary};
use crate::model::Prompt;

const SYSTEM_PROMPT: &str = "You are a senior code reviewer. You receive the unified diff of a \
single commit and report defects it introduces. Classify every finding under exactly one \
severity: Critical, High, Medium or Low. Reply with Markdown only, no preamble.";

/// Reply schema the model is asked to follow. The four severity headings
/// are always present so the reply can be validated and labelled.
const REPORT_SCHEMA: &str = "## Commit Analysis Report

### Summary
<one paragraph describing the change>

### ⚠️ Issues
#### Critical
- **Critical:** <finding> (`path:line`)
#### High
- **High:** <finding>
#### Medium
- **Medium:** <finding>
#### Low
- **Low:** <finding>

### Suggestions
- <optional improvement>

Keep every severity heading. Under a severity with no findings write `- None`.";

/// Build the analysis prompt for `diff`, truncated to `max_diff_bytes`.
pub fn build(diff: &str, summary: &DiffSummary, max_diff_bytes: usize) -> Prompt {
    let mut user = String::new();
    user.push_str(&format!(
        "Commit touches {} file(s), +{} -{}.\n",
        summary.files.len(),
        summary.additions(),
        summary.deletions()
    ));
    for file in &summary.files {
        let kind = match (file.is_new, file.is_deleted) {
            (true, _) => " (new)",
            (_, true) => " (deleted)",
            _ => "",
        };
        user.push_str(&format!(
            "- {}{} +{} -{}\n",
            file.path, kind, file.additions, file.deletions
        ));
    }

    user.push_str("\nRespond using this template:\n\n");
    user.push_str(REPORT_SCHEMA);
    user.push_str("\n\n```diff\n");
    user.push_str(&git::truncate(diff, max_diff_bytes));
    user.push_str("\n```\n");

    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}
