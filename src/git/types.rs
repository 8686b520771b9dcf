/// Returned when `git diff HEAD~1 HEAD` fails, typically on the first commit.
pub const NO_HISTORY: &str = "Initial commit or unable to get diff";

/// Returned when the last commit changed nothing textual.
pub const NO_CHANGES: &str = "No changes detected in the last commit.";

/// Diff of the most recent commit, or one of the two sentinel outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffText {
    Changes(String),
    NoHistory,
    NoChanges,
}

impl DiffText {
    /// Map raw text onto a `DiffText`, recognising the sentinels by exact match.
    pub fn classify(text: String) -> DiffText {
        match text.as_str() {
            NO_HISTORY => DiffText::NoHistory,
            NO_CHANGES => DiffText::NoChanges,
            _ => DiffText::Changes(text),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DiffText::Changes(text) => text,
            DiffText::NoHistory => NO_HISTORY,
            DiffText::NoChanges => NO_CHANGES,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        !matches!(self, DiffText::Changes(_))
    }
}

/// Per-file line counts parsed from a unified diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileChange {
    /// File path (e.g., "src/auth/config.rs")
    pub path: String,
    pub is_new: bool,
    pub is_deleted: bool,
    pub additions: usize,
    pub deletions: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub files: Vec<FileChange>,
}

impl DiffSummary {
    pub fn additions(&self) -> usize {
        self.files.iter().map(|f| f.additions).sum()
    }

    pub fn deletions(&self) -> usize {
        self.files.iter().map(|f| f.deletions).sum()
    }
}
