use std::borrow::Cow;

use super::types::{DiffSummary, FileChange};

/// Summarize a unified diff into per-file addition/deletion counts.
/// Lines outside a `diff --git` section are ignored.
pub fn summarize(raw_diff: &str) -> DiffSummary {
    let mut files = Vec::new();
    let mut current: Option<FileChange> = None;
    let mut in_hunk = false;

    for line in raw_diff.lines() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            files.extend(current.take());
            in_hunk = false;
            current = Some(FileChange {
                path: header_path(rest),
                ..Default::default()
            });
            continue;
        }

        let Some(file) = current.as_mut() else {
            continue;
        };

        if line.starts_with("@@") {
            in_hunk = true;
            continue;
        }

        if !in_hunk {
            if let Some(path) = line.strip_prefix("--- ") {
                file.is_new |= path.trim() == "/dev/null";
            } else if let Some(path) = line.strip_prefix("+++ ") {
                file.is_deleted |= path.trim() == "/dev/null";
            }
            continue;
        }

        if line.starts_with('+') {
            file.additions += 1;
        } else if line.starts_with('-') {
            file.deletions += 1;
        }
    }

    files.extend(current);
    DiffSummary { files }
}

/// Path from a `diff --git a/{path} b/{path}` header, preferring the b/ side.
fn header_path(rest: &str) -> String {
    let mut parts = rest.split_whitespace();
    let a_path = parts.next().unwrap_or_default();
    let b_path = parts.next().unwrap_or(a_path);
    b_path
        .strip_prefix("b/")
        .or_else(|| a_path.strip_prefix("a/"))
        .unwrap_or(b_path)
        .to_string()
}

/// Cut `diff` to at most `max_bytes`, on a char boundary, noting what was dropped.
pub fn truncate(diff: &str, max_bytes: usize) -> Cow<'_, str> {
    if diff.len() <= max_bytes {
        return Cow::Borrowed(diff);
    }
    let mut end = max_bytes;
    while !diff.is_char_boundary(end) {
        end -= 1;
    }
    Cow::Owned(format!(
        "{}\n\n[Diff truncated - {} more bytes]",
        &diff[..end],
        diff.len() - end
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_DIFF: &str = r#"diff --git a/src/main.rs b/src/main.rs
index abc1234..def5678 100644
--- a/src/main.rs
+++ b/src/main.rs
@@ -1,5 +1,7 @@
 fn main() {
-    println!("old");
+    println!("new");
+    // Added a comment
 }
"#;

    #[test]
    fn test_summarize_single_file() {
        let summary = summarize(SAMPLE_DIFF);
        assert_eq!(summary.files.len(), 1);
        assert_eq!(summary.files[0].path, "src/main.rs");
        assert_eq!(summary.additions(), 2);
        assert_eq!(summary.deletions(), 1);
    }

    #[test]
    fn test_summarize_new_and_deleted_files() {
        let diff = r#"diff --git a/new_file.txt b/new_file.txt
new file mode 100644
index 0000000..e69de29
--- /dev/null
+++ b/new_file.txt
@@ -0,0 +1,2 @@
+hello
+world
diff --git a/old_file.txt b/old_file.txt
deleted file mode 100644
index e69de29..0000000
--- a/old_file.txt
+++ /dev/null
@@ -1,2 +0,0 @@
-hello
-world
"#;
        let summary = summarize(diff);
        assert_eq!(summary.files.len(), 2);
        assert!(summary.files[0].is_new);
        assert!(!summary.files[0].is_deleted);
        assert_eq!(summary.files[0].additions, 2);
        assert!(summary.files[1].is_deleted);
        assert_eq!(summary.files[1].deletions, 2);
    }

    #[test]
    fn test_hunk_lines_that_look_like_headers() {
        let diff = "diff --git a/x.md b/x.md\n--- a/x.md\n+++ b/x.md\n@@ -1 +1 @@\n--- old rule\n+++ new rule\n";
        let summary = summarize(diff);
        assert_eq!(summary.files[0].additions, 1);
        assert_eq!(summary.files[0].deletions, 1);
        assert!(!summary.files[0].is_new);
    }

    #[test]
    fn test_summarize_empty() {
        assert!(summarize("").files.is_empty());
    }

    #[test]
    fn test_truncate_short_diff_is_borrowed() {
        assert!(matches!(truncate("abc", 10), Cow::Borrowed("abc")));
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        let diff = "+ação";
        let cut = truncate(diff, 3);
        assert!(cut.starts_with("+a"));
        assert!(!cut.starts_with("+aç"));
        assert!(cut.contains("[Diff truncated - 5 more bytes]"));
    }
}
