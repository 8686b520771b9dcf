pub mod types;

pub use types::{Report, Severity};

use colored::Colorize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Report file {0} does not exist; run the analyze stage first")]
    Missing(PathBuf),

    #[error("Report file {0} is empty; refusing to file an empty issue")]
    Empty(PathBuf),

    #[error("Failed to read report file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write report file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Write the report as UTF-8, replacing whatever the file held before.
#[instrument(skip_all, fields(path = %path.display(), bytes = report.as_str().len()))]
pub fn persist(report: &Report, path: &Path) -> Result<(), ReportError> {
    let write_err = |source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(path, report.as_str()).map_err(write_err)?;
    info!("report saved");
    Ok(())
}

/// Load a previously persisted report. A blank file is treated like a
/// missing one.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_report(path: &Path) -> Result<Report, ReportError> {
    match std::fs::read_to_string(path) {
        Ok(text) if text.trim().is_empty() => Err(ReportError::Empty(path.to_path_buf())),
        Ok(text) => {
            debug!(bytes = text.len(), "report loaded");
            Ok(Report::new(text))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Err(ReportError::Missing(path.to_path_buf())),
        Err(source) => Err(ReportError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Print which severities the report mentions.
///
/// ═══ Commit Analysis ═══
/// Critical: found
/// High:     found
/// Medium:   -
/// Low:      found
pub fn print_summary(report: &Report, path: &Path) {
    let found = report.severities();
    let source = if report.is_mock() { " (mock)" } else { "" };

    println!();
    println!("═══ Commit Analysis{} ═══", source);
    for severity in Severity::ALL {
        let marker = if found.contains(&severity) {
            colorize_severity(severity)
        } else {
            "-".dimmed()
        };
        println!("{:<9} {}", format!("{}:", severity), marker);
    }
    println!("Report: {}", path.display());
    println!();
}

/// Helper to colorize a severity for terminal output.
pub fn colorize_severity(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::Critical => "found".red().bold(),
        Severity::High => "found".magenta().bold(),
        Severity::Medium => "found".yellow().bold(),
        Severity::Low => "found".green().bold(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persist_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        let report = Report::new("# Relatório 🤖\n\n### ⚠️ Pontos de Atenção\n- **High:** validação ausente\n");

        persist(&report, &path).unwrap();
        assert_eq!(read_report(&path).unwrap(), report);
    }

    #[test]
    fn test_persist_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        persist(&Report::new("a much longer first report"), &path).unwrap();
        persist(&Report::new("short"), &path).unwrap();
        assert_eq!(read_report(&path).unwrap().as_str(), "short");
    }

    #[test]
    fn test_persist_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/nested/report.md");
        persist(&Report::mock(), &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_persist_into_missing_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let result = persist(&Report::mock(), &blocker.join("report.md"));
        assert!(matches!(result, Err(ReportError::Write { .. })));
    }

    #[test]
    fn test_read_missing_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        assert!(matches!(read_report(&path), Err(ReportError::Missing(p)) if p == path));
    }

    #[test]
    fn test_read_blank_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        for contents in ["", " \n\t\n"] {
            std::fs::write(&path, contents).unwrap();
            assert!(matches!(read_report(&path), Err(ReportError::Empty(p)) if p == path));
        }
    }

    #[test]
    fn test_print_summary_does_not_panic() {
        print_summary(&Report::mock(), Path::new("report.md"));
        print_summary(&Report::new("nothing"), Path::new("report.md"));
    }
}
