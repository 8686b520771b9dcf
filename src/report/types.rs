/// The fixed, network-independent report used when there is no diff to
/// analyze or the model could not be reached. One bullet per severity.
pub const MOCK_REPORT: &str = "## Commit Analysis Report

### ⚠️ Issues
- **Critical:** Mock issue - Thread.Sleep used
- **High:** Mock issue - Missing input validation
- **Medium:** Mock issue - Outdated comments
- **Low:** Mock issue - Non-descriptive variable name
";

/// Severity bucket used in report sections and issue labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    /// Literal token searched for in report text.
    pub fn keyword(self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }

    /// Issue label derived from this severity.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// Case-sensitive substring test; also matches the bold `**Critical:**` form.
    pub fn appears_in(self, text: &str) -> bool {
        text.contains(self.keyword())
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Markdown report handed from the analysis stage to the filing stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report(String);

impl Report {
    pub fn new(markdown: impl Into<String>) -> Self {
        Report(markdown.into())
    }

    pub fn mock() -> Self {
        Report(MOCK_REPORT.to_string())
    }

    pub fn is_mock(&self) -> bool {
        self.0 == MOCK_REPORT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Severities whose keyword occurs anywhere in the report.
    pub fn severities(&self) -> Vec<Severity> {
        Severity::ALL
            .into_iter()
            .filter(|s| s.appears_in(&self.0))
            .collect()
    }
}
