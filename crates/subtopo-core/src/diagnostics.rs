//! Issues found while replaying or repairing a history.
//!
//! Diagnostics never change control flow: the step owning the collection decides
//! whether the run fails.
//!
//! ```
//! use subtopo_core::diagnostics::{DiagnosticIssue, Diagnostics, Stage};
//!
//! let mut diag = Diagnostics::new();
//! diag.add(DiagnosticIssue::error(Stage::Check, "bus partition differs").at("VL1"));
//! assert_eq!(diag.count(Stage::Check), 1);
//! assert!(diag.has_errors());
//! ```

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    /// The result contradicts the history
    Error,
}

/// Pipeline step that raised an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Apply,
    Check,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Apply => "apply",
            Stage::Check => "check",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    pub stage: Stage,
    pub message: String,
    /// Voltage level, topology or equipment the issue is about
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Multi-line detail such as a partition diff
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(severity: Severity, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            severity,
            stage,
            message: message.into(),
            location: None,
            detail: None,
        }
    }

    pub fn error(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, stage, message)
    }

    pub fn warning(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, stage, message)
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "[{severity}:{}] {}", self.stage, self.message)?;
        if let Some(location) = &self.location {
            write!(f, " at {location}")?;
        }
        // detail lines are indented under the headline
        if let Some(detail) = &self.detail {
            for line in detail.lines() {
                write!(f, "\n    {line}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    pub fn count(&self, stage: Stage) -> usize {
        self.issues.iter().filter(|i| i.stage == stage).count()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let errors = self.error_count();
        let warnings = self.issues.len() - errors;
        write!(f, "{errors} error(s), {warnings} warning(s)")?;
        for issue in &self.issues {
            write!(f, "\n  {issue}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_stage_and_severity() {
        let mut diag = Diagnostics::new();
        diag.add(DiagnosticIssue::warning(Stage::Apply, "equipment removed").at("GEN9"));
        diag.add(DiagnosticIssue::error(Stage::Check, "bus partition differs"));
        diag.add(DiagnosticIssue::error(Stage::Check, "bus partition differs"));

        assert_eq!(diag.count(Stage::Check), 2);
        assert_eq!(diag.count(Stage::Apply), 1);
        assert_eq!(diag.error_count(), 2);
        assert!(diag.has_errors());
        assert!(diag.to_string().starts_with("2 error(s), 1 warning(s)"));
    }

    #[test]
    fn test_issue_display_indents_detail() {
        let issue = DiagnosticIssue::error(Stage::Check, "bus partition differs")
            .at("VL2")
            .with_detail("expected: [A]\nactual:   [A, B]");
        assert_eq!(
            issue.to_string(),
            "[error:check] bus partition differs at VL2\n    expected: [A]\n    actual:   [A, B]"
        );
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let mut diag = Diagnostics::new();
        assert_eq!(serde_json::to_string(&diag).unwrap(), "{}");

        diag.add(DiagnosticIssue::error(Stage::Check, "bus partition differs").at("VL1"));
        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains(r#""stage":"check""#));
        assert!(json.contains(r#""location":"VL1""#));
        assert!(!json.contains("detail"));
    }
}
