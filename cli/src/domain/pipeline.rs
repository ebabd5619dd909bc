//! Pipeline vocabulary: preconditions and check results.

/// Result of a step's precondition check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    Ready,
    Unmet {
        reason: String,
        remediation: Option<String>,
    },
}

impl Precondition {
    #[must_use]
    pub fn unmet(reason: impl Into<String>, remediation: impl Into<String>) -> Self {
        Precondition::Unmet {
            reason: reason.into(),
            remediation: Some(remediation.into()),
        }
    }
}

/// How a failed check affects its step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The step cannot continue.
    Fatal,
    /// The step is skipped with a remediation; the run goes on.
    Advisory,
}

/// Outcome of one validation check.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct ValidationResult {
    pub check: String,
    pub passed: bool,
    pub diagnostic: String,
    pub severity: Severity,
    pub remediation: Option<String>,
}

impl ValidationResult {
    pub fn pass(check: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            passed: true,
            diagnostic: String::new(),
            severity: Severity::Fatal,
            remediation: None,
        }
    }

    pub fn fatal(check: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            passed: false,
            diagnostic: diagnostic.into(),
            severity: Severity::Fatal,
            remediation: None,
        }
    }

    pub fn advisory(
        check: impl Into<String>,
        diagnostic: impl Into<String>,
        remediation: impl Into<String>,
    ) -> Self {
        Self {
            check: check.into(),
            passed: false,
            diagnostic: diagnostic.into(),
            severity: Severity::Advisory,
            remediation: Some(remediation.into()),
        }
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    #[must_use]
    pub fn is_fatal_failure(&self) -> bool {
        !self.passed && self.severity == Severity::Fatal
    }
}
