use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum StepId {
    Prerequisites,
    InputResolution,
    HostIdentity,
    AuthoritativeDns,
    MailSigning,
    CertificateIssuance,
    Summary,
}

impl StepId {
    /// Every stage of a full run, in order.
    pub const SEQUENCE: [StepId; 7] = [
        StepId::Prerequisites,
        StepId::InputResolution,
        StepId::HostIdentity,
        StepId::AuthoritativeDns,
        StepId::MailSigning,
        StepId::CertificateIssuance,
        StepId::Summary,
    ];

    /// Stable kebab-case name used in logs, flags and JSON.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StepId::Prerequisites => "prerequisites",
            StepId::InputResolution => "input-resolution",
            StepId::HostIdentity => "host-identity",
            StepId::AuthoritativeDns => "authoritative-dns",
            StepId::MailSigning => "mail-signing",
            StepId::CertificateIssuance => "certificate-issuance",
            StepId::Summary => "summary",
        }
    }

    /// Whether the stage can be run on its own with `--step`.
    ///
    /// Input resolution and the summary are orchestrator stages, not steps.
    #[must_use]
    pub fn is_runnable(self) -> bool {
        !matches!(self, StepId::InputResolution | StepId::Summary)
    }

    /// Skip and failure policy for the stage.
    #[must_use]
    pub fn policy(self) -> StepPolicy {
        match self {
            StepId::CertificateIssuance => StepPolicy {
                skippable: true,
                fatal: false,
            },
            _ => StepPolicy {
                skippable: false,
                fatal: true,
            },
        }
    }
}

/// How the orchestrator treats an unmet precondition or a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPolicy {
    /// An unmet precondition records `Skipped` instead of aborting.
    pub skippable: bool,
    /// A failure aborts the run instead of recording `Failed`.
    pub fatal: bool,
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure taxonomy surfaced in reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    Input,
    Write,
    Validation,
    Service,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorClass::Input => "input",
            ErrorClass::Write => "write",
            ErrorClass::Validation => "validation",
            ErrorClass::Service => "service",
        };
        f.write_str(s)
    }
}

/// What happened to a single stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The full cycle ran and every check passed.
    Applied {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        notes: Vec<String>,
    },
    /// The precondition was not met on a skippable step.
    Skipped {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        remediation: Option<String>,
    },
    /// The step failed. Fatal for the run only when the step is fatal.
    Failed { class: ErrorClass, message: String },
}

impl StepOutcome {
    #[must_use]
    pub fn applied() -> Self {
        StepOutcome::Applied { notes: Vec::new() }
    }

    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, StepOutcome::Applied { .. })
    }

    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, StepOutcome::Skipped { .. })
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, StepOutcome::Failed { .. })
    }
}

/// One line of the run report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepRecord {
    pub step: StepId,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// How the run ended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Terminal {
    /// Every step was attempted and every fatal step succeeded.
    Completed,
    /// A fatal step failed; nothing after it ran.
    Aborted {
        step: StepId,
        class: ErrorClass,
        reason: String,
    },
}

/// Full record of a provisioning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub records: Vec<StepRecord>,
    pub terminal: Terminal,
    /// Records the operator has to publish outside this host.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub publish: Vec<String>,
}

impl PipelineReport {
    #[must_use]
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: None,
            domain: None,
            records: Vec::new(),
            terminal: Terminal::Completed,
            publish: Vec::new(),
        }
    }

    pub fn record(&mut self, step: StepId, outcome: StepOutcome) {
        self.records.push(StepRecord { step, outcome });
    }

    /// Outcome recorded for `step`, if the step ran.
    #[must_use]
    pub fn outcome(&self, step: StepId) -> Option<&StepOutcome> {
        self.records
            .iter()
            .find(|r| r.step == step)
            .map(|r| &r.outcome)
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.terminal == Terminal::Completed
    }

    /// Process exit status for this report.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.terminal {
            Terminal::Completed => 0,
            Terminal::Aborted { .. } => 1,
        }
    }
}
