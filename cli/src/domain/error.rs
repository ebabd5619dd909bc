//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::application`,
//! `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use hostkit_common::ErrorClass;
use thiserror::Error;

// ── Provisioning errors ───────────────────────────────────────────────────────

/// Failures the pipeline reports by class.
///
/// Anything that reaches the orchestrator without one of these attached is
/// treated as a write-class failure of the step that raised it.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("missing required input: {}", .fields.join(", "))]
    MissingInput { fields: Vec<&'static str> },

    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("cannot write {path}: {reason}")]
    Write { path: String, reason: String },

    #[error("{program} failed ({status}): {stderr}")]
    Command {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("{check} rejected the configuration: {diagnostic}")]
    Validation { check: String, diagnostic: String },

    #[error("{service} is {state} after {action}. Check the logs: {log_hint}")]
    Service {
        service: String,
        action: &'static str,
        state: String,
        log_hint: String,
    },
}

impl ProvisionError {
    /// Report class for this error.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            ProvisionError::MissingInput { .. } | ProvisionError::InvalidInput { .. } => {
                ErrorClass::Input
            }
            ProvisionError::Write { .. } | ProvisionError::Command { .. } => ErrorClass::Write,
            ProvisionError::Validation { .. } => ErrorClass::Validation,
            ProvisionError::Service { .. } => ErrorClass::Service,
        }
    }
}

/// Classify an arbitrary error from a step.
#[must_use]
pub fn classify(err: &anyhow::Error) -> ErrorClass {
    err.chain()
        .find_map(|e| e.downcast_ref::<ProvisionError>())
        .map_or(ErrorClass::Write, ProvisionError::class)
}
