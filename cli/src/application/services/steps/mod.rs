//! Pipeline steps.
//!
//! Every step runs the same cycle: precondition, apply, validate, commit,
//! restart.
//! The orchestrator owns the policy that decides what a failure in each
//! phase means; steps only report what happened.

use anyhow::Result;
use chrono::NaiveDate;
use hostkit_common::StepId;

use crate::application::ports::{HostSystem, ProgressReporter};
use crate::domain::{ArtifactPaths, Field, Precondition, ValidationResult};

pub mod certificate;
pub mod dns;
pub mod host_identity;
pub mod mail_signing;
pub mod prerequisites;

pub use certificate::CertificateStep;
pub use dns::DnsStep;
pub use host_identity::HostIdentityStep;
pub use mail_signing::MailSigningStep;
pub use prerequisites::PrerequisitesStep;

/// What a step runs against.
pub struct StepEnv<'a, H> {
    pub host: &'a H,
    pub paths: &'a ArtifactPaths,
    pub reporter: &'a dyn ProgressReporter,
    /// Calendar date for zone serials.
    pub today: NaiveDate,
}

/// One idempotent configuration step.
///
/// Steps that need inputs borrow the resolved context at construction.
#[allow(async_fn_in_trait)]
pub trait Step<H: HostSystem> {
    fn id(&self) -> StepId;

    /// Context fields that must be non-empty before the step runs.
    fn required_fields(&self) -> &'static [Field] {
        &[]
    }

    /// Whether the step can run at all on this host right now.
    async fn precondition(&self, env: &StepEnv<'_, H>) -> Result<Precondition>;

    /// Write configuration. Returns notes for the report.
    async fn apply(&self, env: &StepEnv<'_, H>) -> Result<Vec<String>>;

    /// Check what `apply` wrote, before anything is restarted.
    async fn validate(&self, env: &StepEnv<'_, H>) -> ValidationResult;

    /// Move staged artifacts over the live ones once `validate` let them through.
    async fn commit(&self, _env: &StepEnv<'_, H>) -> Result<()> {
        Ok(())
    }

    /// Make the running services pick up the new configuration.
    async fn restart(&self, env: &StepEnv<'_, H>) -> Result<()>;
}

/// `written`/`unchanged` counts for a batch of artifacts.
pub(crate) fn summarize_writes(
    artifacts: &[crate::application::services::config_writer::WrittenArtifact],
) -> String {
    use crate::application::services::config_writer::WriteOutcome;
    let written = artifacts
        .iter()
        .filter(|a| a.outcome != WriteOutcome::Unchanged)
        .count();
    format!(
        "{written} file(s) written, {} unchanged",
        artifacts.len() - written
    )
}

/// Enable `service` at boot, reporting failure as a warning only.
pub(crate) async fn enable_quietly<H: HostSystem>(env: &StepEnv<'_, H>, service: &str) {
    if let Err(e) = crate::application::services::service_control::enable(env.host, service).await {
        tracing::warn!(service, error = %e, "could not enable at boot");
        env.reporter
            .warn(&format!("{service} is not enabled at boot: {e}"));
    }
}
