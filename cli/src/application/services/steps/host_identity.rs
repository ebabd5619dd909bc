//! Host name and `/etc/hosts` mapping for the mail host.

use anyhow::{Context, Result};
use hostkit_common::StepId;

use super::{Step, StepEnv, summarize_writes};
use crate::application::ports::HostSystem;
use crate::application::services::config_writer::write_host_identity;
use crate::application::services::ensure::ensure_directory;
use crate::application::services::process::run_checked;
use crate::application::services::validator::validate_config;
use crate::domain::hosts::HostIdentity;
use crate::domain::{Field, Precondition, ProvisionError, ProvisioningContext, ValidationResult};

pub struct HostIdentityStep<'a> {
    pub ctx: &'a ProvisioningContext,
}

impl<H: HostSystem> Step<H> for HostIdentityStep<'_> {
    fn id(&self) -> StepId {
        StepId::HostIdentity
    }

    fn required_fields(&self) -> &'static [Field] {
        &[Field::Domain, Field::ServerIp]
    }

    async fn precondition(&self, _env: &StepEnv<'_, H>) -> Result<Precondition> {
        Ok(Precondition::Ready)
    }

    async fn apply(&self, env: &StepEnv<'_, H>) -> Result<Vec<String>> {
        ensure_directory(env.host, &env.paths.host_path("/etc"))?;
        let identity = HostIdentity::for_context(self.ctx);
        let written = write_host_identity(env.host, env.paths, &identity)?;
        Ok(vec![summarize_writes(&written)])
    }

    async fn validate(&self, env: &StepEnv<'_, H>) -> ValidationResult {
        validate_config(env.host, env.paths, self.ctx, StepId::HostIdentity).await
    }

    async fn restart(&self, env: &StepEnv<'_, H>) -> Result<()> {
        let identity = HostIdentity::for_context(self.ctx);
        run_checked(env.host, "hostnamectl", &["set-hostname", identity.short_name.as_str()]).await?;
        let out = env
            .host
            .run("hostname", &["--fqdn"])
            .await
            .context("reading the host name back")?;
        let seen = String::from_utf8_lossy(&out.stdout).trim().to_string();
        if seen == identity.fqdn {
            tracing::info!(fqdn = %seen, "host name applied");
            return Ok(());
        }
        Err(ProvisionError::Service {
            service: "hostname".to_string(),
            action: "set-hostname",
            state: format!("reporting '{seen}' instead of '{}'", identity.fqdn),
            log_hint: "hostnamectl status".to_string(),
        }
        .into())
    }
}
