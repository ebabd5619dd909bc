//! DKIM signing: key, OpenDKIM config, Postfix milter hand-off and the
//! public key in the zone.

use anyhow::Result;
use hostkit_common::StepId;

use super::dns::NAME_SERVER_UNIT;
use super::{Step, StepEnv, enable_quietly, summarize_writes};
use crate::application::ports::HostSystem;
use crate::application::services::config_writer::{
    apply_transfer_agent_settings, promote, published_dkim_value, signing_targets,
    write_signing_config, write_zones, zone_targets,
};
use crate::application::services::ensure::{EnsureOutcome, ensure_directory};
use crate::application::services::process::run_checked;
use crate::application::services::service_control::{reload_and_confirm, restart_and_confirm};
use crate::application::services::validator::validate_config;
use crate::domain::paths::DKIM_SELECTOR;
use crate::domain::postfix::milter_settings;
use crate::domain::{Field, Precondition, ProvisionError, ProvisioningContext, ValidationResult};

pub const SIGNING_UNIT: &str = "opendkim";
pub const TRANSFER_AGENT_UNIT: &str = "postfix";

const KEY_BITS: &str = "2048";

pub struct MailSigningStep<'a> {
    pub ctx: &'a ProvisioningContext,
}

impl MailSigningStep<'_> {
    /// Generate the signing key unless one already exists.
    async fn ensure_key<H: HostSystem>(&self, env: &StepEnv<'_, H>) -> Result<String> {
        let domain = self.ctx.domain();
        let key_dir = env.paths.dkim_key_dir(domain);
        ensure_directory(env.host, &key_dir)?;

        let private = env.paths.dkim_private_key(domain);
        if env.host.exists(&private) {
            tracing::info!(key = %private.display(), "signing key present, not regenerated");
            return Ok("existing signing key kept".to_string());
        }

        env.reporter.step("generating signing key");
        let dir = key_dir.display().to_string();
        run_checked(
            env.host,
            "opendkim-genkey",
            &["-b", KEY_BITS, "-d", domain, "-D", dir.as_str(), "-s", DKIM_SELECTOR],
        )
        .await?;
        env.host.set_mode(&private, 0o600)?;
        tracing::info!(key = %private.display(), "signing key generated");
        Ok("signing key generated".to_string())
    }
}

impl<H: HostSystem> Step<H> for MailSigningStep<'_> {
    fn id(&self) -> StepId {
        StepId::MailSigning
    }

    fn required_fields(&self) -> &'static [Field] {
        &[Field::Domain, Field::ServerIp]
    }

    async fn precondition(&self, env: &StepEnv<'_, H>) -> Result<Precondition> {
        let main_cf = env.paths.postfix_main_cf();
        if !env.host.exists(&main_cf) {
            return Ok(Precondition::unmet(
                format!("{} does not exist", main_cf.display()),
                "install postfix (apt-get install -y postfix) or re-run the prerequisites step",
            ));
        }
        if !env.host.is_dir(&env.paths.zones_dir()) {
            return Ok(Precondition::unmet(
                "the domain's zone has not been written yet",
                "run the authoritative-dns step first",
            ));
        }
        Ok(Precondition::Ready)
    }

    async fn apply(&self, env: &StepEnv<'_, H>) -> Result<Vec<String>> {
        let domain = self.ctx.domain();
        let opendkim_dir = env.paths.opendkim_dir();
        let mut notes = Vec::new();
        if ensure_directory(env.host, &opendkim_dir)? == EnsureOutcome::Created {
            notes.push(format!("created {}", opendkim_dir.display()));
        }
        notes.push(self.ensure_key(env).await?);

        let written = write_signing_config(env.host, env.paths, self.ctx)?;
        notes.push(summarize_writes(&written));

        let dir = opendkim_dir.display().to_string();
        run_checked(env.host, "chown", &["-R", "opendkim:opendkim", dir.as_str()]).await?;

        let txt = published_dkim_value(env.host, env.paths, domain).ok_or_else(|| {
            ProvisionError::Write {
                path: env.paths.dkim_public_record(domain).display().to_string(),
                reason: "no public key record found next to the signing key".to_string(),
            }
        })?;
        let zones = write_zones(env.host, env.paths, self.ctx, env.today, Some(&txt))?;
        notes.push(format!("public key published, zone serial {}", zones.serial));

        apply_transfer_agent_settings(env.host, &milter_settings(self.ctx)).await?;
        Ok(notes)
    }

    async fn validate(&self, env: &StepEnv<'_, H>) -> ValidationResult {
        let signing = validate_config(env.host, env.paths, self.ctx, StepId::MailSigning).await;
        if !signing.passed {
            return signing;
        }
        // The zone was rewritten with the public key.
        validate_config(env.host, env.paths, self.ctx, StepId::AuthoritativeDns).await
    }

    async fn commit(&self, env: &StepEnv<'_, H>) -> Result<()> {
        promote(env.host, &signing_targets(env.paths))?;
        promote(env.host, &zone_targets(env.paths, self.ctx))?;
        Ok(())
    }

    async fn restart(&self, env: &StepEnv<'_, H>) -> Result<()> {
        enable_quietly(env, SIGNING_UNIT).await;
        enable_quietly(env, TRANSFER_AGENT_UNIT).await;
        restart_and_confirm(env.host, SIGNING_UNIT).await?;
        restart_and_confirm(env.host, TRANSFER_AGENT_UNIT).await?;
        reload_and_confirm(env.host, NAME_SERVER_UNIT).await
    }
}
