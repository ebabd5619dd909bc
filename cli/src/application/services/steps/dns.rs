//! Authoritative zones for the domain and its mail host.

use anyhow::Result;
use hostkit_common::StepId;

use super::{Step, StepEnv, enable_quietly, summarize_writes};
use crate::application::ports::HostSystem;
use crate::application::services::config_writer::{
    promote, published_dkim_value, write_zones, zone_targets,
};
use crate::application::services::ensure::ensure_directory;
use crate::application::services::service_control::restart_and_confirm;
use crate::application::services::validator::validate_config;
use crate::domain::{Field, Precondition, ProvisioningContext, ValidationResult};

/// systemd unit of the BIND name server.
pub const NAME_SERVER_UNIT: &str = "named";

pub struct DnsStep<'a> {
    pub ctx: &'a ProvisioningContext,
}

impl<H: HostSystem> Step<H> for DnsStep<'_> {
    fn id(&self) -> StepId {
        StepId::AuthoritativeDns
    }

    fn required_fields(&self) -> &'static [Field] {
        &[Field::Domain, Field::ServerIp]
    }

    async fn precondition(&self, env: &StepEnv<'_, H>) -> Result<Precondition> {
        let bind_dir = env.paths.bind_dir();
        if env.host.is_dir(&bind_dir) {
            return Ok(Precondition::Ready);
        }
        Ok(Precondition::unmet(
            format!("{} does not exist", bind_dir.display()),
            "install bind9 (apt-get install -y bind9) or re-run the prerequisites step",
        ))
    }

    async fn apply(&self, env: &StepEnv<'_, H>) -> Result<Vec<String>> {
        ensure_directory(env.host, &env.paths.zones_dir())?;
        // Keep a previously published signing key in the zone.
        let dkim = published_dkim_value(env.host, env.paths, self.ctx.domain());
        let zones = write_zones(env.host, env.paths, self.ctx, env.today, dkim.as_deref())?;
        Ok(vec![
            format!("zone serial {}", zones.serial),
            summarize_writes(&zones.artifacts),
        ])
    }

    async fn validate(&self, env: &StepEnv<'_, H>) -> ValidationResult {
        validate_config(env.host, env.paths, self.ctx, StepId::AuthoritativeDns).await
    }

    async fn commit(&self, env: &StepEnv<'_, H>) -> Result<()> {
        promote(env.host, &zone_targets(env.paths, self.ctx))?;
        Ok(())
    }

    async fn restart(&self, env: &StepEnv<'_, H>) -> Result<()> {
        enable_quietly(env, NAME_SERVER_UNIT).await;
        restart_and_confirm(env.host, NAME_SERVER_UNIT).await
    }
}
