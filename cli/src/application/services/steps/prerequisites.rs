//! Root check and package installation.

use anyhow::Result;
use hostkit_common::StepId;

use super::{Step, StepEnv};
use crate::application::ports::HostSystem;
use crate::application::services::process::{LONG_CMD_TIMEOUT, run_checked_with_timeout};
use crate::application::services::validator::{is_installed, validate_packages};
use crate::domain::{Precondition, ValidationResult};
use crate::templates;

/// Installs the packages every later step depends on.
///
/// Writes no configuration and needs no inputs.
pub struct PrerequisitesStep;

impl<H: HostSystem> Step<H> for PrerequisitesStep {
    fn id(&self) -> StepId {
        StepId::Prerequisites
    }

    async fn precondition(&self, env: &StepEnv<'_, H>) -> Result<Precondition> {
        let uid = match env.host.run("id", &["-u"]).await {
            Ok(out) => String::from_utf8_lossy(&out.stdout).trim().to_string(),
            Err(e) => {
                return Ok(Precondition::unmet(
                    format!("cannot determine the current user: {e:#}"),
                    "run hostkit on a Debian or Ubuntu host as root",
                ));
            }
        };
        if uid == "0" {
            Ok(Precondition::Ready)
        } else {
            Ok(Precondition::unmet(
                format!("running as uid {uid}, root is required"),
                "re-run with sudo",
            ))
        }
    }

    async fn apply(&self, env: &StepEnv<'_, H>) -> Result<Vec<String>> {
        let mut missing = Vec::new();
        for pkg in templates::required_packages()? {
            if !is_installed(env.host, pkg).await {
                missing.push(pkg);
            }
        }
        if missing.is_empty() {
            return Ok(vec!["all packages already installed".to_string()]);
        }

        tracing::info!(packages = ?missing, "installing packages");
        env.reporter
            .step(&format!("installing {}", missing.join(", ")));
        run_checked_with_timeout(env.host, "apt-get", &["update", "-q"], LONG_CMD_TIMEOUT).await?;
        let mut args = vec!["install", "-y", "-q", "--no-install-recommends"];
        args.extend(missing.iter().copied());
        run_checked_with_timeout(env.host, "apt-get", &args, LONG_CMD_TIMEOUT).await?;
        Ok(vec![format!("installed {}", missing.join(", "))])
    }

    async fn validate(&self, env: &StepEnv<'_, H>) -> ValidationResult {
        validate_packages(env.host).await
    }

    async fn restart(&self, _env: &StepEnv<'_, H>) -> Result<()> {
        Ok(())
    }
}
