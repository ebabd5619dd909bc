//! TLS certificate for the domain, `www` and the mail host.

use anyhow::Result;
use hostkit_common::StepId;

use super::mail_signing::TRANSFER_AGENT_UNIT;
use super::{Step, StepEnv};
use crate::application::ports::HostSystem;
use crate::application::services::config_writer::apply_transfer_agent_settings;
use crate::application::services::ensure::ensure_directory;
use crate::application::services::process::{LONG_CMD_TIMEOUT, run_checked_with_timeout};
use crate::application::services::service_control::reload_and_confirm;
use crate::application::services::validator::{validate_config, validate_network};
use crate::domain::postfix::tls_settings;
use crate::domain::{ArtifactPaths, Field, Precondition, ProvisioningContext, ValidationResult};

/// Web server answering the HTTP-01 challenge from the webroot.
pub const WEB_UNIT: &str = "nginx";

pub struct CertificateStep<'a> {
    pub ctx: &'a ProvisioningContext,
}

impl<H: HostSystem> Step<H> for CertificateStep<'_> {
    fn id(&self) -> StepId {
        StepId::CertificateIssuance
    }

    fn required_fields(&self) -> &'static [Field] {
        &[Field::Domain, Field::ServerIp]
    }

    async fn precondition(&self, env: &StepEnv<'_, H>) -> Result<Precondition> {
        if !self.ctx.install_ssl() {
            return Ok(Precondition::unmet(
                "certificate installation was declined",
                "set install_ssl: true in the config and re-run with --step certificate-issuance",
            ));
        }

        // Every blocker goes into one skip.
        let mut reasons = Vec::new();
        let mut fixes = Vec::new();
        let network = validate_network(env.host, self.ctx, StepId::CertificateIssuance).await;
        if !network.passed {
            reasons.push(network.diagnostic);
            fixes.extend(network.remediation);
        }
        let web = env.host.run("systemctl", &["is-active", WEB_UNIT]).await?;
        if String::from_utf8_lossy(&web.stdout).trim() != "active" {
            reasons.push(format!("{WEB_UNIT} is not running to answer the challenge"));
            fixes.push(format!("systemctl start {WEB_UNIT}, then re-run with --step certificate-issuance"));
        }

        if reasons.is_empty() {
            return Ok(Precondition::Ready);
        }
        Ok(Precondition::Unmet {
            reason: reasons.join("; "),
            remediation: Some(fixes.join("; ")),
        })
    }

    async fn apply(&self, env: &StepEnv<'_, H>) -> Result<Vec<String>> {
        let domain = self.ctx.domain();
        let webroot = env.paths.webroot();
        ensure_directory(env.host, &webroot)?;

        let webroot = webroot.display().to_string();
        let email = self.ctx.postmaster();
        let names = self.ctx.certificate_names();
        let mut args = vec![
            "certonly",
            "--webroot",
            "-w",
            webroot.as_str(),
            "--non-interactive",
            "--agree-tos",
            "--keep-until-expiring",
            "-m",
            email.as_str(),
            "--cert-name",
            domain,
        ];
        for name in &names {
            args.push("-d");
            args.push(name.as_str());
        }
        env.reporter.step("requesting certificate");
        run_checked_with_timeout(env.host, "certbot", &args, LONG_CMD_TIMEOUT).await?;

        let host = ArtifactPaths::default();
        apply_transfer_agent_settings(
            env.host,
            &tls_settings(&host.certificate_chain(domain), &host.certificate_key(domain)),
        )
        .await?;
        Ok(vec![format!("certificate covers {}", names.join(", "))])
    }

    async fn validate(&self, env: &StepEnv<'_, H>) -> ValidationResult {
        validate_config(env.host, env.paths, self.ctx, StepId::CertificateIssuance).await
    }

    async fn restart(&self, env: &StepEnv<'_, H>) -> Result<()> {
        reload_and_confirm(env.host, TRANSFER_AGENT_UNIT).await
    }
}
