//! Application service: restart or reload a unit and confirm it came up.
//!
//! Confirmation is a single `systemctl is-active` query after the action.

use anyhow::{Context, Result};

use crate::application::ports::CommandRunner;
use crate::application::services::process::{describe_status, diagnostic};
use crate::domain::ProvisionError;

/// Where to look when `service` fails.
#[must_use]
pub fn log_hint(service: &str) -> String {
    format!("journalctl -u {service} --no-pager -n 50")
}

async fn active_state(runner: &impl CommandRunner, service: &str) -> Result<String> {
    let out = runner
        .run("systemctl", &["is-active", service])
        .await
        .with_context(|| format!("querying state of {service}"))?;
    let state = String::from_utf8_lossy(&out.stdout).trim().to_string();
    Ok(if state.is_empty() {
        "unknown".to_string()
    } else {
        state
    })
}

async fn act_and_confirm(
    runner: &impl CommandRunner,
    service: &str,
    action: &'static str,
) -> Result<()> {
    tracing::info!(service, action, "service action");
    let out = runner
        .run("systemctl", &[action, service])
        .await
        .with_context(|| format!("running systemctl {action} {service}"))?;
    if !out.status.success() {
        tracing::warn!(
            service,
            action,
            status = %describe_status(out.status),
            stderr = %diagnostic(&out),
            "systemctl reported failure"
        );
    }

    let state = active_state(runner, service).await?;
    if out.status.success() && state == "active" {
        tracing::info!(service, "active");
        return Ok(());
    }
    tracing::error!(service, action, state = %state, "service not active");
    Err(ProvisionError::Service {
        service: service.to_string(),
        action,
        state,
        log_hint: log_hint(service),
    }
    .into())
}

/// `systemctl restart` then require `active`.
///
/// # Errors
///
/// Returns `ProvisionError::Service` naming the observed state and the log
/// source when the unit is not active afterwards.
pub async fn restart_and_confirm(runner: &impl CommandRunner, service: &str) -> Result<()> {
    act_and_confirm(runner, service, "restart").await
}

/// `systemctl reload` then require `active`.
///
/// # Errors
///
/// Returns `ProvisionError::Service` when the unit is not active afterwards.
pub async fn reload_and_confirm(runner: &impl CommandRunner, service: &str) -> Result<()> {
    act_and_confirm(runner, service, "reload").await
}

/// Start `service` on boot.
///
/// # Errors
///
/// Returns `ProvisionError::Command` if `systemctl enable` fails.
pub async fn enable(runner: &impl CommandRunner, service: &str) -> Result<()> {
    crate::application::services::process::run_checked(runner, "systemctl", &["enable", service])
        .await
        .map(drop)
}
