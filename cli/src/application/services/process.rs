//! Helpers for external commands whose failure is a mutation failure.

use std::process::{ExitStatus, Output};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::CommandRunner;
use crate::domain::ProvisionError;

/// Timeout for package installation and certificate issuance.
pub const LONG_CMD_TIMEOUT: Duration = Duration::from_secs(900);

/// Human-readable exit status.
#[must_use]
pub fn describe_status(status: ExitStatus) -> String {
    status
        .code()
        .map_or_else(|| "terminated by signal".to_string(), |c| format!("exit code {c}"))
}

/// Diagnostic text of a finished command: stderr, else stdout.
#[must_use]
pub fn diagnostic(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let text = if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout)
    } else {
        stderr
    };
    text.trim().to_string()
}

fn check(program: &str, output: Output) -> Result<Output> {
    if output.status.success() {
        return Ok(output);
    }
    Err(ProvisionError::Command {
        program: program.to_string(),
        status: describe_status(output.status),
        stderr: diagnostic(&output),
    }
    .into())
}

/// Run a command and turn a non-zero exit into `ProvisionError::Command`.
///
/// # Errors
///
/// Returns an error if the command cannot be spawned or exits non-zero.
pub async fn run_checked(
    runner: &impl CommandRunner,
    program: &str,
    args: &[&str],
) -> Result<Output> {
    let output = runner
        .run(program, args)
        .await
        .with_context(|| format!("running {program}"))?;
    check(program, output)
}

/// [`run_checked`] with an explicit timeout for long-running tools.
///
/// # Errors
///
/// Returns an error if the command cannot be spawned, times out or exits non-zero.
pub async fn run_checked_with_timeout(
    runner: &impl CommandRunner,
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<Output> {
    let output = runner
        .run_with_timeout(program, args, timeout)
        .await
        .with_context(|| format!("running {program}"))?;
    check(program, output)
}
