//! Application service: run the provisioning pipeline.
//!
//! Imports only from `crate::domain` and `crate::application`.
//! The run never returns an error: every failure ends up in the report,
//! either as a `Failed`/`Skipped` record or as the `Aborted` terminal state.

use chrono::{NaiveDate, Utc};
use hostkit_common::{ErrorClass, PipelineReport, StepId, StepOutcome, Terminal};

use crate::application::ports::{ConfigStore, HostSystem, ProgressReporter, Prompter};
use crate::application::services::config_writer::published_dkim_value;
use crate::application::services::input::resolve_context;
use crate::application::services::steps::{
    CertificateStep, DnsStep, HostIdentityStep, MailSigningStep, PrerequisitesStep, Step, StepEnv,
};
use crate::application::services::validator::check_public_address;
use crate::domain::dns::{dkim_record_name, fqdn, registrar_glue};
use crate::domain::error::classify;
use crate::domain::{ArtifactPaths, Precondition, ProvisionError, ProvisioningContext};

/// Everything a run needs besides the host.
pub struct RunOptions<'a> {
    pub paths: &'a ArtifactPaths,
    pub reporter: &'a dyn ProgressReporter,
    /// Prompt for missing answers instead of failing.
    pub interactive: bool,
    /// Calendar date for zone serials.
    pub today: NaiveDate,
}

impl RunOptions<'_> {
    fn env<'a, H>(&'a self, host: &'a H) -> StepEnv<'a, H> {
        StepEnv {
            host,
            paths: self.paths,
            reporter: self.reporter,
            today: self.today,
        }
    }
}

enum Flow {
    Continue,
    Abort,
}

fn abort(report: &mut PipelineReport, step: StepId, class: ErrorClass, reason: String) -> Flow {
    tracing::error!(step = %step, class = %class, reason = %reason, "pipeline aborted");
    report.record(
        step,
        StepOutcome::Failed {
            class,
            message: reason.clone(),
        },
    );
    report.terminal = Terminal::Aborted {
        step,
        class,
        reason,
    };
    Flow::Abort
}

/// Apply the step's failure policy to an error from one of its phases.
fn fail(
    report: &mut PipelineReport,
    reporter: &dyn ProgressReporter,
    step: StepId,
    class: ErrorClass,
    message: String,
) -> Flow {
    if step.policy().fatal {
        return abort(report, step, class, message);
    }
    tracing::warn!(step = %step, class = %class, message = %message, "step failed, continuing");
    reporter.warn(&format!("{step} failed: {message}"));
    report.record(step, StepOutcome::Failed { class, message });
    Flow::Continue
}

fn skip(
    report: &mut PipelineReport,
    reporter: &dyn ProgressReporter,
    step: StepId,
    reason: String,
    remediation: Option<String>,
) -> Flow {
    tracing::warn!(step = %step, reason = %reason, remediation = ?remediation, "step skipped");
    reporter.warn(&format!("{step} skipped: {reason}"));
    report.record(
        step,
        StepOutcome::Skipped {
            reason,
            remediation,
        },
    );
    Flow::Continue
}

/// One full precondition → apply → validate → commit → restart cycle.
async fn execute<H: HostSystem, S: Step<H>>(
    step: &S,
    env: &StepEnv<'_, H>,
    ctx: Option<&ProvisioningContext>,
    report: &mut PipelineReport,
) -> Flow {
    let id = step.id();
    let policy = id.policy();
    let reporter = env.reporter;
    reporter.step(&format!("{id}..."));
    tracing::info!(step = %id, "step started");

    if let Some(Err(e)) = ctx.map(|c| c.require(step.required_fields())) {
        return abort(report, id, ErrorClass::Input, e.to_string());
    }

    match step.precondition(env).await {
        Ok(Precondition::Ready) => {}
        Ok(Precondition::Unmet {
            reason,
            remediation,
        }) => {
            if policy.skippable {
                return skip(report, reporter, id, reason, remediation);
            }
            let reason = match remediation {
                Some(fix) => format!("{reason} ({fix})"),
                None => reason,
            };
            return abort(report, id, ErrorClass::Validation, reason);
        }
        Err(e) => return fail(report, reporter, id, classify(&e), format!("{e:#}")),
    }

    let notes = match step.apply(env).await {
        Ok(notes) => notes,
        Err(e) => return fail(report, reporter, id, classify(&e), format!("{e:#}")),
    };

    let check = step.validate(env).await;
    if check.is_fatal_failure() {
        // Staged artifacts stay staged and nothing is restarted.
        let err = ProvisionError::Validation {
            check: check.check,
            diagnostic: check.diagnostic,
        };
        return fail(report, reporter, id, err.class(), err.to_string());
    }
    if !check.passed {
        let message = format!("{} failed: {}", check.check, check.diagnostic);
        if policy.skippable {
            return skip(report, reporter, id, message, check.remediation);
        }
        tracing::warn!(step = %id, check = %check.check, "advisory check failed");
        reporter.warn(&message);
    }

    if let Err(e) = step.commit(env).await {
        return fail(report, reporter, id, classify(&e), format!("{e:#}"));
    }

    if let Err(e) = step.restart(env).await {
        return fail(report, reporter, id, classify(&e), format!("{e:#}"));
    }

    tracing::info!(step = %id, notes = ?notes, "step applied");
    reporter.success(&format!("{id} applied"));
    report.record(id, StepOutcome::Applied { notes });
    Flow::Continue
}

/// Resolve inputs, recording the stage. `None` means the run was aborted.
fn resolve_stage(
    store: &impl ConfigStore,
    prompter: &impl Prompter,
    opts: &RunOptions<'_>,
    report: &mut PipelineReport,
) -> Option<ProvisioningContext> {
    match resolve_context(store, prompter, opts.interactive) {
        Ok(ctx) => {
            report.domain = Some(ctx.domain().to_string());
            report.record(
                StepId::InputResolution,
                StepOutcome::Applied {
                    notes: vec![format!("answers from {}", store.path().display())],
                },
            );
            opts.reporter.success("inputs resolved");
            Some(ctx)
        }
        Err(e) => {
            abort(report, StepId::InputResolution, classify(&e), format!("{e:#}"));
            None
        }
    }
}

/// Records the operator has to publish outside this host.
fn publish_list(host: &impl HostSystem, paths: &ArtifactPaths, ctx: &ProvisioningContext) -> Vec<String> {
    let mut publish = registrar_glue(ctx);
    if let Some(value) = published_dkim_value(host, paths, ctx.domain()) {
        publish.push(format!(
            "{}\tIN\tTXT\t\"{value}\"",
            fqdn(&dkim_record_name(ctx.domain()))
        ));
    }
    publish
}

/// Run every step in order.
pub async fn run_pipeline<H: HostSystem>(
    host: &H,
    store: &impl ConfigStore,
    prompter: &impl Prompter,
    opts: &RunOptions<'_>,
) -> PipelineReport {
    let mut report = PipelineReport::new(Utc::now());
    let env = opts.env(host);

    if let Flow::Abort = execute(&PrerequisitesStep, &env, None, &mut report).await {
        return finish(report);
    }

    let Some(ctx) = resolve_stage(store, prompter, opts, &mut report) else {
        return finish(report);
    };

    let public = check_public_address(host, &ctx).await;
    if !public.passed {
        tracing::warn!(diagnostic = %public.diagnostic, "public address check");
        opts.reporter.warn(&public.diagnostic);
    }

    let ctx = &ctx;
    let flow = async {
        if let Flow::Abort = execute(&HostIdentityStep { ctx }, &env, Some(ctx), &mut report).await {
            return Flow::Abort;
        }
        if let Flow::Abort = execute(&DnsStep { ctx }, &env, Some(ctx), &mut report).await {
            return Flow::Abort;
        }
        if let Flow::Abort = execute(&MailSigningStep { ctx }, &env, Some(ctx), &mut report).await {
            return Flow::Abort;
        }
        execute(&CertificateStep { ctx }, &env, Some(ctx), &mut report).await
    }
    .await;

    if let Flow::Continue = flow {
        report.publish = publish_list(host, opts.paths, ctx);
        report.record(StepId::Summary, StepOutcome::applied());
    }
    finish(report)
}

/// Run a single step after resolving inputs.
///
/// Ordering against the other steps is not enforced.
pub async fn run_single<H: HostSystem>(
    host: &H,
    store: &impl ConfigStore,
    prompter: &impl Prompter,
    opts: &RunOptions<'_>,
    step: StepId,
) -> PipelineReport {
    let mut report = PipelineReport::new(Utc::now());
    let env = opts.env(host);

    if !step.is_runnable() {
        abort(
            &mut report,
            step,
            ErrorClass::Input,
            format!("{step} is not a step that can run on its own"),
        );
        return finish(report);
    }

    tracing::warn!(step = %step, "single-step run, ordering against other steps is the caller's risk");
    opts.reporter.warn(&format!(
        "running only {step}; earlier steps are assumed to have run"
    ));

    if step == StepId::Prerequisites {
        execute(&PrerequisitesStep, &env, None, &mut report).await;
        return finish(report);
    }

    let Some(ctx) = resolve_stage(store, prompter, opts, &mut report) else {
        return finish(report);
    };
    let ctx = &ctx;
    let flow = match step {
        StepId::HostIdentity => execute(&HostIdentityStep { ctx }, &env, Some(ctx), &mut report).await,
        StepId::AuthoritativeDns => execute(&DnsStep { ctx }, &env, Some(ctx), &mut report).await,
        StepId::MailSigning => execute(&MailSigningStep { ctx }, &env, Some(ctx), &mut report).await,
        _ => execute(&CertificateStep { ctx }, &env, Some(ctx), &mut report).await,
    };
    if let Flow::Continue = flow {
        report.publish = publish_list(host, opts.paths, ctx);
    }
    finish(report)
}

fn finish(mut report: PipelineReport) -> PipelineReport {
    report.finished_at = Some(Utc::now());
    match &report.terminal {
        Terminal::Completed => tracing::info!("pipeline completed"),
        Terminal::Aborted { step, class, reason } => {
            tracing::error!(step = %step, class = %class, reason = %reason, "pipeline aborted at {step}: {reason}");
        }
    }
    report
}
