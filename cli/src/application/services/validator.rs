//! Application service: configuration and network checks per step.
//!
//! Checks never raise: a checker that cannot be spawned is a failing
//! result carrying the spawn error as its diagnostic.

use std::net::IpAddr;
use std::path::Path;

use hostkit_common::StepId;

use crate::application::ports::{CommandRunner, HostSystem, NameResolver};
use crate::application::services::config_writer::pending;
use crate::application::services::process::diagnostic;
use crate::domain::dns::fqdn;
use crate::domain::hosts::{self, HostIdentity};
use crate::domain::{ArtifactPaths, ProvisioningContext, ValidationResult};
use crate::templates;

async fn run_check(
    runner: &impl CommandRunner,
    check: &str,
    program: &str,
    args: &[&str],
) -> ValidationResult {
    match runner.run(program, args).await {
        Ok(out) if out.status.success() => {
            tracing::info!(check, "check passed");
            ValidationResult::pass(check)
        }
        Ok(out) => {
            let diag = diagnostic(&out);
            tracing::error!(check, diagnostic = %diag, "check failed");
            ValidationResult::fatal(check, diag)
        }
        Err(e) => {
            tracing::error!(check, error = %e, "checker could not run");
            ValidationResult::fatal(check, format!("cannot run {program}: {e:#}"))
        }
    }
}

/// Whether dpkg reports `package` as installed.
pub async fn is_installed(runner: &impl CommandRunner, package: &str) -> bool {
    runner
        .run("dpkg-query", &["-W", "-f=${Status}", package])
        .await
        .is_ok_and(|o| {
            o.status.success()
                && String::from_utf8_lossy(&o.stdout).contains("install ok installed")
        })
}

/// Every required package is installed.
pub async fn validate_packages(runner: &impl CommandRunner) -> ValidationResult {
    let packages = match templates::required_packages() {
        Ok(p) => p,
        Err(e) => return ValidationResult::fatal("dpkg-query", format!("{e:#}")),
    };
    for pkg in packages {
        if !is_installed(runner, pkg).await {
            return ValidationResult::fatal("dpkg-query", format!("package {pkg} is not installed"))
                .with_remediation(format!("apt-get install -y {pkg}"));
        }
    }
    ValidationResult::pass("dpkg-query")
}

fn check_host_identity(
    host: &impl HostSystem,
    paths: &ArtifactPaths,
    ctx: &ProvisioningContext,
) -> ValidationResult {
    let identity = HostIdentity::for_context(ctx);
    let check = "hosts mapping";
    let text = match host.read_to_string(&paths.hosts_file()) {
        Ok(t) => t,
        Err(e) => return ValidationResult::fatal(check, format!("{e:#}")),
    };
    match hosts::lookup(&text, &identity.fqdn) {
        Some(ip) if ip == identity.address => ValidationResult::pass(check),
        Some(ip) => ValidationResult::fatal(
            check,
            format!("{} maps to {ip}, expected {}", identity.fqdn, identity.address),
        ),
        None => ValidationResult::fatal(
            check,
            format!("{} is not mapped in {}", identity.fqdn, paths.hosts_file().display()),
        ),
    }
}

/// Run the external checker for `step` against the artifacts just written.
///
/// Staged zones and signing config are checked in place of the live ones.
pub async fn validate_config(
    host: &impl HostSystem,
    paths: &ArtifactPaths,
    ctx: &ProvisioningContext,
    step: StepId,
) -> ValidationResult {
    match step {
        StepId::Prerequisites => validate_packages(host).await,
        StepId::HostIdentity => check_host_identity(host, paths, ctx),
        StepId::AuthoritativeDns => {
            let root = paths.root().display().to_string();
            let checkconf_args: Vec<&str> = if paths.root() == Path::new("/") {
                Vec::new()
            } else {
                vec!["-t", root.as_str()]
            };
            let conf = run_check(host, "named-checkconf", "named-checkconf", &checkconf_args).await;
            if !conf.passed {
                return conf;
            }
            for zone in [ctx.domain().to_string(), ctx.mail_host()] {
                let file = pending(host, &paths.zone_file(&zone)).display().to_string();
                let result =
                    run_check(host, "named-checkzone", "named-checkzone", &[zone.as_str(), file.as_str()]).await;
                if !result.passed {
                    return result;
                }
            }
            ValidationResult::pass("named-checkzone")
        }
        StepId::MailSigning => {
            let conf = pending(host, &paths.opendkim_conf()).display().to_string();
            let signing = run_check(host, "opendkim -n", "opendkim", &["-n", "-x", conf.as_str()]).await;
            if !signing.passed {
                return signing;
            }
            run_check(host, "postfix check", "postfix", &["check"]).await
        }
        StepId::CertificateIssuance => {
            let chain = paths.certificate_chain(ctx.domain());
            if !host.exists(&chain) {
                return ValidationResult::fatal(
                    "certificate",
                    format!("{} was not created", chain.display()),
                );
            }
            run_check(host, "postfix check", "postfix", &["check"]).await
        }
        StepId::InputResolution | StepId::Summary => ValidationResult::pass(step.as_str()),
    }
}

fn record_type(ip: IpAddr) -> &'static str {
    if ip.is_ipv4() { "A" } else { "AAAA" }
}

fn describe(addrs: &[IpAddr]) -> String {
    if addrs.is_empty() {
        "nothing".to_string()
    } else {
        addrs
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Check that every name the step needs resolves publicly to this server.
///
/// Only certificate issuance is gated; every other step passes.
pub async fn validate_network(
    resolver: &impl NameResolver,
    ctx: &ProvisioningContext,
    step: StepId,
) -> ValidationResult {
    let check = "public dns";
    if step != StepId::CertificateIssuance {
        return ValidationResult::pass(check);
    }
    let expected = ctx.server_ip();
    let [ns1, ns2] = ctx.ns_hosts();
    let mut problems = Vec::new();
    let mut fixes = Vec::new();
    for name in ctx.certificate_names() {
        let seen = match resolver.resolve(&name).await {
            Ok(addrs) => addrs,
            Err(e) => {
                tracing::warn!(name = %name, error = %e, "lookup failed");
                Vec::new()
            }
        };
        if seen.contains(&expected) {
            continue;
        }
        tracing::warn!(name = %name, seen = %describe(&seen), expected = %expected, "name does not resolve to this server");
        problems.push(format!("{name} resolves to {}", describe(&seen)));
        fixes.push(format!("{} IN {} {expected}", fqdn(&name), record_type(expected)));
    }
    if problems.is_empty() {
        return ValidationResult::pass(check);
    }
    ValidationResult::advisory(
        check,
        format!("{} (expected {expected})", problems.join("; ")),
        format!(
            "add {} at the registrar, or at the authoritative name servers {ns1} and {ns2} once the domain is delegated to them, then re-run with --step certificate-issuance",
            fixes.join(" and ")
        ),
    )
}

/// Compare the externally observed address with the declared one.
///
/// Never gates a step; a mismatch or an unreachable echo service is advisory.
pub async fn check_public_address(
    resolver: &impl NameResolver,
    ctx: &ProvisioningContext,
) -> ValidationResult {
    let check = "public address";
    match resolver.public_address().await {
        Ok(ip) if ip == ctx.server_ip() => ValidationResult::pass(check),
        Ok(ip) => ValidationResult::advisory(
            check,
            format!("this host reaches the internet as {ip}, declared server_ip is {}", ctx.server_ip()),
            "check server_ip in the config, or the NAT/port forwarding in front of this host",
        ),
        Err(e) => ValidationResult::advisory(
            check,
            format!("could not determine the public address: {e:#}"),
            "verify outbound HTTPS connectivity",
        ),
    }
}
