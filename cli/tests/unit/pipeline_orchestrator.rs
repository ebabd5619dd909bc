//! Pipeline orchestrator: ordering, skip and abort policy, idempotent re-runs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::NaiveDate;
use hostkit_cli::application::services::orchestrator::{RunOptions, run_pipeline, run_single};
use hostkit_cli::domain::ProvisionConfig;
use hostkit_cli::domain::dns::parse_serial;
use hostkit_cli::domain::paths::staged;
use hostkit_common::{ErrorClass, PipelineReport, StepId, StepOutcome, Terminal};

use crate::helpers::{DOMAIN, complete_config, err_output, ok_output};
use crate::mocks::{FakeHost, MemoryStore, RecordingReporter, silent_prompter};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
}

async fn full_run(host: &FakeHost, store: &MemoryStore) -> (PipelineReport, RecordingReporter) {
    let reporter = RecordingReporter::default();
    let paths = host.paths();
    let opts = RunOptions {
        paths: &paths,
        reporter: &reporter,
        interactive: false,
        today: today(),
    };
    let report = run_pipeline(host, store, &silent_prompter(), &opts).await;
    (report, reporter)
}

async fn single_run(
    host: &FakeHost,
    store: &MemoryStore,
    step: StepId,
) -> (PipelineReport, RecordingReporter) {
    let reporter = RecordingReporter::default();
    let paths = host.paths();
    let opts = RunOptions {
        paths: &paths,
        reporter: &reporter,
        interactive: false,
        today: today(),
    };
    let report = run_single(host, store, &silent_prompter(), &opts, step).await;
    (report, reporter)
}

fn steps(report: &PipelineReport) -> Vec<StepId> {
    report.records.iter().map(|r| r.step).collect()
}

fn aborted_at(report: &PipelineReport) -> (StepId, ErrorClass, String) {
    match &report.terminal {
        Terminal::Aborted {
            step,
            class,
            reason,
        } => (*step, *class, reason.clone()),
        Terminal::Completed => panic!("run completed: {report:#?}"),
    }
}

fn notes(report: &PipelineReport, step: StepId) -> Vec<String> {
    match report.outcome(step) {
        Some(StepOutcome::Applied { notes }) => notes.clone(),
        other => panic!("{step} was not applied: {other:?}"),
    }
}

// ── Full run ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_full_run_applies_every_step_in_order() {
    let host = FakeHost::new();
    let store = MemoryStore::with(complete_config());

    let (report, _) = full_run(&host, &store).await;

    assert!(report.is_completed(), "{report:#?}");
    assert_eq!(report.exit_code(), 0);
    assert_eq!(steps(&report), StepId::SEQUENCE.to_vec());
    assert!(report.records.iter().all(|r| r.outcome.is_applied()));
    assert_eq!(report.domain.as_deref(), Some(DOMAIN));
    assert!(report.finished_at.is_some());
    assert!(!host.ran("apt-get"), "every package was already installed");
}

#[tokio::test]
async fn test_full_run_publishes_glue_and_signing_key() {
    let host = FakeHost::new();
    let store = MemoryStore::with(complete_config());

    let (report, _) = full_run(&host, &store).await;

    assert_eq!(report.publish[0], "ns1.example.com.\tIN\tA\t10.0.0.5");
    assert_eq!(report.publish[1], "ns2.example.com.\tIN\tA\t10.0.0.5");
    let dkim = &report.publish[2];
    assert!(dkim.starts_with("mail._domainkey.example.com.\tIN\tTXT\t\"v=DKIM1;"), "{dkim}");
}

#[tokio::test]
async fn test_services_restart_only_after_their_config_is_written() {
    let host = FakeHost::new();
    let store = MemoryStore::with(complete_config());

    full_run(&host, &store).await;

    let checkzone = host.position("named-checkzone").unwrap();
    let named = host.position("systemctl restart named").unwrap();
    let genkey = host.position("opendkim-genkey").unwrap();
    let opendkim_check = host.position("opendkim -n").unwrap();
    let opendkim = host.position("systemctl restart opendkim").unwrap();
    let certbot = host.position("certbot certonly").unwrap();
    assert!(checkzone < named);
    assert!(named < genkey);
    assert!(opendkim_check < opendkim);
    assert!(opendkim < certbot);
    assert!(host.ran("systemctl reload named"));
    assert!(host.ran("systemctl reload postfix"));
    assert!(host.ran("hostnamectl set-hostname mail"));
}

#[tokio::test]
async fn test_full_run_writes_zone_with_signing_key() {
    let host = FakeHost::new();
    let store = MemoryStore::with(complete_config());

    full_run(&host, &store).await;

    let paths = host.paths();
    let zone = host.read(&paths.zone_file(DOMAIN));
    assert!(zone.contains("mail._domainkey"), "{zone}");
    assert!(host.read(&paths.hosts_file()).contains("mail.example.com"));
    assert!(paths.certificate_chain(DOMAIN).exists());
    let certbot = host.calls().into_iter().find(|c| c.starts_with("certbot")).unwrap();
    assert!(certbot.contains("-d example.com -d www.example.com -d mail.example.com"), "{certbot}");
    assert!(certbot.contains("-m postmaster@example.com"), "{certbot}");
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let host = FakeHost::new();
    let store = MemoryStore::with(complete_config());
    let zone_path = host.paths().zone_file(DOMAIN);

    full_run(&host, &store).await;
    let first_serial = parse_serial(&host.read(&zone_path)).unwrap();
    let hosts_before = host.read(&host.paths().hosts_file());
    let (report, _) = full_run(&host, &store).await;

    assert!(report.is_completed(), "{report:#?}");
    assert_eq!(host.count("opendkim-genkey"), 1, "the signing key is generated once");
    assert!(
        notes(&report, StepId::MailSigning)
            .iter()
            .any(|n| n == "existing signing key kept")
    );
    let zone = host.read(&zone_path);
    assert!(parse_serial(&zone).unwrap() > first_serial);
    assert!(zone.contains("mail._domainkey"));
    assert_eq!(host.read(&host.paths().hosts_file()), hosts_before);
    assert!(
        notes(&report, StepId::HostIdentity)
            .iter()
            .any(|n| n.contains("0 file(s) written"))
    );
}

// ── Aborts ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_non_root_aborts_before_asking_anything() {
    let host = FakeHost::new();
    host.script("id -u", ok_output(b"1000\n"));
    let store = MemoryStore::empty();

    let (report, _) = full_run(&host, &store).await;

    let (step, class, reason) = aborted_at(&report);
    assert_eq!(step, StepId::Prerequisites);
    assert_eq!(class, ErrorClass::Validation);
    assert!(reason.contains("sudo"), "{reason}");
    assert_eq!(report.exit_code(), 1);
    assert_eq!(steps(&report), vec![StepId::Prerequisites]);
}

#[tokio::test]
async fn test_missing_package_is_installed_then_rechecked() {
    let host = FakeHost::new();
    host.script(
        "dpkg-query -W -f=${Status} postfix",
        ok_output(b"unknown ok not-installed"),
    );
    let store = MemoryStore::with(complete_config());

    let (report, _) = full_run(&host, &store).await;

    assert!(host.ran("apt-get update -q"));
    assert!(host.ran("apt-get install -y -q --no-install-recommends postfix"));
    let (step, class, reason) = aborted_at(&report);
    assert_eq!(step, StepId::Prerequisites);
    assert_eq!(class, ErrorClass::Validation);
    assert!(reason.contains("package postfix is not installed"), "{reason}");
}

#[tokio::test]
async fn test_failed_package_install_aborts_with_write_class() {
    let host = FakeHost::new();
    host.script("dpkg-query -W -f=${Status} nginx", ok_output(b""));
    host.script("apt-get install", err_output(100, b"E: Unable to locate package nginx"));
    let store = MemoryStore::with(complete_config());

    let (report, _) = full_run(&host, &store).await;

    let (step, class, reason) = aborted_at(&report);
    assert_eq!(step, StepId::Prerequisites);
    assert_eq!(class, ErrorClass::Write);
    assert!(reason.contains("Unable to locate package"), "{reason}");
}

#[tokio::test]
async fn test_missing_input_aborts_before_any_configuration_is_written() {
    let host = FakeHost::new();
    let store = MemoryStore::with(ProvisionConfig {
        admin_password: None,
        ..complete_config()
    });

    let (report, _) = full_run(&host, &store).await;

    let (step, class, reason) = aborted_at(&report);
    assert_eq!(step, StepId::InputResolution);
    assert_eq!(class, ErrorClass::Input);
    assert!(reason.contains("admin_password"), "{reason}");
    let paths = host.paths();
    assert!(!paths.zones_dir().exists());
    assert!(!paths.hosts_file().exists());
    assert!(!host.ran("systemctl"));
}

#[tokio::test]
async fn test_name_server_failing_to_start_stops_the_run() {
    let host = FakeHost::new();
    host.set_state("named", "failed");
    let store = MemoryStore::with(complete_config());

    let (report, _) = full_run(&host, &store).await;

    let (step, class, reason) = aborted_at(&report);
    assert_eq!(step, StepId::AuthoritativeDns);
    assert_eq!(class, ErrorClass::Service);
    assert!(reason.contains("journalctl -u named"), "{reason}");
    assert!(!host.ran("opendkim-genkey"));
    assert!(report.outcome(StepId::MailSigning).is_none());
    assert!(report.publish.is_empty());
}

#[tokio::test]
async fn test_rejected_zone_is_never_loaded() {
    let host = FakeHost::new();
    host.script(
        "named-checkzone example.com",
        err_output(1, b"dns_master_load: db.example.com:12: unexpected end of input"),
    );
    let store = MemoryStore::with(complete_config());

    let (report, _) = full_run(&host, &store).await;

    let (step, class, reason) = aborted_at(&report);
    assert_eq!(step, StepId::AuthoritativeDns);
    assert_eq!(class, ErrorClass::Validation);
    assert!(reason.contains("unexpected end of input"), "{reason}");
    assert!(!host.ran("systemctl restart named"));
}

#[tokio::test]
async fn test_rejected_zone_leaves_the_last_accepted_zone_live() {
    let host = FakeHost::new();
    let store = MemoryStore::with(complete_config());
    let zone_path = host.paths().zone_file(DOMAIN);
    let (first, _) = full_run(&host, &store).await;
    assert!(first.is_completed(), "{first:#?}");
    let accepted = host.read(&zone_path);
    let restarts = host.count("systemctl restart named");

    host.script(
        "named-checkzone example.com",
        err_output(1, b"dns_master_load: db.example.com:9: ns1.example.com: bad owner name"),
    );
    let (report, _) = full_run(&host, &store).await;

    let (step, class, _) = aborted_at(&report);
    assert_eq!(step, StepId::AuthoritativeDns);
    assert_eq!(class, ErrorClass::Validation);
    assert_eq!(host.read(&zone_path), accepted);
    assert_eq!(parse_serial(&accepted), Some(2_026_031_401));
    assert_eq!(host.count("systemctl restart named"), restarts);
    let rejected = host.read(&staged(&zone_path));
    assert_eq!(parse_serial(&rejected), Some(2_026_031_402));
}

#[tokio::test]
async fn test_signing_daemon_failure_names_the_log_source() {
    let host = FakeHost::new();
    host.set_state("opendkim", "activating");
    let store = MemoryStore::with(complete_config());

    let (report, _) = full_run(&host, &store).await;

    let (step, class, reason) = aborted_at(&report);
    assert_eq!(step, StepId::MailSigning);
    assert_eq!(class, ErrorClass::Service);
    assert!(reason.contains("opendkim is activating after restart"), "{reason}");
    assert!(!host.ran("certbot"));
}

// ── Certificate issuance ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_unresolved_mail_host_skips_certificate_with_remediation() {
    let host = FakeHost::new();
    host.unresolve("mail.example.com");
    let store = MemoryStore::with(complete_config());

    let (report, reporter) = full_run(&host, &store).await;

    assert!(report.is_completed(), "{report:#?}");
    assert_eq!(report.exit_code(), 0);
    match report.outcome(StepId::CertificateIssuance) {
        Some(StepOutcome::Skipped {
            reason,
            remediation,
        }) => {
            assert!(reason.contains("mail.example.com resolves to nothing"), "{reason}");
            let fix = remediation.as_deref().unwrap();
            assert!(fix.contains("mail.example.com. IN A 10.0.0.5"), "{fix}");
        }
        other => panic!("expected a skip, got {other:?}"),
    }
    assert!(!host.ran("certbot"));
    assert!(!host.ran("systemctl reload postfix"));
    assert!(report.outcome(StepId::Summary).is_some());
    assert!(
        reporter
            .warnings()
            .iter()
            .any(|w| w.starts_with("certificate-issuance skipped"))
    );
}

#[tokio::test]
async fn test_declined_certificate_is_skipped() {
    let host = FakeHost::new();
    let store = MemoryStore::with(ProvisionConfig {
        install_ssl: Some(false),
        ..complete_config()
    });

    let (report, _) = full_run(&host, &store).await;

    assert!(report.is_completed());
    assert!(
        report
            .outcome(StepId::CertificateIssuance)
            .is_some_and(StepOutcome::is_skipped)
    );
    assert!(!host.ran("systemctl is-active nginx"));
}

#[tokio::test]
async fn test_stopped_web_server_skips_certificate() {
    let host = FakeHost::new();
    host.set_state("nginx", "inactive");
    let store = MemoryStore::with(complete_config());

    let (report, _) = full_run(&host, &store).await;

    assert!(report.is_completed());
    match report.outcome(StepId::CertificateIssuance) {
        Some(StepOutcome::Skipped { remediation, .. }) => {
            assert_eq!(
                remediation.as_deref(),
                Some("systemctl start nginx, then re-run with --step certificate-issuance")
            );
        }
        other => panic!("expected a skip, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stopped_web_server_does_not_hide_the_missing_record() {
    let host = FakeHost::new();
    host.set_state("nginx", "inactive");
    host.unresolve("mail.example.com");
    let store = MemoryStore::with(complete_config());

    let (report, _) = full_run(&host, &store).await;

    assert!(report.is_completed());
    match report.outcome(StepId::CertificateIssuance) {
        Some(StepOutcome::Skipped {
            reason,
            remediation,
        }) => {
            assert!(reason.contains("mail.example.com resolves to nothing"), "{reason}");
            assert!(reason.contains("nginx is not running"), "{reason}");
            let fix = remediation.as_deref().unwrap();
            assert!(fix.contains("mail.example.com. IN A 10.0.0.5"), "{fix}");
            assert!(fix.contains("systemctl start nginx"), "{fix}");
        }
        other => panic!("expected a skip, got {other:?}"),
    }
    assert!(!host.ran("certbot"));
}

#[tokio::test]
async fn test_failed_issuance_does_not_fail_the_run() {
    let host = FakeHost::new();
    host.script("certbot", err_output(1, b"Challenge failed for domain mail.example.com"));
    let store = MemoryStore::with(complete_config());

    let (report, reporter) = full_run(&host, &store).await;

    assert!(report.is_completed());
    assert_eq!(report.exit_code(), 0);
    match report.outcome(StepId::CertificateIssuance) {
        Some(StepOutcome::Failed { class, message }) => {
            assert_eq!(*class, ErrorClass::Write);
            assert!(message.contains("Challenge failed"), "{message}");
        }
        other => panic!("expected a failure record, got {other:?}"),
    }
    assert!(!host.ran("systemctl reload postfix"));
    assert!(
        reporter
            .warnings()
            .iter()
            .any(|w| w.starts_with("certificate-issuance failed"))
    );
}

#[tokio::test]
async fn test_public_address_mismatch_only_warns() {
    let host = FakeHost::new();
    host.set_public_ip(Some("198.51.100.9".parse().unwrap()));
    let store = MemoryStore::with(complete_config());

    let (report, reporter) = full_run(&host, &store).await;

    assert!(report.is_completed());
    assert!(reporter.warnings().iter().any(|w| w.contains("198.51.100.9")));
}

// ── Single step ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_single_step_runs_only_that_step() {
    let host = FakeHost::new();
    let store = MemoryStore::with(complete_config());

    let (report, reporter) = single_run(&host, &store, StepId::AuthoritativeDns).await;

    assert!(report.is_completed(), "{report:#?}");
    assert_eq!(
        steps(&report),
        vec![StepId::InputResolution, StepId::AuthoritativeDns]
    );
    assert!(!host.ran("id -u"));
    assert!(!host.ran("hostnamectl"));
    assert!(reporter.warnings().iter().any(|w| w.contains("running only authoritative-dns")));
}

#[tokio::test]
async fn test_single_prerequisites_needs_no_inputs() {
    let host = FakeHost::new();
    let store = MemoryStore::empty();

    let (report, _) = single_run(&host, &store, StepId::Prerequisites).await;

    assert!(report.is_completed());
    assert_eq!(steps(&report), vec![StepId::Prerequisites]);
}

#[tokio::test]
async fn test_single_step_out_of_order_fails_its_precondition() {
    let host = FakeHost::new();
    let store = MemoryStore::with(complete_config());

    let (report, _) = single_run(&host, &store, StepId::MailSigning).await;

    let (step, class, reason) = aborted_at(&report);
    assert_eq!(step, StepId::MailSigning);
    assert_eq!(class, ErrorClass::Validation);
    assert!(reason.contains("run the authoritative-dns step first"), "{reason}");
}

#[tokio::test]
async fn test_orchestrator_stages_cannot_run_alone() {
    let host = FakeHost::new();
    let store = MemoryStore::with(complete_config());

    let (report, _) = single_run(&host, &store, StepId::Summary).await;

    let (step, class, _) = aborted_at(&report);
    assert_eq!(step, StepId::Summary);
    assert_eq!(class, ErrorClass::Input);
    assert!(host.calls().is_empty());
}
