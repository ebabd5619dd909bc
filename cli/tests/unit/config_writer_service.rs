//! Config writer: rendered artifacts, serials and change detection.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::NaiveDate;
use hostkit_cli::application::services::config_writer::{
    WriteOutcome, ZoneWrite, apply_transfer_agent_settings, pending, promote,
    published_dkim_value, signing_targets, write_host_identity, write_if_changed,
    write_signing_config, write_zones, zone_targets,
};
use hostkit_cli::domain::dns::parse_serial;
use hostkit_cli::domain::paths::staged;
use hostkit_cli::domain::error::classify;
use hostkit_cli::domain::hosts::HostIdentity;
use hostkit_cli::domain::postfix::milter_settings;
use hostkit_common::ErrorClass;

use crate::helpers::{DOMAIN, context, err_output};
use crate::mocks::{DKIM_SNIPPET, FakeHost};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
}

fn host_with_zones_dir() -> FakeHost {
    let host = FakeHost::new();
    std::fs::create_dir_all(host.paths().zones_dir()).unwrap();
    host
}

/// Stage both zones for day `d` and move them into place.
fn publish_zones(host: &FakeHost, d: u32, dkim: Option<&str>) -> ZoneWrite {
    let paths = host.paths();
    let ctx = context();
    let written = write_zones(host, &paths, &ctx, day(d), dkim).unwrap();
    promote(host, &zone_targets(&paths, &ctx)).unwrap();
    written
}

#[test]
fn test_write_if_changed_skips_identical_content() {
    let host = FakeHost::bare();
    let path = host.root().join("hostname");

    let first = write_if_changed(&host, &path, "mail\n").unwrap();
    let second = write_if_changed(&host, &path, "mail\n").unwrap();
    let third = write_if_changed(&host, &path, "mx\n").unwrap();

    assert_eq!(first.outcome, WriteOutcome::Written);
    assert_eq!(second.outcome, WriteOutcome::Unchanged);
    assert_eq!(third.outcome, WriteOutcome::Written);
    assert_eq!(host.read(&path), "mx\n");
}

#[test]
fn test_write_into_missing_directory_is_a_write_error() {
    let host = FakeHost::bare();
    let path = host.root().join("no/such/dir/file");

    let err = write_if_changed(&host, &path, "x").unwrap_err();

    assert_eq!(classify(&err), ErrorClass::Write);
    assert!(err.to_string().contains("no/such/dir/file"), "got: {err}");
}

#[test]
fn test_zones_start_at_date_serial() {
    let host = host_with_zones_dir();
    let paths = host.paths();

    let written = publish_zones(&host, 14, None);

    assert_eq!(written.serial, 2_026_031_400);
    let primary = host.read(&paths.zone_file(DOMAIN));
    assert_eq!(parse_serial(&primary), Some(2_026_031_400));
    assert!(primary.contains("ns1.example.com."), "{primary}");
    assert!(primary.contains("v=spf1 mx a ip4:10.0.0.5 -all"), "{primary}");
    let mail = host.read(&paths.zone_file("mail.example.com"));
    assert_eq!(parse_serial(&mail), Some(2_026_031_400));
}

#[test]
fn test_serial_increases_on_every_write() {
    let host = host_with_zones_dir();

    let first = publish_zones(&host, 14, None);
    let same_day = publish_zones(&host, 14, None);
    let clock_went_back = publish_zones(&host, 2, None);

    assert!(same_day.serial > first.serial);
    assert!(clock_went_back.serial > same_day.serial);
}

#[test]
fn test_serial_follows_the_higher_of_both_zones() {
    let host = host_with_zones_dir();
    let paths = host.paths();
    publish_zones(&host, 14, None);
    let mail_path = paths.zone_file("mail.example.com");
    let bumped = host.read(&mail_path).replace("2026031400", "2026031450");
    std::fs::write(&mail_path, bumped).unwrap();

    let next = publish_zones(&host, 14, None);

    assert_eq!(next.serial, 2_026_031_451);
}

#[test]
fn test_local_zone_declarations_use_host_paths_and_are_stable() {
    let host = host_with_zones_dir();
    let paths = host.paths();

    let first = publish_zones(&host, 14, None);
    let second = publish_zones(&host, 14, None);

    let local = host.read(&paths.named_conf_local());
    assert!(local.contains("zone \"example.com\""), "{local}");
    assert!(local.contains("file \"/etc/bind/zones/db.example.com\";"), "{local}");
    assert!(!local.contains(&host.root().display().to_string()));
    assert_eq!(first.artifacts[2].outcome, WriteOutcome::Written);
    assert_eq!(second.artifacts[2].outcome, WriteOutcome::Unchanged);
    assert_eq!(second.artifacts[0].outcome, WriteOutcome::Staged);
}

#[test]
fn test_zones_stay_staged_until_promoted() {
    let host = host_with_zones_dir();
    let paths = host.paths();
    let ctx = context();
    let live = paths.zone_file(DOMAIN);
    publish_zones(&host, 14, None);
    let accepted = host.read(&live);

    write_zones(&host, &paths, &ctx, day(14), None).unwrap();

    assert_eq!(host.read(&live), accepted);
    assert_eq!(pending(&host, &live), staged(&live));
    assert_eq!(parse_serial(&host.read(&staged(&live))), Some(2_026_031_401));

    let promoted = promote(&host, &zone_targets(&paths, &ctx)).unwrap();

    assert_eq!(promoted, zone_targets(&paths, &ctx));
    assert_eq!(parse_serial(&host.read(&live)), Some(2_026_031_401));
    assert!(!staged(&live).exists());
    assert_eq!(pending(&host, &live), live);
    assert!(promote(&host, &zone_targets(&paths, &ctx)).unwrap().is_empty());
}

#[test]
fn test_zone_carries_dkim_record_when_given() {
    let host = host_with_zones_dir();
    let paths = host.paths();
    let key_dir = paths.dkim_key_dir(DOMAIN);
    std::fs::create_dir_all(&key_dir).unwrap();
    std::fs::write(paths.dkim_public_record(DOMAIN), DKIM_SNIPPET).unwrap();

    let txt = published_dkim_value(&host, &paths, DOMAIN).unwrap();
    publish_zones(&host, 14, Some(&txt));

    assert!(txt.starts_with("v=DKIM1;"), "{txt}");
    let primary = host.read(&paths.zone_file(DOMAIN));
    assert!(primary.contains("mail._domainkey"), "{primary}");
    assert!(primary.contains("p=MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEAtest"));
}

#[test]
fn test_no_dkim_value_before_a_key_exists() {
    let host = FakeHost::new();
    assert_eq!(published_dkim_value(&host, &host.paths(), DOMAIN), None);
}

#[test]
fn test_signing_config_writes_daemon_conf_and_tables() {
    let host = FakeHost::new();
    let paths = host.paths();
    std::fs::create_dir_all(paths.opendkim_dir()).unwrap();

    let written = write_signing_config(&host, &paths, &context()).unwrap();
    assert!(!paths.opendkim_conf().exists());
    promote(&host, &signing_targets(&paths)).unwrap();
    let again = write_signing_config(&host, &paths, &context()).unwrap();

    assert_eq!(written.len(), 4);
    assert!(written.iter().all(|a| a.outcome == WriteOutcome::Staged));
    assert!(again.iter().all(|a| a.outcome == WriteOutcome::Unchanged));
    let key_table = host.read(&paths.key_table());
    assert!(key_table.contains("mail._domainkey.example.com example.com:mail:/etc/opendkim/keys/example.com/mail.private"));
    assert!(host.read(&paths.signing_table()).contains("*@example.com mail._domainkey.example.com"));
    assert!(host.read(&paths.trusted_hosts()).contains("10.0.0.5"));
    assert!(host.read(&paths.opendkim_conf()).contains("inet:8891@localhost"));
}

#[test]
fn test_unchanged_signing_config_drops_a_rejected_staging_file() {
    let host = FakeHost::new();
    let paths = host.paths();
    std::fs::create_dir_all(paths.opendkim_dir()).unwrap();
    write_signing_config(&host, &paths, &context()).unwrap();
    promote(&host, &signing_targets(&paths)).unwrap();
    let leftover = staged(&paths.opendkim_conf());
    std::fs::write(&leftover, "Socket garbage\n").unwrap();

    let again = write_signing_config(&host, &paths, &context()).unwrap();

    assert_eq!(again[0].outcome, WriteOutcome::Unchanged);
    assert!(!leftover.exists());
    assert_eq!(pending(&host, &paths.opendkim_conf()), paths.opendkim_conf());
}

#[test]
fn test_host_identity_maps_fqdn_to_server() {
    let host = FakeHost::bare();
    let paths = host.paths();
    std::fs::create_dir_all(paths.host_path("/etc")).unwrap();

    write_host_identity(&host, &paths, &HostIdentity::for_context(&context())).unwrap();

    let hosts = host.read(&paths.hosts_file());
    assert!(hosts.contains("10.0.0.5\tmail.example.com\tmail"), "{hosts}");
    assert!(hosts.contains("127.0.0.1\tlocalhost"));
    assert_eq!(host.read(&paths.hostname_file()), "mail\n");
}

#[tokio::test]
async fn test_transfer_agent_settings_use_one_postconf_call() {
    let host = FakeHost::new();

    apply_transfer_agent_settings(&host, &milter_settings(&context()))
        .await
        .unwrap();

    assert_eq!(host.count("postconf"), 1);
    let call = &host.calls()[0];
    assert!(call.starts_with("postconf -e "), "{call}");
    assert!(call.contains("smtpd_milters=inet:localhost:8891"), "{call}");
    assert!(call.contains("myhostname=mail.example.com"), "{call}");
}

#[tokio::test]
async fn test_rejected_postconf_setting_is_a_write_error() {
    let host = FakeHost::new();
    host.script("postconf", err_output(1, b"postconf: fatal: bad parameter"));

    let err = apply_transfer_agent_settings(&host, &milter_settings(&context()))
        .await
        .unwrap_err();

    assert_eq!(classify(&err), ErrorClass::Write);
    assert!(err.to_string().contains("bad parameter"), "got: {err}");
}
