//! Service controller: act, then confirm the unit is active.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use hostkit_cli::application::services::service_control::{
    enable, reload_and_confirm, restart_and_confirm,
};
use hostkit_cli::domain::ProvisionError;
use hostkit_cli::domain::error::classify;
use hostkit_common::ErrorClass;

use crate::helpers::err_output;
use crate::mocks::FakeHost;

#[tokio::test]
async fn test_restart_confirms_active_state() {
    let host = FakeHost::new();

    restart_and_confirm(&host, "named").await.unwrap();

    assert_eq!(
        host.calls(),
        vec!["systemctl restart named", "systemctl is-active named"]
    );
}

#[tokio::test]
async fn test_unit_failing_after_restart_is_a_service_error() {
    let host = FakeHost::new();
    host.set_state("opendkim", "failed");

    let err = restart_and_confirm(&host, "opendkim").await.unwrap_err();

    assert_eq!(classify(&err), ErrorClass::Service);
    match err.downcast_ref::<ProvisionError>() {
        Some(ProvisionError::Service {
            service,
            state,
            log_hint,
            ..
        }) => {
            assert_eq!(service, "opendkim");
            assert_eq!(state, "failed");
            assert_eq!(log_hint, "journalctl -u opendkim --no-pager -n 50");
        }
        other => panic!("expected a service error, got {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains("opendkim is failed after restart"), "{message}");
    assert!(message.contains("journalctl -u opendkim"), "{message}");
}

#[tokio::test]
async fn test_failed_reload_is_an_error_even_when_still_active() {
    let host = FakeHost::new();
    host.script("systemctl reload postfix", err_output(1, b"Job failed"));

    let err = reload_and_confirm(&host, "postfix").await.unwrap_err();

    assert_eq!(classify(&err), ErrorClass::Service);
    assert!(host.ran("systemctl is-active postfix"));
}

#[tokio::test]
async fn test_enable_failure_names_the_program() {
    let host = FakeHost::new();
    host.script("systemctl enable", err_output(1, b"Unit file named.service does not exist."));

    let err = enable(&host, "named").await.unwrap_err();

    assert!(err.to_string().contains("does not exist"), "got: {err}");
}
