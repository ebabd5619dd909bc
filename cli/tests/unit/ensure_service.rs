//! Resource ensurer: create-if-absent, never modify, never delete.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use hostkit_cli::application::services::ensure::{EnsureOutcome, ensure_directory, ensure_file};
use hostkit_cli::domain::error::classify;
use hostkit_common::ErrorClass;

use crate::mocks::FakeHost;

#[test]
fn test_ensure_directory_creates_missing_parents() {
    let host = FakeHost::bare();
    let dir = host.root().join("etc/bind/zones");

    let outcome = ensure_directory(&host, &dir).unwrap();

    assert_eq!(outcome, EnsureOutcome::Created);
    assert!(dir.is_dir());
}

#[test]
fn test_ensure_directory_leaves_existing_contents_alone() {
    let host = FakeHost::bare();
    let dir = host.root().join("etc/opendkim");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("key.table"), "kept\n").unwrap();

    let outcome = ensure_directory(&host, &dir).unwrap();

    assert_eq!(outcome, EnsureOutcome::AlreadyPresent);
    assert_eq!(std::fs::read_to_string(dir.join("key.table")).unwrap(), "kept\n");
}

#[test]
fn test_ensure_directory_over_a_file_is_a_write_error() {
    let host = FakeHost::bare();
    let path = host.root().join("zones");
    std::fs::write(&path, "not a directory").unwrap();

    let err = ensure_directory(&host, &path).unwrap_err();

    assert_eq!(classify(&err), ErrorClass::Write);
    assert!(err.to_string().contains("not a directory"), "got: {err}");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "not a directory");
}

#[test]
fn test_ensure_file_creates_empty_file_once() {
    let host = FakeHost::bare();
    let path = host.root().join("trusted.hosts");

    assert_eq!(ensure_file(&host, &path).unwrap(), EnsureOutcome::Created);
    std::fs::write(&path, "127.0.0.1\n").unwrap();
    assert_eq!(ensure_file(&host, &path).unwrap(), EnsureOutcome::AlreadyPresent);

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "127.0.0.1\n");
}

#[test]
fn test_ensure_file_does_not_create_parents() {
    let host = FakeHost::bare();
    let path = host.root().join("missing/dir/file");

    let err = ensure_file(&host, &path).unwrap_err();

    assert_eq!(classify(&err), ErrorClass::Write);
    assert!(!host.root().join("missing").exists());
}
