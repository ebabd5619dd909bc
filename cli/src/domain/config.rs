//! Persisted provisioning answers and the validators applied to them.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::ProvisionError;

// ── Constants ────────────────────────────────────────────────────────────────

/// Database name used when the operator leaves the answer blank.
pub const DEFAULT_DB_NAME: &str = "mailserver";
/// Database user used when the operator leaves the answer blank.
pub const DEFAULT_DB_USER: &str = "mailuser";

#[allow(clippy::unwrap_used)] // literal pattern
static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").unwrap());

// ── Config schema ────────────────────────────────────────────────────────────

/// Answers stored in `/etc/hostkit/config.yaml`.
///
/// Every key is optional; whatever is absent is prompted for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_ssl: Option<bool>,
}

/// Treat whitespace-only values as absent.
#[must_use]
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Normalize and validate a domain name.
///
/// Lower-cases, strips a trailing dot, and requires at least two labels.
///
/// # Errors
///
/// Returns `ProvisionError::InvalidInput` if the name is not a valid DNS name.
pub fn normalize_domain(raw: &str) -> Result<String, ProvisionError> {
    let domain = raw.trim().trim_end_matches('.').to_ascii_lowercase();
    let invalid = |reason: &str| ProvisionError::InvalidInput {
        field: "domain",
        reason: format!("'{raw}' {reason}"),
    };
    if domain.is_empty() {
        return Err(invalid("is empty"));
    }
    if domain.len() > 253 {
        return Err(invalid("is longer than 253 characters"));
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(invalid("needs at least two labels (e.g. example.com)"));
    }
    if let Some(bad) = labels.iter().find(|l| !LABEL_RE.is_match(l)) {
        return Err(invalid(&format!("has an invalid label '{bad}'")));
    }
    Ok(domain)
}

/// Parse the server's public address.
///
/// # Errors
///
/// Returns `ProvisionError::InvalidInput` if the value is not an IP address.
pub fn parse_server_ip(raw: &str) -> Result<IpAddr, ProvisionError> {
    raw.trim()
        .parse()
        .map_err(|e| ProvisionError::InvalidInput {
            field: "server_ip",
            reason: format!("'{raw}': {e}"),
        })
}

// ── Unit tests ───────────────────────────────────────────────────────────────
