//! Postfix main.cf settings applied through `postconf -e`.

use std::path::Path;

use crate::domain::context::ProvisioningContext;
use crate::domain::dkim::MILTER_PORT;

/// A single `name = value` main.cf parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    pub name: &'static str,
    pub value: String,
}

impl Setting {
    fn new(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }

    /// Argument form accepted by `postconf -e`.
    #[must_use]
    pub fn assignment(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

/// Host identity plus hand-off of every message to the signing milter.
#[must_use]
pub fn milter_settings(ctx: &ProvisioningContext) -> Vec<Setting> {
    vec![
        Setting::new("myhostname", ctx.mail_host()),
        Setting::new("mydomain", ctx.domain()),
        Setting::new("myorigin", "$mydomain"),
        Setting::new("milter_default_action", "accept"),
        Setting::new("milter_protocol", "6"),
        Setting::new("smtpd_milters", format!("inet:localhost:{MILTER_PORT}")),
        Setting::new("non_smtpd_milters", "$smtpd_milters"),
    ]
}

/// Opportunistic TLS with the issued certificate.
///
/// Paths are on-host locations as Postfix reads them.
#[must_use]
pub fn tls_settings(chain: &Path, key: &Path) -> Vec<Setting> {
    vec![
        Setting::new("smtpd_tls_cert_file", chain.display().to_string()),
        Setting::new("smtpd_tls_key_file", key.display().to_string()),
        Setting::new("smtpd_tls_security_level", "may"),
        Setting::new("smtp_tls_security_level", "may"),
        Setting::new("smtpd_tls_auth_only", "yes"),
    ]
}
