//! OpenDKIM signing configuration.
//!
//! The tables reference key files by their on-host location, never by the
//! artifact root prefix: the daemon reads them at runtime.

use crate::domain::context::ProvisioningContext;
use crate::domain::dns::dkim_record_name;
use crate::domain::paths::{ArtifactPaths, DKIM_SELECTOR};
use crate::domain::template::{self, TemplateError};

/// Port the signing daemon listens on, loopback only.
pub const MILTER_PORT: u16 = 8891;

/// Rendered signing-daemon artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DkimConfig {
    pub daemon_conf: String,
    pub key_table: String,
    pub signing_table: String,
    pub trusted_hosts: String,
}

impl DkimConfig {
    /// Render all four artifacts from the daemon-config `template`.
    ///
    /// # Errors
    ///
    /// Fails if the template references an unknown placeholder.
    pub fn render(ctx: &ProvisioningContext, template: &str) -> Result<Self, TemplateError> {
        let host = ArtifactPaths::default();
        let socket = format!("inet:{MILTER_PORT}@localhost");
        let key_table = host.key_table().display().to_string();
        let signing_table = host.signing_table().display().to_string();
        let trusted_hosts = host.trusted_hosts().display().to_string();
        let daemon_conf = template::render(
            template,
            &[
                ("socket", socket.as_str()),
                ("key_table", key_table.as_str()),
                ("signing_table", signing_table.as_str()),
                ("trusted_hosts", trusted_hosts.as_str()),
            ],
        )?;

        let domain = ctx.domain();
        let record = dkim_record_name(domain);
        let key_path = host.dkim_private_key(domain);
        Ok(Self {
            daemon_conf,
            key_table: format!(
                "{record} {domain}:{DKIM_SELECTOR}:{}\n",
                key_path.display()
            ),
            signing_table: format!("*@{domain} {record}\n"),
            trusted_hosts: format!(
                "127.0.0.1\nlocalhost\n{}\n*.{domain}\n",
                ctx.server_ip()
            ),
        })
    }
}

/// Extract the TXT value from the zone snippet `opendkim-genkey` writes.
///
/// The snippet splits the value over several quoted strings; they are
/// concatenated in order. Returns `None` when no public key is present.
#[must_use]
pub fn parse_dkim_txt(snippet: &str) -> Option<String> {
    let mut value = String::new();
    let mut parts = snippet.split('"');
    // Text before the first quote is the owner/type prefix.
    parts.next();
    while let Some(quoted) = parts.next() {
        value.push_str(quoted);
        // Skip the unquoted text between strings.
        if parts.next().is_none() {
            break;
        }
    }
    value.contains("p=").then_some(value)
}
