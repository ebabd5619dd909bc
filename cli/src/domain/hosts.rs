//! Host identity: `/etc/hosts` and `/etc/hostname`.

use std::net::IpAddr;

use crate::domain::context::ProvisioningContext;
use crate::domain::template::{self, TemplateError};

/// Name the machine answers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    pub fqdn: String,
    pub short_name: String,
    pub address: IpAddr,
}

impl HostIdentity {
    /// The mail host is the machine's canonical name.
    #[must_use]
    pub fn for_context(ctx: &ProvisioningContext) -> Self {
        let fqdn = ctx.mail_host();
        let short_name = fqdn.split('.').next().unwrap_or_default().to_string();
        Self {
            fqdn,
            short_name,
            address: ctx.server_ip(),
        }
    }

    /// Render `/etc/hosts` from `template`.
    ///
    /// # Errors
    ///
    /// Fails if the template references an unknown placeholder.
    pub fn render_hosts(&self, template: &str) -> Result<String, TemplateError> {
        let ip = self.address.to_string();
        template::render(
            template,
            &[
                ("server_ip", ip.as_str()),
                ("fqdn", self.fqdn.as_str()),
                ("short_name", self.short_name.as_str()),
            ],
        )
    }

    #[must_use]
    pub fn render_hostname(&self) -> String {
        format!("{}\n", self.short_name)
    }
}

/// First address `/etc/hosts` text maps `name` to.
#[must_use]
pub fn lookup(hosts: &str, name: &str) -> Option<IpAddr> {
    hosts.lines().find_map(|line| {
        let line = line.split('#').next().unwrap_or_default();
        let mut fields = line.split_whitespace();
        let addr = fields.next()?;
        fields
            .any(|alias| alias.eq_ignore_ascii_case(name))
            .then(|| addr.parse().ok())
            .flatten()
    })
}
