//! The resolved inputs every step works from.
//!
//! No I/O and no async.

use std::fmt;
use std::net::IpAddr;

use crate::domain::error::ProvisionError;

/// A field of [`ProvisioningContext`] that a step can declare as required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Domain,
    ServerIp,
    AdminPassword,
    DbName,
    DbUser,
    DbPassword,
}

impl Field {
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Field::Domain => "domain",
            Field::ServerIp => "server_ip",
            Field::AdminPassword => "admin_password",
            Field::DbName => "db_name",
            Field::DbUser => "db_user",
            Field::DbPassword => "db_password",
        }
    }
}

/// Database naming and credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseCredentials {
    pub name: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for DatabaseCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseCredentials")
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Fully resolved provisioning parameters.
///
/// Built once by the input resolver and then only read.
#[derive(Clone, PartialEq, Eq)]
pub struct ProvisioningContext {
    domain: String,
    server_ip: IpAddr,
    admin_password: String,
    database: DatabaseCredentials,
    install_ssl: bool,
}

impl ProvisioningContext {
    #[must_use]
    pub fn new(
        domain: String,
        server_ip: IpAddr,
        admin_password: String,
        database: DatabaseCredentials,
        install_ssl: bool,
    ) -> Self {
        Self {
            domain,
            server_ip,
            admin_password,
            database,
            install_ssl,
        }
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    #[must_use]
    pub fn server_ip(&self) -> IpAddr {
        self.server_ip
    }

    #[must_use]
    pub fn admin_password(&self) -> &str {
        &self.admin_password
    }

    #[must_use]
    pub fn database(&self) -> &DatabaseCredentials {
        &self.database
    }

    #[must_use]
    pub fn install_ssl(&self) -> bool {
        self.install_ssl
    }

    /// Fully-qualified name of the mail host, e.g. `mail.example.com`.
    #[must_use]
    pub fn mail_host(&self) -> String {
        format!("mail.{}", self.domain)
    }

    /// Primary and secondary name server host names.
    #[must_use]
    pub fn ns_hosts(&self) -> [String; 2] {
        [format!("ns1.{}", self.domain), format!("ns2.{}", self.domain)]
    }

    /// Names the TLS certificate has to cover.
    #[must_use]
    pub fn certificate_names(&self) -> Vec<String> {
        vec![
            self.domain.clone(),
            format!("www.{}", self.domain),
            self.mail_host(),
        ]
    }

    /// Mailbox that receives registrar, DMARC and certificate mail.
    #[must_use]
    pub fn postmaster(&self) -> String {
        format!("postmaster@{}", self.domain)
    }

    /// Fields from `required` that are empty.
    #[must_use]
    pub fn missing(&self, required: &[Field]) -> Vec<Field> {
        required
            .iter()
            .copied()
            .filter(|f| match f {
                Field::Domain => self.domain.trim().is_empty(),
                Field::ServerIp => self.server_ip.is_unspecified(),
                Field::AdminPassword => self.admin_password.is_empty(),
                Field::DbName => self.database.name.trim().is_empty(),
                Field::DbUser => self.database.user.trim().is_empty(),
                Field::DbPassword => self.database.password.is_empty(),
            })
            .collect()
    }

    /// Fail with an input error when any of `required` is empty.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::MissingInput` naming every empty field.
    pub fn require(&self, required: &[Field]) -> Result<(), ProvisionError> {
        let missing = self.missing(required);
        if missing.is_empty() {
            return Ok(());
        }
        Err(ProvisionError::MissingInput {
            fields: missing.into_iter().map(Field::key).collect(),
        })
    }
}

impl fmt::Debug for ProvisioningContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisioningContext")
            .field("domain", &self.domain)
            .field("server_ip", &self.server_ip)
            .field("admin_password", &"<redacted>")
            .field("database", &self.database)
            .field("install_ssl", &self.install_ssl)
            .finish()
    }
}
