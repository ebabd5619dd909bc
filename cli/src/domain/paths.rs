//! Locations of every artifact the pipeline produces.
//!
//! The paths are part of the tool's contract. They are resolved under a
//! root prefix (`/` on a real host) so the whole tree can be redirected.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Signing selector used for the DKIM key and its DNS record.
pub const DKIM_SELECTOR: &str = "mail";

/// Suffix of an artifact written next to its target and awaiting its check.
pub const STAGED_SUFFIX: &str = ".new";

/// Sibling of `live` that holds a not-yet-validated version of it.
#[must_use]
pub fn staged(live: &Path) -> PathBuf {
    let mut name = live.file_name().map(OsString::from).unwrap_or_default();
    name.push(STAGED_SUFFIX);
    live.with_file_name(name)
}

/// Artifact paths resolved under a root prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    root: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::new("/")
    }
}

impl ArtifactPaths {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join an absolute host path onto the root prefix.
    #[must_use]
    pub fn host_path(&self, absolute: &str) -> PathBuf {
        self.root.join(absolute.trim_start_matches('/'))
    }

    // ── Authoritative DNS ────────────────────────────────────────────────────

    #[must_use]
    pub fn bind_dir(&self) -> PathBuf {
        self.host_path("/etc/bind")
    }

    /// Local-zone declaration included by `named.conf`.
    #[must_use]
    pub fn named_conf_local(&self) -> PathBuf {
        self.host_path("/etc/bind/named.conf.local")
    }

    #[must_use]
    pub fn zones_dir(&self) -> PathBuf {
        self.host_path("/etc/bind/zones")
    }

    #[must_use]
    pub fn zone_file(&self, zone: &str) -> PathBuf {
        self.zones_dir().join(format!("db.{zone}"))
    }

    // ── Signing daemon ───────────────────────────────────────────────────────

    #[must_use]
    pub fn opendkim_conf(&self) -> PathBuf {
        self.host_path("/etc/opendkim.conf")
    }

    #[must_use]
    pub fn opendkim_dir(&self) -> PathBuf {
        self.host_path("/etc/opendkim")
    }

    #[must_use]
    pub fn key_table(&self) -> PathBuf {
        self.opendkim_dir().join("key.table")
    }

    #[must_use]
    pub fn signing_table(&self) -> PathBuf {
        self.opendkim_dir().join("signing.table")
    }

    #[must_use]
    pub fn trusted_hosts(&self) -> PathBuf {
        self.opendkim_dir().join("trusted.hosts")
    }

    #[must_use]
    pub fn dkim_key_dir(&self, domain: &str) -> PathBuf {
        self.opendkim_dir().join("keys").join(domain)
    }

    #[must_use]
    pub fn dkim_private_key(&self, domain: &str) -> PathBuf {
        self.dkim_key_dir(domain)
            .join(format!("{DKIM_SELECTOR}.private"))
    }

    /// Zone-file snippet written by `opendkim-genkey` next to the key.
    #[must_use]
    pub fn dkim_public_record(&self, domain: &str) -> PathBuf {
        self.dkim_key_dir(domain).join(format!("{DKIM_SELECTOR}.txt"))
    }

    // ── Mail transfer agent ──────────────────────────────────────────────────

    #[must_use]
    pub fn postfix_main_cf(&self) -> PathBuf {
        self.host_path("/etc/postfix/main.cf")
    }

    // ── Host identity ────────────────────────────────────────────────────────

    #[must_use]
    pub fn hosts_file(&self) -> PathBuf {
        self.host_path("/etc/hosts")
    }

    #[must_use]
    pub fn hostname_file(&self) -> PathBuf {
        self.host_path("/etc/hostname")
    }

    // ── Certificates ─────────────────────────────────────────────────────────

    #[must_use]
    pub fn webroot(&self) -> PathBuf {
        self.host_path("/var/www/html")
    }

    #[must_use]
    pub fn certificate_dir(&self, domain: &str) -> PathBuf {
        self.host_path("/etc/letsencrypt/live").join(domain)
    }

    #[must_use]
    pub fn certificate_chain(&self, domain: &str) -> PathBuf {
        self.certificate_dir(domain).join("fullchain.pem")
    }

    #[must_use]
    pub fn certificate_key(&self, domain: &str) -> PathBuf {
        self.certificate_dir(domain).join("privkey.pem")
    }
}
