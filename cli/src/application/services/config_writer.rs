//! Application service: render and atomically write configuration artifacts.
//!
//! Zones always get a fresh serial. Every other artifact is compared by
//! SHA-256 first and left untouched when its content is unchanged.
//!
//! Artifacts that an external checker validates (zones, the signing daemon
//! config and its tables) are staged next to their target and only
//! [`promote`]d over it once the check passed. A rejected version never
//! replaces the live one.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use crate::application::ports::{CommandRunner, LocalFs};
use crate::application::services::process::run_checked;
use crate::domain::dkim::{self, DkimConfig};
use crate::domain::dns::{self, ZoneDeclaration};
use crate::domain::hosts::HostIdentity;
use crate::domain::paths::staged;
use crate::domain::postfix::Setting;
use crate::domain::{ArtifactPaths, ProvisionError, ProvisioningContext};
use crate::templates;

/// What a write call did to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// Written beside the target, waiting for [`promote`].
    Staged,
    Unchanged,
}

/// One artifact and what happened to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifact {
    pub path: PathBuf,
    pub outcome: WriteOutcome,
}

fn digest(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

fn write_failure(path: &Path, err: &anyhow::Error) -> ProvisionError {
    ProvisionError::Write {
        path: path.display().to_string(),
        reason: format!("{err:#}"),
    }
}

/// Write `contents` unconditionally, atomically.
fn replace(fs: &impl LocalFs, path: &Path, contents: &str) -> Result<WrittenArtifact> {
    fs.write_atomic(path, contents.as_bytes())
        .map_err(|e| write_failure(path, &e))?;
    tracing::info!(path = %path.display(), "artifact written");
    Ok(WrittenArtifact {
        path: path.to_path_buf(),
        outcome: WriteOutcome::Written,
    })
}

/// Write `contents` unless the file already holds exactly that.
///
/// # Errors
///
/// Returns `ProvisionError::Write` if the file cannot be replaced.
pub fn write_if_changed(fs: &impl LocalFs, path: &Path, contents: &str) -> Result<WrittenArtifact> {
    let unchanged = fs
        .read_to_string(path)
        .is_ok_and(|current| digest(current.as_bytes()) == digest(contents.as_bytes()));
    if unchanged {
        tracing::debug!(path = %path.display(), "artifact unchanged");
        return Ok(WrittenArtifact {
            path: path.to_path_buf(),
            outcome: WriteOutcome::Unchanged,
        });
    }
    replace(fs, path, contents)
}

/// Write `contents` to the staging sibling of `live`.
fn stage(fs: &impl LocalFs, live: &Path, contents: &str) -> Result<WrittenArtifact> {
    let next = staged(live);
    fs.write_atomic(&next, contents.as_bytes())
        .map_err(|e| write_failure(&next, &e))?;
    tracing::info!(path = %live.display(), staged = %next.display(), "artifact staged");
    Ok(WrittenArtifact {
        path: live.to_path_buf(),
        outcome: WriteOutcome::Staged,
    })
}

/// Stage `contents` for `live` unless `live` already holds exactly that.
///
/// An unchanged artifact leaves no staging file behind, so a stale one from
/// an earlier rejected run is removed.
///
/// # Errors
///
/// Returns `ProvisionError::Write` if the staging file cannot be written or
/// a stale one cannot be removed.
pub fn stage_if_changed(
    fs: &impl LocalFs,
    live: &Path,
    contents: &str,
) -> Result<WrittenArtifact> {
    let unchanged = fs
        .read_to_string(live)
        .is_ok_and(|current| digest(current.as_bytes()) == digest(contents.as_bytes()));
    if !unchanged {
        return stage(fs, live, contents);
    }
    let next = staged(live);
    if fs.exists(&next) {
        fs.remove_file(&next).map_err(|e| write_failure(&next, &e))?;
        tracing::debug!(path = %next.display(), "stale staged artifact removed");
    }
    tracing::debug!(path = %live.display(), "artifact unchanged");
    Ok(WrittenArtifact {
        path: live.to_path_buf(),
        outcome: WriteOutcome::Unchanged,
    })
}

/// Path a checker should read for `live`: the staged version when one is
/// waiting, otherwise the live file.
#[must_use]
pub fn pending(fs: &impl LocalFs, live: &Path) -> PathBuf {
    let next = staged(live);
    if fs.exists(&next) {
        next
    } else {
        live.to_path_buf()
    }
}

/// Move every staged version of `targets` into place.
///
/// Targets with nothing staged are left alone. Returns the promoted paths.
///
/// # Errors
///
/// Returns `ProvisionError::Write` if a rename fails.
pub fn promote(fs: &impl LocalFs, targets: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut promoted = Vec::new();
    for live in targets {
        let next = staged(live);
        if !fs.exists(&next) {
            continue;
        }
        fs.rename(&next, live).map_err(|e| write_failure(live, &e))?;
        tracing::info!(path = %live.display(), "artifact promoted");
        promoted.push(live.clone());
    }
    Ok(promoted)
}

/// Both zone files for the context's domain.
#[must_use]
pub fn zone_targets(paths: &ArtifactPaths, ctx: &ProvisioningContext) -> Vec<PathBuf> {
    vec![
        paths.zone_file(ctx.domain()),
        paths.zone_file(&ctx.mail_host()),
    ]
}

/// The signing daemon config and its three tables.
#[must_use]
pub fn signing_targets(paths: &ArtifactPaths) -> Vec<PathBuf> {
    vec![
        paths.opendkim_conf(),
        paths.key_table(),
        paths.signing_table(),
        paths.trusted_hosts(),
    ]
}

fn previous_serial(fs: &impl LocalFs, path: &Path) -> Option<u32> {
    fs.read_to_string(path)
        .ok()
        .and_then(|text| dns::parse_serial(&text))
}

/// DKIM TXT value from the key generator's snippet, once a key exists.
#[must_use]
pub fn published_dkim_value(
    fs: &impl LocalFs,
    paths: &ArtifactPaths,
    domain: &str,
) -> Option<String> {
    fs.read_to_string(&paths.dkim_public_record(domain))
        .ok()
        .and_then(|text| dkim::parse_dkim_txt(&text))
}

/// Zones written by [`write_zones`] and the serial they carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneWrite {
    pub serial: u32,
    pub artifacts: Vec<WrittenArtifact>,
}

/// Stage both zones and write the local-zone declaration.
///
/// The new serial is above the serial of either live zone file. The zones
/// stay staged until [`promote`] is called with [`zone_targets`].
///
/// # Errors
///
/// Returns `ProvisionError::Write` if any file cannot be written.
pub fn write_zones(
    fs: &impl LocalFs,
    paths: &ArtifactPaths,
    ctx: &ProvisioningContext,
    today: NaiveDate,
    dkim_txt: Option<&str>,
) -> Result<ZoneWrite> {
    let domain = ctx.domain();
    let mail = ctx.mail_host();
    let primary_path = paths.zone_file(domain);
    let mail_path = paths.zone_file(&mail);

    let previous = previous_serial(fs, &primary_path).max(previous_serial(fs, &mail_path));
    let serial = dns::next_serial(previous, today);
    tracing::info!(zone = domain, ?previous, serial, "zone serial");

    let primary = dns::primary_zone(ctx, serial, dkim_txt);
    let mail_zone = dns::mail_zone(ctx, serial);

    // Declarations name the on-host path BIND reads, not the staging root.
    let host = ArtifactPaths::default();
    let local = dns::render_local_zones(&[
        ZoneDeclaration {
            zone: domain.to_string(),
            file: host.zone_file(domain),
        },
        ZoneDeclaration {
            zone: mail.clone(),
            file: host.zone_file(&mail),
        },
    ]);

    let artifacts = vec![
        stage(fs, &primary_path, &primary.render())?,
        stage(fs, &mail_path, &mail_zone.render())?,
        write_if_changed(fs, &paths.named_conf_local(), &local)?,
    ];
    Ok(ZoneWrite { serial, artifacts })
}

/// Stage the signing daemon config and its three tables.
///
/// Whatever changed stays staged until [`promote`] is called with
/// [`signing_targets`].
///
/// # Errors
///
/// Returns an error if the template is missing or a file cannot be written.
pub fn write_signing_config(
    fs: &impl LocalFs,
    paths: &ArtifactPaths,
    ctx: &ProvisioningContext,
) -> Result<Vec<WrittenArtifact>> {
    let template = templates::get(templates::OPENDKIM_CONF)?;
    let cfg = DkimConfig::render(ctx, template)?;
    Ok(vec![
        stage_if_changed(fs, &paths.opendkim_conf(), &cfg.daemon_conf)?,
        stage_if_changed(fs, &paths.key_table(), &cfg.key_table)?,
        stage_if_changed(fs, &paths.signing_table(), &cfg.signing_table)?,
        stage_if_changed(fs, &paths.trusted_hosts(), &cfg.trusted_hosts)?,
    ])
}

/// Apply main.cf parameters with a single `postconf -e` call.
///
/// # Errors
///
/// Returns `ProvisionError::Command` if `postconf` rejects a setting.
pub async fn apply_transfer_agent_settings(
    runner: &impl CommandRunner,
    settings: &[Setting],
) -> Result<()> {
    let assignments: Vec<String> = settings.iter().map(Setting::assignment).collect();
    let mut args = vec!["-e"];
    args.extend(assignments.iter().map(String::as_str));
    run_checked(runner, "postconf", &args).await?;
    tracing::info!(count = settings.len(), "postfix settings applied");
    Ok(())
}

/// Render `/etc/hosts` and `/etc/hostname`.
///
/// # Errors
///
/// Returns an error if the template is missing or a file cannot be written.
pub fn write_host_identity(
    fs: &impl LocalFs,
    paths: &ArtifactPaths,
    identity: &HostIdentity,
) -> Result<Vec<WrittenArtifact>> {
    let hosts = identity.render_hosts(templates::get(templates::HOSTS)?)?;
    Ok(vec![
        write_if_changed(fs, &paths.hosts_file(), &hosts)?,
        write_if_changed(fs, &paths.hostname_file(), &identity.render_hostname())?,
    ])
}
