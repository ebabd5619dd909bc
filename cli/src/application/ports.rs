//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`: never from `crate::infra`
//! or `crate::output`.

use std::net::IpAddr;
use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::domain::ProvisionConfig;

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
}

// ── Filesystem Port ───────────────────────────────────────────────────────────

/// Local filesystem operations the pipeline performs on artifacts.
pub trait LocalFs {
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    /// Create a directory and any missing parents.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    /// Create an empty file. Fails if it exists or the parent is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    fn create_file(&self, path: &Path) -> Result<()>;
    /// Replace `path` with `contents` in a single rename.
    ///
    /// # Errors
    ///
    /// Returns an error if the temp file cannot be written or renamed.
    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()>;
    /// Move `from` over `to` in a single rename, keeping the mode of `to`.
    ///
    /// # Errors
    ///
    /// Returns an error if the rename fails.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
    /// # Errors
    ///
    /// Returns an error if the file cannot be removed.
    fn remove_file(&self, path: &Path) -> Result<()>;
    /// # Errors
    ///
    /// Returns an error if the file cannot be read as UTF-8.
    fn read_to_string(&self, path: &Path) -> Result<String>;
    /// # Errors
    ///
    /// Returns an error if the mode cannot be applied.
    fn set_mode(&self, path: &Path, mode: u32) -> Result<()>;
}

// ── Name Resolution Port ──────────────────────────────────────────────────────

/// Public DNS lookups and the host's externally observed address.
#[allow(async_fn_in_trait)]
pub trait NameResolver {
    /// Addresses `name` resolves to through a public resolver.
    ///
    /// A name with no records yields an empty list, not an error.
    async fn resolve(&self, name: &str) -> Result<Vec<IpAddr>>;
    /// Address this host is seen from on the internet.
    async fn public_address(&self) -> Result<IpAddr>;
}

/// Composite trait: everything a step needs from the machine it runs on.
pub trait HostSystem: CommandRunner + LocalFs + NameResolver {}

/// Blanket implementation: any type implementing all three sub-traits is a `HostSystem`.
impl<T> HostSystem for T where T: CommandRunner + LocalFs + NameResolver {}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait: no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── Input Ports ───────────────────────────────────────────────────────────────

/// Persisted provisioning answers.
pub trait ConfigStore {
    /// Load the stored answers, `None` when nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn load(&self) -> Result<Option<ProvisionConfig>>;
    fn path(&self) -> &Path;
}

/// Interactive questions to the operator.
pub trait Prompter {
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read.
    fn text(&self, prompt: &str, default: Option<&'static str>) -> Result<String>;
    /// Ask without echoing the answer.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read.
    fn secret(&self, prompt: &str) -> Result<String>;
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read.
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool>;
}
