//! The real machine: process runner, filesystem and resolver in one value.

use std::net::IpAddr;
use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::application::ports::{CommandRunner, LocalFs, NameResolver};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::fs::SystemFs;
use crate::infra::network::PublicResolver;

/// Production `HostSystem`.
#[derive(Default)]
pub struct SystemHost {
    runner: TokioCommandRunner,
    fs: SystemFs,
    resolver: PublicResolver,
}

impl CommandRunner for SystemHost {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.runner.run(program, args).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        self.runner.run_with_timeout(program, args, timeout).await
    }
}

impl LocalFs for SystemHost {
    fn exists(&self, path: &Path) -> bool {
        self.fs.exists(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.fs.is_dir(path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.fs.create_dir_all(path)
    }

    fn create_file(&self, path: &Path) -> Result<()> {
        self.fs.create_file(path)
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.fs.write_atomic(path, contents)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        self.fs.rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.fs.remove_file(path)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.fs.read_to_string(path)
    }

    fn set_mode(&self, path: &Path, mode: u32) -> Result<()> {
        self.fs.set_mode(path, mode)
    }
}

impl NameResolver for SystemHost {
    async fn resolve(&self, name: &str) -> Result<Vec<IpAddr>> {
        self.resolver.resolve(name).await
    }

    async fn public_address(&self) -> Result<IpAddr> {
        self.resolver.public_address().await
    }
}
