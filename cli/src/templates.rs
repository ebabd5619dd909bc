//! Embedded configuration templates.
//!
//! At compile time, `include_dir!` embeds everything under `cli/templates/`:
//!   - `opendkim.conf.tmpl`: signing daemon configuration
//!   - `hosts.tmpl`: `/etc/hosts` with the mail host mapping
//!   - `packages.list`: packages installed by the prerequisites step

use anyhow::{Context, Result};
use include_dir::{Dir, include_dir};

static TEMPLATES: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/templates");

pub const OPENDKIM_CONF: &str = "opendkim.conf.tmpl";
pub const HOSTS: &str = "hosts.tmpl";
pub const PACKAGES: &str = "packages.list";

/// Text of a single embedded template.
///
/// # Errors
///
/// Returns an error if no template with the given `name` exists or it is not
/// valid UTF-8.
pub fn get(name: &str) -> Result<&'static str> {
    TEMPLATES
        .get_file(name)
        .and_then(|f| std::str::from_utf8(f.contents()).ok())
        .with_context(|| format!("embedded template not found: {name}"))
}

/// Packages the prerequisites step installs, in file order.
///
/// # Errors
///
/// Returns an error if the package list is missing from the binary.
pub fn required_packages() -> Result<Vec<&'static str>> {
    Ok(get(PACKAGES)?
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect())
}
