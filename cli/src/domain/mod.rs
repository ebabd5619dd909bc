//! Domain layer: pure types, rendering and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::application`,
//! `crate::output`, `tokio`, `std::fs` or `std::process`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod context;
pub mod dkim;
pub mod dns;
pub mod error;
pub mod hosts;
pub mod paths;
pub mod pipeline;
pub mod postfix;
pub mod template;

pub use config::ProvisionConfig;
pub use context::{DatabaseCredentials, Field, ProvisioningContext};
pub use error::ProvisionError;
pub use paths::ArtifactPaths;
pub use pipeline::{Precondition, Severity, ValidationResult};
