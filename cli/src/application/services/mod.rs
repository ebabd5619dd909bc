//! Application services: use-case orchestration.
//!
//! Each service module implements a single use-case by composing domain logic
//! with port trait calls. Services import only from `crate::domain` and
//! `crate::application::ports`: never from `crate::infra` or `crate::output`.

pub mod config_writer;
pub mod ensure;
pub mod input;
pub mod orchestrator;
pub mod process;
pub mod service_control;
pub mod steps;
pub mod validator;
