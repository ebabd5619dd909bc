//! Unit tests for the hostkit CLI
//!
//! These tests run the application services against a fake host rooted in a
//! temp directory. No package manager, service manager or network is touched.

mod config_writer_service;
mod ensure_service;
mod pipeline_orchestrator;
mod service_control_service;
