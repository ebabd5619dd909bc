//! Application context: unified state built once from the command line.
//!
//! Owns the output context, the paths the run writes under and the
//! locations of the answer file and the run log.

use std::path::PathBuf;

use crate::domain::ArtifactPaths;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON report.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by `CI` / `HOSTKIT_YES` env vars).
    pub yes: bool,
}

/// Where things live on disk.
pub struct LocationFlags {
    /// Answer file.
    pub config: PathBuf,
    /// Prefix for every artifact the pipeline writes.
    pub root: PathBuf,
    /// Run log.
    pub log_file: PathBuf,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    pub output: OutputFlags,
    pub behaviour: BehaviourFlags,
    pub locations: LocationFlags,
}

/// Unified application context.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// When `true`, never prompt; unanswered inputs fail the run.
    ///
    /// Set when `--yes` / `-y` is passed, or when the `CI` or `HOSTKIT_YES`
    /// environment variables are present.
    pub non_interactive: bool,
    pub paths: ArtifactPaths,
    pub config_path: PathBuf,
    pub log_path: PathBuf,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    #[must_use]
    pub fn new(flags: AppFlags) -> Self {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("HOSTKIT_YES").is_ok();
        let non_interactive = flags.behaviour.yes || ci_env;

        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        // Progress lines would corrupt the JSON document on stdout.
        let quiet = flags.output.quiet || mode == OutputMode::Json;

        Self {
            output: OutputContext::new(flags.output.no_color, quiet),
            mode,
            non_interactive,
            paths: ArtifactPaths::new(flags.locations.root),
            config_path: flags.locations.config,
            log_path: flags.locations.log_file,
        }
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }
}
