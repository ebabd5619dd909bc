//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use hostkit_common::StepId;

use crate::app::{AppContext, AppFlags, BehaviourFlags, LocationFlags, OutputFlags};
use crate::application::services::orchestrator::{RunOptions, run_pipeline, run_single};
use crate::infra::config::{DEFAULT_CONFIG_PATH, YamlConfigStore};
use crate::infra::host::SystemHost;
use crate::infra::logging::{self, DEFAULT_LOG_PATH};
use crate::infra::prompt::DialoguerPrompter;
use crate::output::TerminalReporter;

/// Provision a mail and web hosting server in one pass
///
/// Installs the required packages, then configures the host name,
/// authoritative DNS, DKIM signing and a TLS certificate for the domain.
#[derive(Parser)]
#[command(name = "hostkit", version)]
pub struct Cli {
    /// Answer file read before prompting and updated with new answers
    #[arg(long, env = "HOSTKIT_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Write every artifact under this directory instead of /
    #[arg(long, env = "HOSTKIT_ROOT", default_value = "/")]
    pub root: PathBuf,

    /// Append the run log to this file
    #[arg(long, env = "HOSTKIT_LOG", default_value = DEFAULT_LOG_PATH)]
    pub log_file: PathBuf,

    /// Run only this step; earlier steps are assumed to have run
    #[arg(long, value_enum)]
    pub step: Option<StepId>,

    /// Never prompt; fail when an answer is missing
    #[arg(short, long)]
    pub yes: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,
}

impl Cli {
    /// Run the pipeline and render its report.
    ///
    /// Returns the process exit code.
    ///
    /// # Errors
    ///
    /// Returns an error only if the report cannot be rendered.
    pub async fn run(self) -> Result<i32> {
        let Cli {
            config,
            root,
            log_file,
            step,
            yes,
            json,
            quiet,
            no_color,
        } = self;
        let app = AppContext::new(AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            behaviour: BehaviourFlags { yes },
            locations: LocationFlags {
                config,
                root,
                log_file,
            },
        });

        if let Err(e) = logging::init(&app.log_path) {
            app.output.warn(&format!("run log disabled: {e:#}"));
        }
        tracing::info!(
            root = %app.paths.root().display(),
            config = %app.config_path.display(),
            step = ?step,
            "hostkit {} starting",
            env!("CARGO_PKG_VERSION")
        );

        let host = SystemHost::default();
        let store = YamlConfigStore::new(app.config_path.clone());
        let report = {
            let reporter = TerminalReporter::new(&app.output);
            let opts = RunOptions {
                paths: &app.paths,
                reporter: &reporter,
                interactive: !app.non_interactive,
                today: Local::now().date_naive(),
            };
            match step {
                Some(step) => run_single(&host, &store, &DialoguerPrompter, &opts, step).await,
                None => run_pipeline(&host, &store, &DialoguerPrompter, &opts).await,
            }
        };

        app.renderer().render_report(&report)?;
        Ok(report.exit_code())
    }
}
