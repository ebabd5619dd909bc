//! Human-readable terminal renderer.

use hostkit_common::{PipelineReport, StepOutcome, StepRecord, Terminal};
use owo_colors::OwoColorize as _;

use crate::output::OutputContext;

/// Renders pipeline reports as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the outcome of a run.
    ///
    /// An aborted run is printed to stderr even when `quiet` is set.
    pub fn render_report(&self, report: &PipelineReport) {
        if !self.ctx.quiet {
            println!();
            let title = match &report.domain {
                Some(domain) => format!("Provisioning {domain}"),
                None => "Provisioning".to_string(),
            };
            self.ctx.header(&title);
            println!();
            for record in &report.records {
                self.render_record(record);
            }
        }

        match &report.terminal {
            Terminal::Completed => {
                if !self.ctx.quiet {
                    println!();
                    self.ctx.success("Run completed");
                }
                self.render_publish(&report.publish);
            }
            Terminal::Aborted {
                step,
                class,
                reason,
            } => {
                eprintln!();
                self.ctx
                    .error(&format!("Aborted at {step} ({class} error): {reason}"));
            }
        }
    }

    fn render_record(&self, record: &StepRecord) {
        let step = record.step.as_str();
        let styles = &self.ctx.styles;
        let (marker, style) = styles.outcome(&record.outcome);
        match &record.outcome {
            StepOutcome::Applied { notes } => {
                println!("  {} {step}", marker.style(style));
                for note in notes {
                    println!("      {}", note.style(styles.note));
                }
            }
            StepOutcome::Skipped {
                reason,
                remediation,
            } => {
                println!("  {} {step} {}", marker.style(style), "skipped".style(style));
                println!("      {reason}");
                if let Some(fix) = remediation {
                    println!("      {} {fix}", "fix:".style(styles.fix));
                }
            }
            StepOutcome::Failed { class, message } => {
                println!(
                    "  {} {step} {}",
                    marker.style(style),
                    format!("failed ({class})").style(style)
                );
                println!("      {message}");
            }
        }
    }

    fn render_publish(&self, publish: &[String]) {
        if self.ctx.quiet || publish.is_empty() {
            return;
        }
        println!();
        self.ctx.header("Publish at your registrar:");
        for line in publish {
            println!("    {}", line.style(self.ctx.styles.record));
        }
        println!();
        self.ctx
            .info("Mail will not be accepted by other hosts until these records resolve.");
    }
}
