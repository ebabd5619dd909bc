//! Terminal styles for pipeline output.

use hostkit_common::StepOutcome;
use owo_colors::Style;

/// Styles keyed by what is printed. Plain until [`Styles::colorize`].
#[derive(Default, Clone)]
pub struct Styles {
    /// Applied steps and the completed run.
    pub applied: Style,
    /// Skipped steps and warnings.
    pub skipped: Style,
    /// Failed steps and the abort line.
    pub failed: Style,
    /// Step messages while a step is running.
    pub progress: Style,
    /// Notes under an applied step.
    pub note: Style,
    /// The `fix:` label in front of a remediation.
    pub fix: Style,
    /// Run title and section headers.
    pub title: Style,
    /// Records the operator has to publish.
    pub record: Style,
}

impl Styles {
    pub fn colorize(&mut self) {
        self.applied = Style::new().green();
        self.skipped = Style::new().yellow();
        self.failed = Style::new().red();
        self.progress = Style::new().blue();
        self.note = Style::new().dimmed();
        self.fix = Style::new().bold();
        self.title = Style::new().bold().cyan();
        self.record = Style::new().cyan();
    }

    /// Marker and style for a step record.
    #[must_use]
    pub fn outcome(&self, outcome: &StepOutcome) -> (&'static str, Style) {
        match outcome {
            StepOutcome::Applied { .. } => ("✓", self.applied),
            StepOutcome::Skipped { .. } => ("⚠", self.skipped),
            StepOutcome::Failed { .. } => ("✗", self.failed),
        }
    }
}
