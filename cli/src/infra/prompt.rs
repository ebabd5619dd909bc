//! Infrastructure implementation of the `Prompter` port on `dialoguer`.

use anyhow::{Context, Result};

use crate::application::ports::Prompter;

/// Terminal prompter.
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn text(&self, prompt: &str, default: Option<&'static str>) -> Result<String> {
        let mut input = dialoguer::Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(default.is_some());
        if let Some(d) = default {
            input = input.default(d.to_string());
        }
        input
            .interact_text()
            .with_context(|| format!("reading answer to '{prompt}'"))
    }

    fn secret(&self, prompt: &str) -> Result<String> {
        dialoguer::Password::new()
            .with_prompt(prompt)
            .interact()
            .with_context(|| format!("reading answer to '{prompt}'"))
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .with_context(|| format!("reading answer to '{prompt}'"))
    }
}
