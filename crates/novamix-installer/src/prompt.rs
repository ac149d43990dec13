//! Terminal confirmation for the overwrite prompt.

use std::io::IsTerminal;

use dialoguer::Confirm as Question;
use novamix_core::{Confirm, Error, Result};

/// Asks on the controlling terminal; defaults to "no".
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if !std::io::stdin().is_terminal() {
            return Err(Error::Prompt(format!(
                "{prompt} (stdin is not a terminal, pass --overwrite always|never)"
            )));
        }

        Question::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| Error::Prompt(e.to_string()))
    }
}
