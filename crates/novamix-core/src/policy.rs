//! Overwrite policy for an already installed helper.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// What to do when the helper is already present at its installed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OverwritePolicy {
    /// Replace without asking
    #[serde(rename = "always")]
    AlwaysOverwrite,
    /// Keep the existing copy
    #[serde(rename = "never")]
    NeverOverwrite,
    /// Ask through the injected [`Confirm`] capability
    #[default]
    #[serde(rename = "prompt")]
    PromptCaller,
}

/// Capability to ask the caller a yes/no question.
#[cfg_attr(test, mockall::automock)]
pub trait Confirm {
    /// Ask `prompt`, returning the caller's answer.
    ///
    /// # Errors
    /// Returns [`crate::Error::Prompt`] if the question cannot be asked.
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

impl OverwritePolicy {
    /// Decide whether the existing file at `target` may be replaced.
    ///
    /// # Errors
    /// Propagates prompt failures from `confirm`.
    pub fn allows_overwrite(self, target: &Path, confirm: &mut dyn Confirm) -> Result<bool> {
        let allowed = match self {
            Self::AlwaysOverwrite => true,
            Self::NeverOverwrite => false,
            Self::PromptCaller => confirm.confirm(&format!("Overwrite {}?", target.display()))?,
        };
        debug!(policy = ?self, allowed, ?target, "Overwrite decision");
        Ok(allowed)
    }
}
