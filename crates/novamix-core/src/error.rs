//! Error types for Novamix core.

use std::path::PathBuf;

use thiserror::Error;

use crate::plan::Step;
use crate::state::{ServiceState, Transition};

/// Core error type for lifecycle operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Privilege escalation unavailable: {0}")]
    PrivilegeUnavailable(String),

    #[error("Source artifact missing: {0:?}")]
    MissingArtifact(PathBuf),

    #[error("`{program}` failed ({status}): {stderr}")]
    CommandFailed { program: String, status: String, stderr: String },

    #[error("Unit not found: {0}")]
    UnitNotFound(String),

    #[error("Executable not found: {0:?}")]
    ExecutableNotFound(PathBuf),

    #[error("Helper binary missing at {0:?}, refusing to enable the service")]
    BinaryMissing(PathBuf),

    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("Invalid transition {transition:?} from {from:?}")]
    InvalidTransition { from: ServiceState, transition: Transition },

    #[error("Step `{step}` failed after {completed} completed step(s)")]
    StepFailed {
        step: Step,
        completed: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The innermost error, looking through [`Error::StepFailed`].
    #[must_use]
    pub fn root(&self) -> &Error {
        match self {
            Self::StepFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type alias for Novamix core operations.
pub type Result<T> = std::result::Result<T, Error>;
