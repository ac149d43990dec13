//! Per-session service state machine.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Registration state of the helper unit in the user's service manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    /// The manager does not know the unit
    #[default]
    Absent,
    /// Unit loaded but neither enabled nor running
    RegisteredStopped,
    /// Unit enabled and started
    RegisteredRunning,
}

/// Transitions the lifecycle applies to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Register, enable and start in one step
    Install,
    /// Disable and stop, keeping the descriptor
    DisableAndStop,
    /// Drop the descriptor from the manager
    Remove,
}

impl ServiceState {
    /// Compute the state reached by applying `transition`.
    ///
    /// Removing a running unit is rejected: it must be disabled and stopped
    /// first, otherwise the manager keeps a process whose descriptor is gone.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTransition`] for transitions the lifecycle
    /// never performs from this state.
    pub fn apply(self, transition: Transition) -> Result<Self> {
        match (self, transition) {
            (_, Transition::Install) => Ok(Self::RegisteredRunning),
            (Self::RegisteredRunning | Self::RegisteredStopped, Transition::DisableAndStop) => {
                Ok(Self::RegisteredStopped)
            }
            (Self::RegisteredStopped | Self::Absent, Transition::Remove) => Ok(Self::Absent),
            (from, transition) => Err(Error::InvalidTransition { from, transition }),
        }
    }

    /// Whether this is a state a completed run may end in.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Absent | Self::RegisteredRunning)
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Absent => "absent",
            Self::RegisteredStopped => "registered (stopped)",
            Self::RegisteredRunning => "registered (running)",
        };
        f.write_str(name)
    }
}
