//! Privilege escalation for the system-wide steps.

use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::command;
use crate::error::{HostError, HostResult};

/// Configured escalation preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EscalationMode {
    /// Nothing when already root, else `sudo`, else `pkexec`
    #[default]
    Auto,
    Sudo,
    Pkexec,
    /// Run privileged commands directly
    None,
}

/// Resolved escalation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    Direct,
    Sudo,
    Pkexec,
}

impl Escalation {
    /// Resolve `mode` against the running process and installed tools.
    ///
    /// # Errors
    /// Returns [`HostError::NoEscalation`] if the requested tool is missing.
    pub fn resolve(mode: EscalationMode) -> HostResult<Self> {
        choose(
            mode,
            is_root(),
            which::which("sudo").is_ok(),
            which::which("pkexec").is_ok(),
        )
    }

    /// Build a command that runs `program` with elevated privileges.
    #[must_use]
    pub fn command(self, program: &str) -> Command {
        match self {
            Self::Direct => Command::new(program),
            Self::Sudo => {
                let mut cmd = Command::new("sudo");
                cmd.arg(program);
                cmd
            }
            Self::Pkexec => {
                let mut cmd = Command::new("pkexec");
                cmd.arg(program);
                cmd
            }
        }
    }

    /// Make sure escalation works now, before anything is changed.
    ///
    /// `sudo -v` caches credentials so the later privileged steps do not
    /// prompt again.
    ///
    /// # Errors
    /// Returns [`HostError::EscalationRefused`] if authentication fails.
    pub fn validate(self) -> HostResult<()> {
        let mut cmd = match self {
            Self::Direct => return Ok(()),
            Self::Sudo => {
                let mut cmd = Command::new("sudo");
                cmd.arg("-v");
                cmd
            }
            Self::Pkexec => {
                let mut cmd = Command::new("pkexec");
                cmd.arg("true");
                cmd
            }
        };

        match command::run(&mut cmd) {
            Ok(_) => {
                info!(method = %self, "Privilege escalation available");
                Ok(())
            }
            Err(HostError::CommandFailed { stderr, .. }) => {
                Err(HostError::EscalationRefused { method: self.to_string(), stderr })
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Display for Escalation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::Sudo => f.write_str("sudo"),
            Self::Pkexec => f.write_str("pkexec"),
        }
    }
}

fn choose(mode: EscalationMode, root: bool, has_sudo: bool, has_pkexec: bool) -> HostResult<Escalation> {
    debug!(?mode, root, has_sudo, has_pkexec, "Resolving privilege escalation");
    match mode {
        EscalationMode::None => Ok(Escalation::Direct),
        EscalationMode::Auto if root => Ok(Escalation::Direct),
        EscalationMode::Auto if has_sudo => Ok(Escalation::Sudo),
        EscalationMode::Auto if has_pkexec => Ok(Escalation::Pkexec),
        EscalationMode::Auto => Err(HostError::NoEscalation("sudo, pkexec".to_string())),
        EscalationMode::Sudo if has_sudo => Ok(Escalation::Sudo),
        EscalationMode::Sudo => Err(HostError::NoEscalation("sudo".to_string())),
        EscalationMode::Pkexec if has_pkexec => Ok(Escalation::Pkexec),
        EscalationMode::Pkexec => Err(HostError::NoEscalation("pkexec".to_string())),
    }
}

#[allow(unsafe_code)] // geteuid has no preconditions
fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}
