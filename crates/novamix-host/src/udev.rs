//! Device rule placement and hotplug control.

use std::path::Path;

use tracing::{debug, info};

use crate::command;
use crate::error::HostResult;
use crate::privilege::Escalation;

/// Privileged rule file operations and `udevadm` control.
#[derive(Debug, Clone, Copy)]
pub struct Udev {
    escalation: Escalation,
}

impl Udev {
    #[must_use]
    pub fn new(escalation: Escalation) -> Self {
        Self { escalation }
    }

    /// Copy `source` to `target` as root with mode 0644, creating the
    /// directory if needed. Overwrites an existing rule.
    ///
    /// # Errors
    /// Returns an error if the privileged `install` fails.
    pub fn install_rule(&self, source: &Path, target: &Path) -> HostResult<()> {
        command::run(
            self.escalation
                .command("install")
                .args(["-D", "-m", "0644"])
                .arg(source)
                .arg(target),
        )?;
        info!(?target, "Device rule installed");
        Ok(())
    }

    /// Remove the rule file; succeeds if it is already gone.
    ///
    /// # Errors
    /// Returns an error if the privileged `rm` fails.
    pub fn remove_rule(&self, target: &Path) -> HostResult<()> {
        command::run(self.escalation.command("rm").arg("-f").arg(target))?;
        info!(?target, "Device rule removed");
        Ok(())
    }

    /// Reload the rule set and replay add events for attached devices.
    ///
    /// # Errors
    /// Returns an error if either `udevadm` call fails.
    pub fn reload(&self) -> HostResult<()> {
        command::run(self.escalation.command("udevadm").args(["control", "--reload-rules"]))?;
        debug!("udev rules reloaded");
        command::run(self.escalation.command("udevadm").arg("trigger"))?;
        debug!("udev trigger sent");
        Ok(())
    }
}
