//! [`SystemIntegration`] for a real Linux desktop.

use std::path::{Path, PathBuf};

use novamix_core::{Result, ServiceState, SystemIntegration};
use tracing::debug;

use crate::files;
use crate::privilege::{Escalation, EscalationMode};
use crate::systemd::UserManager;
use crate::udev::Udev;

/// The calling user's desktop session.
pub struct HostSystem {
    mode: EscalationMode,
    escalation: Option<Escalation>,
    manager: UserManager,
}

impl HostSystem {
    /// Create a host handle; escalation is resolved on first use.
    #[must_use]
    pub fn new(mode: EscalationMode, home: PathBuf, unit_dir: PathBuf) -> Self {
        Self { mode, escalation: None, manager: UserManager::new(home, unit_dir) }
    }

    fn udev(&mut self) -> Result<Udev> {
        let escalation = match self.escalation {
            Some(escalation) => escalation,
            None => {
                let escalation = Escalation::resolve(self.mode)?;
                debug!(%escalation, "Resolved privilege escalation");
                self.escalation = Some(escalation);
                escalation
            }
        };
        Ok(Udev::new(escalation))
    }
}

impl SystemIntegration for HostSystem {
    fn check_privilege(&mut self) -> Result<()> {
        let escalation = Escalation::resolve(self.mode)?;
        escalation.validate()?;
        self.escalation = Some(escalation);
        Ok(())
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn install_rule(&mut self, source: &Path, target: &Path) -> Result<()> {
        Ok(self.udev()?.install_rule(source, target)?)
    }

    fn remove_rule(&mut self, target: &Path) -> Result<()> {
        Ok(self.udev()?.remove_rule(target)?)
    }

    fn reload_hotplug(&mut self) -> Result<()> {
        Ok(self.udev()?.reload()?)
    }

    fn place_binary(&mut self, source: &Path, target: &Path) -> Result<()> {
        Ok(files::place_executable(source, target)?)
    }

    fn remove_binary(&mut self, target: &Path) -> Result<()> {
        Ok(files::remove_if_present(target)?)
    }

    fn register_service(&mut self, source: &Path, target: &Path) -> Result<()> {
        Ok(files::copy_into_place(source, target)?)
    }

    fn unregister_service(&mut self, target: &Path) -> Result<()> {
        Ok(files::remove_if_present(target)?)
    }

    fn reload_services(&mut self) -> Result<()> {
        Ok(self.manager.daemon_reload()?)
    }

    fn start_service(&mut self, unit: &str) -> Result<()> {
        Ok(self.manager.enable_now(unit)?)
    }

    fn stop_service(&mut self, unit: &str) -> Result<()> {
        Ok(self.manager.disable_now(unit)?)
    }

    fn service_state(&self, unit: &str) -> Result<ServiceState> {
        Ok(self.manager.state(unit)?)
    }
}
