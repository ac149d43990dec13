//! Seam between the lifecycle and the operating system.

use std::path::Path;

use crate::error::Result;
use crate::state::ServiceState;

/// Side-effecting operations the lifecycle performs on the host.
///
/// Copies overwrite their target. Removals of an absent target succeed.
#[cfg_attr(test, mockall::automock)]
pub trait SystemIntegration {
    /// Fail fast if privileged steps cannot be performed.
    ///
    /// # Errors
    /// Returns [`crate::Error::PrivilegeUnavailable`] when no escalation
    /// method works.
    fn check_privilege(&mut self) -> Result<()>;

    /// Whether a file exists at `path`.
    fn file_exists(&self, path: &Path) -> bool;

    /// Copy the device rule into the system rule directory (privileged).
    ///
    /// # Errors
    /// Returns an error if the privileged copy fails.
    fn install_rule(&mut self, source: &Path, target: &Path) -> Result<()>;

    /// Delete the device rule (privileged).
    ///
    /// # Errors
    /// Returns an error if the privileged removal fails.
    fn remove_rule(&mut self, target: &Path) -> Result<()>;

    /// Reload the hotplug rule set and re-trigger attached devices.
    ///
    /// # Errors
    /// Returns an error if either control command fails.
    fn reload_hotplug(&mut self) -> Result<()>;

    /// Copy the helper to `target`, creating its directory, and mark it
    /// executable.
    ///
    /// # Errors
    /// Returns an error if the copy or permission change fails.
    fn place_binary(&mut self, source: &Path, target: &Path) -> Result<()>;

    /// Delete the installed helper.
    ///
    /// # Errors
    /// Returns an error if the file exists and cannot be removed.
    fn remove_binary(&mut self, target: &Path) -> Result<()>;

    /// Copy the service descriptor into the unit directory, creating it.
    ///
    /// # Errors
    /// Returns an error if the copy fails.
    fn register_service(&mut self, source: &Path, target: &Path) -> Result<()>;

    /// Delete the service descriptor.
    ///
    /// # Errors
    /// Returns an error if the file exists and cannot be removed.
    fn unregister_service(&mut self, target: &Path) -> Result<()>;

    /// Ask the service manager to re-read its unit files.
    ///
    /// # Errors
    /// Returns an error if the manager rejects the reload.
    fn reload_services(&mut self) -> Result<()>;

    /// Enable `unit` for future logins and start it now.
    ///
    /// # Errors
    /// Returns an error if the manager rejects the request, including
    /// [`crate::Error::ExecutableNotFound`].
    fn start_service(&mut self, unit: &str) -> Result<()>;

    /// Disable `unit` and stop it now.
    ///
    /// # Errors
    /// Returns an error if the manager rejects the request.
    fn stop_service(&mut self, unit: &str) -> Result<()>;

    /// Query the manager's view of `unit`.
    ///
    /// # Errors
    /// Returns an error if the manager cannot be queried.
    fn service_state(&self, unit: &str) -> Result<ServiceState>;
}
