//! Ordered step lists for install and uninstall.
//!
//! A plan is the explicit version of "run these lines top to bottom": each
//! step is checked by the runner and the first failure stops the plan.

use serde::{Deserialize, Serialize};

/// Lifecycle operation requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Install,
    Uninstall,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Install => f.write_str("install"),
            Self::Uninstall => f.write_str("uninstall"),
        }
    }
}

/// A single checked action of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Verify elevation is available before touching anything
    CheckPrivilege,
    /// Privileged copy of the device rule
    InstallRule,
    /// Privileged removal of the device rule
    RemoveRule,
    /// Reload rules and re-trigger attached devices
    ReloadHotplug,
    /// Copy the helper and set the executable bits
    PlaceBinary,
    /// Delete the installed helper
    RemoveBinary,
    /// Copy the service descriptor into the unit directory
    RegisterService,
    /// Delete the service descriptor
    UnregisterService,
    /// Ask the service manager to re-read unit files
    ReloadServices,
    /// Enable for future logins and start now
    EnableAndStart,
    /// Disable and stop now
    DisableAndStop,
}

impl Step {
    /// Whether the step needs elevated privileges.
    #[must_use]
    pub fn is_privileged(self) -> bool {
        matches!(self, Self::InstallRule | Self::RemoveRule | Self::ReloadHotplug)
    }

    /// Human-readable description for plan listings.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::CheckPrivilege => "check privilege escalation",
            Self::InstallRule => "install device rule",
            Self::RemoveRule => "remove device rule",
            Self::ReloadHotplug => "reload hotplug rules and trigger devices",
            Self::PlaceBinary => "place helper binary",
            Self::RemoveBinary => "remove helper binary",
            Self::RegisterService => "install service descriptor",
            Self::UnregisterService => "remove service descriptor",
            Self::ReloadServices => "reload user service manager",
            Self::EnableAndStart => "enable and start service",
            Self::DisableAndStop => "disable and stop service",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// An ordered list of steps for one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    operation: Operation,
    steps: Vec<Step>,
}

impl Plan {
    /// The fixed step order for `operation`.
    ///
    /// Install places the binary before the service is enabled; uninstall
    /// disables the service before the binary is removed.
    #[must_use]
    pub fn for_operation(operation: Operation) -> Self {
        let steps = match operation {
            Operation::Install => vec![
                Step::CheckPrivilege,
                Step::InstallRule,
                Step::ReloadHotplug,
                Step::PlaceBinary,
                Step::RegisterService,
                Step::ReloadServices,
                Step::EnableAndStart,
            ],
            Operation::Uninstall => vec![
                Step::CheckPrivilege,
                Step::DisableAndStop,
                Step::UnregisterService,
                Step::ReloadServices,
                Step::RemoveBinary,
                Step::RemoveRule,
                Step::ReloadHotplug,
            ],
        };
        Self { operation, steps }
    }

    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
