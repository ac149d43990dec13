//! Novamix Host - Linux implementation of the lifecycle's system seam.
//!
//! Rules are copied with `sudo` or `pkexec`, the hotplug subsystem is driven
//! with `udevadm`, the user service manager with `systemctl --user`, and the
//! helper is placed with plain filesystem calls.

pub mod command;
pub mod error;
pub mod files;
pub mod host;
pub mod privilege;
pub mod systemd;
pub mod udev;
pub mod usb;

pub use error::{HostError, HostResult};
pub use host::HostSystem;
pub use privilege::{Escalation, EscalationMode};
pub use usb::BaseStation;
