//! Novamix Core - lifecycle logic for the ChatMix helper installation.
//!
//! This crate owns the device-triggered service lifecycle: which artifacts are
//! placed where, the order in which the steps of an install or uninstall run,
//! and the per-session service state machine. Every side effect goes through
//! the [`SystemIntegration`] trait so the lifecycle can run against the real
//! host or against [`fake::FakeSystem`].

pub mod artifact;
pub mod device;
pub mod error;
pub mod fake;
pub mod plan;
pub mod policy;
pub mod rule;
pub mod runner;
pub mod state;
pub mod system;
pub mod unit;

pub use artifact::{Artifact, InstallDirs, Layout, Sources};
pub use error::{Error, Result};
pub use plan::{Operation, Plan, Step};
pub use policy::{Confirm, OverwritePolicy};
pub use rule::HotplugRule;
pub use runner::{Report, Runner, SkipReason, StepOutcome, StepRecord};
pub use state::{ServiceState, Transition};
pub use system::SystemIntegration;
pub use unit::ServiceUnit;
