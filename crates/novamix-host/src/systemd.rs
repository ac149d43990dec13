//! User service manager control via `systemctl --user`.

use std::path::PathBuf;
use std::process::Command;

use novamix_core::ServiceState;
use novamix_core::unit::exec_start_path;
use tracing::{debug, info, warn};

use crate::command;
use crate::error::{HostError, HostResult};
use crate::files;

/// Exit status systemd records when the executable could not be run.
const EXIT_EXEC: &str = "203";

/// Handle on the calling user's service manager.
#[derive(Debug, Clone)]
pub struct UserManager {
    home: PathBuf,
    unit_dir: PathBuf,
}

impl UserManager {
    #[must_use]
    pub fn new(home: PathBuf, unit_dir: PathBuf) -> Self {
        Self { home, unit_dir }
    }

    fn systemctl() -> Command {
        let mut cmd = Command::new("systemctl");
        cmd.arg("--user");
        cmd
    }

    /// Re-read unit files.
    ///
    /// # Errors
    /// Returns an error if `daemon-reload` fails.
    pub fn daemon_reload(&self) -> HostResult<()> {
        command::run(Self::systemctl().arg("daemon-reload"))?;
        debug!("Reloaded user service manager");
        Ok(())
    }

    /// Enable `unit` and start it now.
    ///
    /// # Errors
    /// Returns [`HostError::UnitNotFound`] if the manager does not know the
    /// unit, [`HostError::ExecutableNotFound`] if its executable could not
    /// be run, or [`HostError::CommandFailed`] otherwise.
    pub fn enable_now(&self, unit: &str) -> HostResult<()> {
        let mut cmd = Self::systemctl();
        cmd.args(["enable", "--now", unit]);
        let output = command::run_unchecked(&mut cmd)?;

        if output.status.success() {
            info!(unit, "Enabled and started service");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if is_unknown_unit(&stderr) {
            return Err(HostError::UnitNotFound(unit.to_string()));
        }
        if let Some(exec) = self.missing_executable(unit) {
            return Err(HostError::ExecutableNotFound(exec));
        }
        Err(command::failure(&cmd, &output))
    }

    /// Disable `unit` and stop it now.
    ///
    /// # Errors
    /// Returns [`HostError::UnitNotFound`] if the manager does not know the
    /// unit, or [`HostError::CommandFailed`] otherwise.
    pub fn disable_now(&self, unit: &str) -> HostResult<()> {
        let mut cmd = Self::systemctl();
        cmd.args(["disable", "--now", unit]);
        let output = command::run_unchecked(&mut cmd)?;

        if output.status.success() {
            info!(unit, "Disabled and stopped service");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if is_unknown_unit(&stderr) {
            return Err(HostError::UnitNotFound(unit.to_string()));
        }
        Err(command::failure(&cmd, &output))
    }

    /// Current registration state of `unit`.
    ///
    /// # Errors
    /// Returns an error if `systemctl show` cannot be run.
    pub fn state(&self, unit: &str) -> HostResult<ServiceState> {
        let output = command::run(Self::systemctl().args([
            "show",
            unit,
            "--property=LoadState,ActiveState",
        ]))?;
        let state = parse_show(&String::from_utf8_lossy(&output.stdout));
        debug!(unit, %state, "Queried service state");
        Ok(state)
    }

    /// The unit's executable, if the start failed because it is missing.
    fn missing_executable(&self, unit: &str) -> Option<PathBuf> {
        let descriptor = self.unit_dir.join(unit);
        let contents = std::fs::read_to_string(&descriptor).ok()?;
        let exec = exec_start_path(&contents, &self.home)?;

        if !files::is_executable(&exec) || self.exit_status(unit).as_deref() == Some(EXIT_EXEC) {
            warn!(unit, ?exec, "Service executable could not be run");
            return Some(exec);
        }
        None
    }

    fn exit_status(&self, unit: &str) -> Option<String> {
        let output = command::run(Self::systemctl().args([
            "show",
            unit,
            "--property=ExecMainStatus",
        ]))
        .ok()?;
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .find_map(|line| line.strip_prefix("ExecMainStatus=").map(str::to_string))
    }
}

fn is_unknown_unit(stderr: &str) -> bool {
    stderr.contains("not found") || stderr.contains("does not exist") || stderr.contains("not loaded")
}

/// Map `systemctl show --property=LoadState,ActiveState` output to a state.
///
/// A unit whose file was removed while it was running stays active, so the
/// active state wins over the load state.
#[must_use]
pub fn parse_show(stdout: &str) -> ServiceState {
    let mut load_state = "";
    let mut active_state = "";
    for line in stdout.lines() {
        if let Some((key, value)) = line.split_once('=') {
            match key {
                "LoadState" => load_state = value,
                "ActiveState" => active_state = value,
                _ => {}
            }
        }
    }

    match (load_state, active_state) {
        (_, "active" | "activating" | "reloading") => ServiceState::RegisteredRunning,
        ("not-found" | "", _) => ServiceState::Absent,
        _ => ServiceState::RegisteredStopped,
    }
}
