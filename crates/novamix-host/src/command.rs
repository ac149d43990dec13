//! Subprocess helper.

use std::process::{Command, Output};

use tracing::debug;

use crate::error::{HostError, HostResult};

/// Run a prepared command, failing on a non-zero exit.
///
/// # Errors
/// Returns [`HostError::Spawn`] if the program cannot be started and
/// [`HostError::CommandFailed`] with its stderr if it exits unsuccessfully.
pub fn run(command: &mut Command) -> HostResult<Output> {
    let output = run_unchecked(command)?;
    if !output.status.success() {
        return Err(failure(command, &output));
    }
    Ok(output)
}

/// Run a prepared command and return its output whatever the exit status.
///
/// # Errors
/// Returns [`HostError::Spawn`] if the program cannot be started.
pub fn run_unchecked(command: &mut Command) -> HostResult<Output> {
    let program = program_name(command);
    debug!(%program, args = ?command.get_args().collect::<Vec<_>>(), "Running command");

    command.output().map_err(|source| HostError::Spawn { program, source })
}

/// Build a [`HostError::CommandFailed`] from a finished command.
#[must_use]
pub fn failure(command: &Command, output: &Output) -> HostError {
    HostError::CommandFailed {
        program: program_name(command),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

fn program_name(command: &Command) -> String {
    command.get_program().to_string_lossy().into_owned()
}
