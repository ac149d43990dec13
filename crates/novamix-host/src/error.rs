//! Host error types.

use std::path::PathBuf;

use thiserror::Error;

/// Host integration error type.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("No privilege escalation available (tried: {0})")]
    NoEscalation(String),

    #[error("Privilege escalation via {method} was refused: {stderr}")]
    EscalationRefused { method: String, stderr: String },

    #[error("Failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` failed ({status}): {stderr}")]
    CommandFailed { program: String, status: String, stderr: String },

    #[error("Unit not found: {0}")]
    UnitNotFound(String),

    #[error("Executable not found: {0:?}")]
    ExecutableNotFound(PathBuf),

    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;

impl From<HostError> for novamix_core::Error {
    fn from(err: HostError) -> Self {
        match err {
            HostError::NoEscalation(_) | HostError::EscalationRefused { .. } => {
                Self::PrivilegeUnavailable(err.to_string())
            }
            HostError::CommandFailed { program, status, stderr } => {
                Self::CommandFailed { program, status, stderr }
            }
            HostError::UnitNotFound(unit) => Self::UnitNotFound(unit),
            HostError::ExecutableNotFound(path) => Self::ExecutableNotFound(path),
            HostError::Io(e) | HostError::Spawn { source: e, .. } => Self::Io(e),
            HostError::Usb(e) => Self::CommandFailed {
                program: "libusb".to_string(),
                status: "error".to_string(),
                stderr: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_escalation_maps_to_privilege_error() {
        let err: novamix_core::Error = HostError::NoEscalation("sudo, pkexec".into()).into();
        assert_matches!(err, novamix_core::Error::PrivilegeUnavailable(msg) if msg.contains("sudo"));
    }

    #[test]
    fn test_unit_not_found_maps_through() {
        let err: novamix_core::Error = HostError::UnitNotFound("nova-chatmix.service".into()).into();
        assert_matches!(err, novamix_core::Error::UnitNotFound(unit) if unit == "nova-chatmix.service");
    }
}
