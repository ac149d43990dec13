//! Installed artifacts and where they live.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// File name of the udev rule under the system rule directory.
pub const RULE_FILE_NAME: &str = "50-nova-pro-wireless.rules";
/// Fixed installed name of the helper, regardless of its source file name.
pub const BINARY_NAME: &str = "nova-chatmix";
/// Unit name registered with the user service manager.
pub const UNIT_NAME: &str = "nova-chatmix.service";

/// A bundled source file and its installed location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub source: PathBuf,
    pub target: PathBuf,
}

/// Bundled artifacts shipped with the distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sources {
    pub rule: PathBuf,
    pub descriptor: PathBuf,
    pub helper: PathBuf,
}

/// Target directories for each artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallDirs {
    /// System rule directory, usually `/etc/udev/rules.d`
    pub rules_dir: PathBuf,
    /// Per-user executable directory, usually `~/.local/bin`
    pub bin_dir: PathBuf,
    /// Per-user unit directory, usually `~/.config/systemd/user`
    pub unit_dir: PathBuf,
}

/// Complete placement of one installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub rule: Artifact,
    pub binary: Artifact,
    pub descriptor: Artifact,
    pub unit_name: String,
}

impl Layout {
    /// Build the layout from bundled sources and target directories.
    #[must_use]
    pub fn new(sources: &Sources, dirs: &InstallDirs) -> Self {
        Self {
            rule: Artifact {
                source: sources.rule.clone(),
                target: dirs.rules_dir.join(RULE_FILE_NAME),
            },
            binary: Artifact {
                source: sources.helper.clone(),
                target: dirs.bin_dir.join(BINARY_NAME),
            },
            descriptor: Artifact {
                source: sources.descriptor.clone(),
                target: dirs.unit_dir.join(UNIT_NAME),
            },
            unit_name: UNIT_NAME.to_string(),
        }
    }
}
