//! User service descriptor for the helper.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::artifact::BINARY_NAME;

/// A systemd user unit supervising the helper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceUnit {
    pub description: String,
    pub after: Vec<String>,
    /// `ExecStart=` value; `%h` expands to the user's home
    pub exec_start: String,
    pub restart: String,
    pub restart_sec: u32,
    pub wanted_by: Vec<String>,
}

impl Default for ServiceUnit {
    fn default() -> Self {
        Self {
            description: "Arctis Nova Pro ChatMix helper".to_string(),
            after: vec!["pipewire.service".to_string(), "pipewire-pulse.service".to_string()],
            exec_start: format!("%h/.local/bin/{BINARY_NAME}"),
            restart: "on-failure".to_string(),
            restart_sec: 5,
            wanted_by: vec!["default.target".to_string()],
        }
    }
}

impl ServiceUnit {
    /// Render the unit file.
    ///
    /// `Type=exec` makes the start request itself fail when the executable
    /// is missing instead of reporting success and failing later.
    #[must_use]
    pub fn render(&self) -> String {
        let mut unit = String::new();

        unit.push_str("[Unit]\n");
        unit.push_str(&format!("Description={}\n", self.description));
        if !self.after.is_empty() {
            unit.push_str(&format!("After={}\n", self.after.join(" ")));
        }

        unit.push_str("\n[Service]\n");
        unit.push_str("Type=exec\n");
        unit.push_str(&format!("ExecStart={}\n", self.exec_start));
        unit.push_str(&format!("Restart={}\n", self.restart));
        unit.push_str(&format!("RestartSec={}\n", self.restart_sec));

        unit.push_str("\n[Install]\n");
        unit.push_str(&format!("WantedBy={}\n", self.wanted_by.join(" ")));

        unit
    }
}

/// Extract the executable path from a unit file's `ExecStart=` setting.
///
/// Whitespace around `=` is allowed and the last assignment wins; an empty
/// assignment resets the setting. Command prefixes (`-`, `@`, `+`, `!`, `:`)
/// are stripped and `%h` is expanded to `home`. Returns `None` if no
/// `ExecStart=` value remains.
#[must_use]
pub fn exec_start_path(contents: &str, home: &Path) -> Option<PathBuf> {
    let mut value: Option<&str> = None;
    for line in contents.lines().map(str::trim) {
        let Some((key, rest)) = line.split_once('=') else {
            continue;
        };
        if key.trim() == "ExecStart" {
            let rest = rest.trim();
            value = (!rest.is_empty()).then_some(rest);
        }
    }

    let command = value?.trim_start_matches(['-', '@', '+', '!', ':']);
    let program = command.split_whitespace().next()?;
    let expanded = program.replace("%h", &home.to_string_lossy());
    Some(PathBuf::from(expanded))
}
