//! Installer configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use novamix_core::{InstallDirs, OverwritePolicy, Sources};
use novamix_host::EscalationMode;
use serde::{Deserialize, Serialize};

/// Installer configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Target directories
    #[serde(default)]
    pub paths: PathsConfig,
    /// Bundled artifact locations
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    /// Install behavior
    #[serde(default)]
    pub install: InstallConfig,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { log_level: default_log_level() }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Target directories. Per-user directories default to the XDG locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_rules_dir")]
    pub rules_dir: PathBuf,
    pub bin_dir: Option<PathBuf>,
    pub unit_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self { rules_dir: default_rules_dir(), bin_dir: None, unit_dir: None }
    }
}

fn default_rules_dir() -> PathBuf {
    PathBuf::from("/etc/udev/rules.d")
}

/// Bundled artifacts, relative paths resolve against the working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    #[serde(default = "default_rule")]
    pub rule: PathBuf,
    #[serde(default = "default_descriptor")]
    pub descriptor: PathBuf,
    #[serde(default = "default_helper")]
    pub helper: PathBuf,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self { rule: default_rule(), descriptor: default_descriptor(), helper: default_helper() }
    }
}

fn default_rule() -> PathBuf {
    PathBuf::from("dist/50-nova-pro-wireless.rules")
}

fn default_descriptor() -> PathBuf {
    PathBuf::from("dist/nova-chatmix.service")
}

fn default_helper() -> PathBuf {
    PathBuf::from("nova-chatmix.py")
}

/// Install behavior.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct InstallConfig {
    /// What to do with an existing helper binary
    #[serde(default)]
    pub overwrite: OverwritePolicy,
    /// How to run privileged steps
    #[serde(default)]
    pub escalation: EscalationMode,
}

impl Config {
    /// Bundled artifact sources.
    #[must_use]
    pub fn sources(&self) -> Sources {
        Sources {
            rule: self.artifacts.rule.clone(),
            descriptor: self.artifacts.descriptor.clone(),
            helper: self.artifacts.helper.clone(),
        }
    }

    /// Resolve target directories against the user's base directories.
    #[must_use]
    pub fn install_dirs(&self, base: &BaseDirs) -> InstallDirs {
        let home = base.home_dir();
        InstallDirs {
            rules_dir: self.paths.rules_dir.clone(),
            bin_dir: self
                .paths
                .bin_dir
                .clone()
                .or_else(|| base.executable_dir().map(Path::to_path_buf))
                .unwrap_or_else(|| home.join(".local/bin")),
            unit_dir: self
                .paths
                .unit_dir
                .clone()
                .unwrap_or_else(|| base.config_dir().join("systemd/user")),
        }
    }
}

/// Where the configuration came from.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults(PathBuf),
}

/// Load configuration from `explicit`, the default file, or defaults.
///
/// An explicitly given file must exist.
pub fn load_config(explicit: Option<&Path>) -> Result<(Config, ConfigSource)> {
    let config_path = match explicit {
        Some(path) => path.to_path_buf(),
        None => config_path()?,
    };

    if explicit.is_some() || config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {config_path:?}"))?;
        let config = parse_config(&content)
            .with_context(|| format!("Failed to parse config file: {config_path:?}"))?;
        Ok((config, ConfigSource::File(config_path)))
    } else {
        Ok((Config::default(), ConfigSource::Defaults(config_path)))
    }
}

fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

/// Get the configuration file path.
fn config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("org", "novamix", "novamix")
        .context("Could not determine config directory")?;
    Ok(dirs.config_dir().join("config.toml"))
}
