//! `status` subcommand.

use std::path::PathBuf;

use anyhow::Result;
use novamix_core::{Layout, ServiceState, SystemIntegration};
use novamix_host::BaseStation;
use novamix_host::files::is_executable;
use serde::Serialize;
use tracing::warn;

/// Installation state as seen from the host.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub rule_path: PathBuf,
    pub rule_installed: bool,
    pub binary_path: PathBuf,
    pub binary_installed: bool,
    pub binary_executable: bool,
    pub descriptor_path: PathBuf,
    pub descriptor_installed: bool,
    pub unit: String,
    pub service: ServiceState,
    pub base_stations: Vec<BaseStation>,
}

impl StatusReport {
    /// Gather the report.
    pub fn collect(system: &dyn SystemIntegration, layout: &Layout) -> Result<Self> {
        let base_stations = novamix_host::usb::find_base_stations().unwrap_or_else(|e| {
            warn!(error = %e, "Could not enumerate USB devices");
            Vec::new()
        });

        Ok(Self {
            rule_path: layout.rule.target.clone(),
            rule_installed: system.file_exists(&layout.rule.target),
            binary_path: layout.binary.target.clone(),
            binary_installed: system.file_exists(&layout.binary.target),
            binary_executable: is_executable(&layout.binary.target),
            descriptor_path: layout.descriptor.target.clone(),
            descriptor_installed: system.file_exists(&layout.descriptor.target),
            unit: layout.unit_name.clone(),
            service: system.service_state(&layout.unit_name)?,
            base_stations,
        })
    }

    /// Whether everything an install places is present and running.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.rule_installed
            && self.binary_executable
            && self.descriptor_installed
            && self.service == ServiceState::RegisteredRunning
    }

    /// Human-readable summary.
    #[must_use]
    pub fn render(&self) -> String {
        let mark = |present: bool| if present { "present" } else { "missing" };
        let mut out = String::new();
        out.push_str(&format!("device rule:        {} ({})\n", mark(self.rule_installed), self.rule_path.display()));
        out.push_str(&format!(
            "helper binary:      {}{} ({})\n",
            mark(self.binary_installed),
            if self.binary_installed && !self.binary_executable { ", not executable" } else { "" },
            self.binary_path.display()
        ));
        out.push_str(&format!(
            "service descriptor: {} ({})\n",
            mark(self.descriptor_installed),
            self.descriptor_path.display()
        ));
        out.push_str(&format!("service {}: {}\n", self.unit, self.service));
        if self.base_stations.is_empty() {
            out.push_str("base station:       not connected\n");
        }
        for station in &self.base_stations {
            out.push_str(&format!(
                "base station:       {:04x} on bus {} address {}{}\n",
                station.product_id,
                station.bus,
                station.address,
                if station.chatmix_interface { "" } else { " (no ChatMix interface)" }
            ));
        }
        out.push_str(&format!("installed:          {}\n", if self.is_installed() { "yes" } else { "no" }));
        out
    }
}
