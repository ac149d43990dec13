//! Hotplug (udev) rule for the base station.

use serde::{Deserialize, Serialize};

use crate::artifact::UNIT_NAME;
use crate::device::{NOVA_PRO_PIDS, STEELSERIES_VID};

/// A device rule granting user access and declaring the launch action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotplugRule {
    pub vendor_id: u16,
    pub product_ids: Vec<u16>,
    /// Permission bits for the hidraw node
    pub mode: String,
    /// User unit pulled in when a matching device appears
    pub unit_name: Option<String>,
}

impl Default for HotplugRule {
    fn default() -> Self {
        Self {
            vendor_id: STEELSERIES_VID,
            product_ids: NOVA_PRO_PIDS.to_vec(),
            mode: "0666".to_string(),
            unit_name: Some(UNIT_NAME.to_string()),
        }
    }
}

impl HotplugRule {
    /// Render the rule file, one line per product.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::from(
            "# Arctis Nova Pro base station: user access to the HID interface\n\
             # and ChatMix helper launch on attach.\n",
        );
        for pid in &self.product_ids {
            out.push_str(&format!(
                "SUBSYSTEM==\"hidraw\", ATTRS{{idVendor}}==\"{:04x}\", ATTRS{{idProduct}}==\"{:04x}\", MODE=\"{}\", TAG+=\"uaccess\"",
                self.vendor_id, pid, self.mode
            ));
            if let Some(unit) = &self.unit_name {
                out.push_str(&format!(
                    ", TAG+=\"systemd\", ENV{{SYSTEMD_USER_WANTS}}+=\"{unit}\""
                ));
            }
            out.push('\n');
        }
        out
    }
}
