//! Base station detection over USB.

use novamix_core::device::{CHATMIX_INTERFACE, is_supported};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::HostResult;

/// An attached Arctis Nova Pro base station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaseStation {
    pub product_id: u16,
    pub bus: u8,
    pub address: u8,
    /// Whether the active configuration exposes the ChatMix HID interface
    pub chatmix_interface: bool,
}

/// Enumerate attached base stations.
///
/// # Errors
/// Returns an error if USB devices cannot be enumerated.
pub fn find_base_stations() -> HostResult<Vec<BaseStation>> {
    let mut found = Vec::new();

    for device in rusb::devices()?.iter() {
        let Ok(desc) = device.device_descriptor() else {
            continue;
        };
        if !is_supported(desc.vendor_id(), desc.product_id()) {
            continue;
        }

        let chatmix_interface = device.active_config_descriptor().is_ok_and(|config| {
            config.interfaces().any(|iface| iface.number() == CHATMIX_INTERFACE)
        });

        info!(
            product_id = desc.product_id(),
            bus = device.bus_number(),
            address = device.address(),
            chatmix_interface,
            "Base station detected"
        );
        found.push(BaseStation {
            product_id: desc.product_id(),
            bus: device.bus_number(),
            address: device.address(),
            chatmix_interface,
        });
    }

    if found.is_empty() {
        debug!("No base station found");
    }
    Ok(found)
}
