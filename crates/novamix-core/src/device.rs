//! Arctis Nova Pro base station identifiers.

/// SteelSeries USB Vendor ID
pub const STEELSERIES_VID: u16 = 0x1038;

/// USB Product IDs for the Arctis Nova Pro Wireless and Wired base stations
pub const NOVA_PRO_PIDS: [u16; 4] = [0x12E0, 0x12E5, 0x12CB, 0x12CD];

/// HID interface (`bInterfaceNumber`) carrying ChatMix reports
pub const CHATMIX_INTERFACE: u8 = 4;

/// Check whether a USB vendor/product pair is a supported base station.
#[must_use]
pub fn is_supported(vendor_id: u16, product_id: u16) -> bool {
    vendor_id == STEELSERIES_VID && NOVA_PRO_PIDS.contains(&product_id)
}
