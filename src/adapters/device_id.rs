//! Device identity derived from the ESP32 factory MAC address.
//!
//! The bridge's MQTT client id is the configured prefix plus the last 3
//! bytes of the 6-byte MAC in lowercase hex, e.g. `mpino_bridge_efcafe`.
//! Deterministic across reboots (factory-burned eFuse MAC), so a broker
//! sees a restarted bridge as the same client.

/// Client id storage; long enough for a 32-byte prefix plus suffix.
pub type ClientIdString = heapless::String<48>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: writes exactly 6 bytes into `mac`.
    unsafe {
        esp_idf_sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// `<prefix>_xxyyzz`.  An over-long prefix is cut so the suffix always fits.
pub fn client_id(prefix: &str, mac: &MacAddress) -> ClientIdString {
    use core::fmt::Write;

    const SUFFIX_LEN: usize = 7;
    let mut id = ClientIdString::new();
    for ch in prefix.chars() {
        if id.len() + ch.len_utf8() > id.capacity() - SUFFIX_LEN {
            break;
        }
        let _ = id.push(ch);
    }
    let _ = write!(id, "_{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    id
}
