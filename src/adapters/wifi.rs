//! WiFi station bring-up for the radio bridge.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: blocking STA association via
//!   `esp_idf_svc::wifi`, waits for the DHCP lease.
//! - **all other targets**: only the credential checks exist.
//!
//! Credentials are baked in at build time (`PLANTPOINT_WIFI_SSID`,
//! `PLANTPOINT_WIFI_PASSWORD`).  A lost association is left to the
//! ESP-IDF driver; the bridge only reacts to the broker session.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

impl std::error::Error for ConnectivityError {}

/// Build-time credentials, empty when the variables were unset.
pub fn build_credentials() -> (&'static str, &'static str) {
    (
        option_env!("PLANTPOINT_WIFI_SSID").unwrap_or(""),
        option_env!("PLANTPOINT_WIFI_PASSWORD").unwrap_or(""),
    )
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

pub fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

/// Empty means an open network.
pub fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

pub fn validate_credentials(ssid: &str, password: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() && password.is_empty() {
        return Err(ConnectivityError::NoCredentials);
    }
    validate_ssid(ssid)?;
    validate_password(password)
}

// ───────────────────────────────────────────────────────────────
// Station
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn connect_station(
    ssid: &str,
    password: &str,
    modem: esp_idf_hal::modem::Modem,
    sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
    nvs: Option<esp_idf_svc::nvs::EspDefaultNvsPartition>,
) -> anyhow::Result<Box<esp_idf_svc::wifi::EspWifi<'static>>> {
    use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
    use log::info;

    validate_credentials(ssid, password)?;

    let mut esp_wifi = EspWifi::new(modem, sysloop.clone(), nvs)?;
    let mut wifi = BlockingWifi::wrap(&mut esp_wifi, sysloop)?;

    let auth_method = if password.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    };
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: ssid.try_into().map_err(|_| ConnectivityError::InvalidSsid)?,
        password: password
            .try_into()
            .map_err(|_| ConnectivityError::InvalidPassword)?,
        auth_method,
        ..Default::default()
    }))?;

    info!("WiFi: starting");
    wifi.start()?;
    info!("WiFi: connecting to '{}'", ssid);
    wifi.connect()?;
    info!("WiFi: waiting for DHCP lease");
    wifi.wait_netif_up()?;

    let ip_info = wifi.wifi().sta_netif().get_ip_info()?;
    info!("WiFi: up, ip={}", ip_info.ip);

    Ok(Box::new(esp_wifi))
}
