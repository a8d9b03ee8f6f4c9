//! Raw GPIO / ADC helpers addressed by pin number.
//!
//! The controller learns its pin map at runtime, so pins are configured
//! one at a time as configuration commands arrive rather than in a single
//! boot-time pass.  All helpers use raw ESP-IDF sys calls and are only
//! called from the main loop.
//!
//! On host targets every helper is a no-op stub.

#[cfg(target_os = "espidf")]
use esp_idf_sys::*;

#[cfg(target_os = "espidf")]
use log::{info, warn};

// ── Error type ────────────────────────────────────────────────

/// Errors during peripheral setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
    /// The pin has no ADC1 channel.
    NotAnalogCapable(i32),
    IsrInstallFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::NotAnalogCapable(pin) => write!(f, "GPIO{} has no ADC1 channel", pin),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: Must be called only from the main loop.  `init_adc()`
/// completes before the loop starts.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

/// Create the ADC1 oneshot unit.  Channels are added per pin by
/// [`configure_analog`].
#[cfg(target_os = "espidf")]
pub fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }
    info!("hw_init: ADC1 unit ready");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_adc() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ADC init skipped");
    Ok(())
}

/// ADC1 channel wired to `pin`.
#[cfg(target_os = "espidf")]
fn adc1_channel(pin: i32) -> Result<adc_channel_t, HwInitError> {
    let mut unit: adc_unit_t = 0;
    let mut channel: adc_channel_t = 0;
    // SAFETY: pure lookup into the SoC pin table.
    let ret = unsafe { adc_oneshot_io_to_channel(pin, &mut unit, &mut channel) };
    if ret != ESP_OK as i32 || unit != adc_unit_t_ADC_UNIT_1 {
        return Err(HwInitError::NotAnalogCapable(pin));
    }
    Ok(channel)
}

/// Add `pin`'s ADC1 channel to the oneshot unit (12 dB, 12 bit).
#[cfg(target_os = "espidf")]
pub fn configure_analog(pin: i32) -> Result<(), HwInitError> {
    let channel = adc1_channel(pin)?;
    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    // SAFETY: adc1_handle() contract: main-loop access only.
    let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), channel, &chan_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn configure_analog(_pin: i32) -> Result<(), HwInitError> {
    Ok(())
}

/// Raw 12-bit sample; 0 when the pin has no channel or the read fails.
#[cfg(target_os = "espidf")]
pub fn adc_read_pin(pin: i32) -> u16 {
    let Ok(channel) = adc1_channel(pin) else {
        return 0;
    };
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract: main-loop access only.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return 0;
    }
    raw.max(0) as u16
}

#[cfg(not(target_os = "espidf"))]
pub fn adc_read_pin(_pin: i32) -> u16 {
    0
}

// ── GPIO ──────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn gpio_configure(pin: i32, mode: gpio_mode_t, pull_up: bool) -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode,
        pull_up_en: if pull_up {
            gpio_pullup_t_GPIO_PULLUP_ENABLE
        } else {
            gpio_pullup_t_GPIO_PULLUP_DISABLE
        },
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: gpio_config only touches the pins in pin_bit_mask.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    Ok(())
}

/// Push-pull output, driven to `high` straight away.
#[cfg(target_os = "espidf")]
pub fn configure_output(pin: i32, high: bool) -> Result<(), HwInitError> {
    gpio_configure(pin, gpio_mode_t_GPIO_MODE_OUTPUT, false)?;
    gpio_write(pin, high);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn configure_output(_pin: i32, _high: bool) -> Result<(), HwInitError> {
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn configure_input(pin: i32, pull_up: bool) -> Result<(), HwInitError> {
    gpio_configure(pin, gpio_mode_t_GPIO_MODE_INPUT, pull_up)
}

#[cfg(not(target_os = "espidf"))]
pub fn configure_input(_pin: i32, _pull_up: bool) -> Result<(), HwInitError> {
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    true
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin.
    let ret = unsafe { gpio_set_level(pin, u32::from(high)) };
    if ret != ESP_OK as i32 {
        warn!("hw_init: gpio_set_level({}) failed (rc={})", pin, ret);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── GPIO ISR Service ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn flow_gpio_isr(_arg: *mut core::ffi::c_void) {
    crate::sensors::flow::flow_isr_handler();
}

/// Configure the flow sensor pin as a rising-edge interrupt feeding
/// [`FLOW_EDGES`](crate::sensors::flow::FLOW_EDGES).
#[cfg(target_os = "espidf")]
pub fn init_flow_isr(pin: i32) -> Result<(), HwInitError> {
    gpio_configure(pin, gpio_mode_t_GPIO_MODE_INPUT, true)?;
    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed.  The handler only bumps an atomic.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
            return Err(HwInitError::IsrInstallFailed(ret));
        }
        gpio_set_intr_type(pin, gpio_int_type_t_GPIO_INTR_POSEDGE);
        let ret = gpio_isr_handler_add(pin, Some(flow_gpio_isr), core::ptr::null_mut());
        if ret != ESP_OK {
            return Err(HwInitError::IsrInstallFailed(ret));
        }
        gpio_intr_enable(pin);
    }
    info!("hw_init: flow ISR on GPIO{}", pin);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_flow_isr(_pin: i32) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): flow ISR skipped");
    Ok(())
}
