// Calendurr: One-shot ADC
//
// One ADC1 unit shared by the sensor's sense line and the battery divider.
// Set up through the raw ESP-IDF oneshot API.

use esp_idf_sys::{self as sys, esp};

use calendurr::battery;
use calendurr::config::*;
use calendurr::touch::reader::AnalogSense;

pub struct OneshotAdc {
    handle: sys::adc_oneshot_unit_handle_t,
}

impl OneshotAdc {
    pub fn new() -> anyhow::Result<Self> {
        let mut handle: sys::adc_oneshot_unit_handle_t = core::ptr::null_mut();
        unsafe {
            let unit_cfg = sys::adc_oneshot_unit_init_cfg_t {
                unit_id: sys::adc_unit_t_ADC_UNIT_1,
                ulp_mode: sys::adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
                ..core::mem::zeroed()
            };
            esp!(sys::adc_oneshot_new_unit(&unit_cfg, &mut handle))?;
        }
        Ok(Self { handle })
    }

    /// Full 0-3.3 V range, 12-bit.
    pub fn configure(&self, channel: sys::adc_channel_t) -> anyhow::Result<()> {
        let chan_cfg = sys::adc_oneshot_chan_cfg_t {
            atten: sys::adc_atten_t_ADC_ATTEN_DB_11,
            bitwidth: sys::adc_bitwidth_t_ADC_BITWIDTH_12,
        };
        esp!(unsafe { sys::adc_oneshot_config_channel(self.handle, channel, &chan_cfg) })?;
        Ok(())
    }

    pub fn read(&self, channel: sys::adc_channel_t) -> Option<u16> {
        let mut raw: i32 = 0;
        let ret = unsafe { sys::adc_oneshot_read(self.handle, channel, &mut raw) };
        if ret == sys::ESP_OK {
            Some(raw.clamp(0, i32::from(u16::MAX)) as u16)
        } else {
            log::warn!("ADC read on channel {} failed ({})", channel, ret);
            None
        }
    }

    /// Battery voltage behind the 1:2 divider.
    pub fn battery_volts(&self) -> Option<f32> {
        self.read(ADC_CHANNEL_BATTERY).map(battery::volts_from_raw)
    }
}

/// The sensor sheet's sense line.  Calibration is expressed on a 14-bit
/// scale, so 12-bit readings are shifted up.
pub struct SenseLine {
    adc: &'static OneshotAdc,
    channel: sys::adc_channel_t,
}

impl SenseLine {
    pub fn new(adc: &'static OneshotAdc, channel: sys::adc_channel_t) -> Self {
        Self { adc, channel }
    }
}

impl AnalogSense for SenseLine {
    fn sample(&mut self) -> u16 {
        // A failed read looks like "no contact" downstream.
        self.adc
            .read(self.channel)
            .map(|raw| raw << (ADC_CALIBRATION_BITS - ADC_NATIVE_BITS))
            .unwrap_or(0)
    }
}
