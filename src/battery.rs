// Calendurr: Battery Gauge
//
// The cell sits behind a 1:2 divider on an ADC1 pin.  Voltage is shown on
// the status screen; the percentage is what the BLE Battery Service reports.

use crate::config::*;

/// Cell voltage for a 12-bit ADC reading taken behind the divider.
pub fn volts_from_raw(raw: u16) -> f32 {
    f32::from(raw) / ADC_FULL_SCALE * ADC_REFERENCE_V * BATTERY_DIVIDER
}

/// Linear LiPo level: BATTERY_EMPTY_V is 0 %, BATTERY_FULL_V is 100 %.
pub fn level_percent(volts: f32) -> u8 {
    let level = (volts - BATTERY_EMPTY_V) / (BATTERY_FULL_V - BATTERY_EMPTY_V) * 100.0;
    level.clamp(0.0, 100.0).round() as u8
}
