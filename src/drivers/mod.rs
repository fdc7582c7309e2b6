pub mod adc;
#[cfg(feature = "experimental")]
pub mod ble;
#[cfg(not(feature = "experimental"))]
#[path = "ble_log.rs"]
pub mod ble;
pub mod display;
pub mod encoder;
pub mod spiffs;

use esp_idf_sys::{self as sys, esp, EspError};

/// Enable the internal pull-up on a pin already owned by a `PinDriver`.
pub fn pull_up(gpio: i32) -> Result<(), EspError> {
    esp!(unsafe { sys::gpio_set_pull_mode(gpio, sys::gpio_pull_mode_t_GPIO_PULLUP_ONLY) })
}
