// Calendurr: Boot Sequence
//
// Boot order:
//   1. OLED on I2C0, "Initializing..." banner (halt if the panel is absent).
//   2. Mount SPIFFS and restore the last sent date (1,1 if there is none).
//   3. Buttons, encoders with their edge interrupts, ADC, electrodes.
//   4. BLE UART service (show "BLE failure" and halt if it will not start).
//   5. Hand everything to the main cycle.

use std::thread;
use std::time::Duration;

use esp_idf_hal::delay::Ets;
use esp_idf_hal::gpio::{InputPin, OutputPin, PinDriver};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::prelude::*;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use calendurr::calendar::{CalendarState, Date};
use calendurr::config::*;
use calendurr::input::InputManager;
use calendurr::link::LinkStatus;
use calendurr::storage::DateFile;
use calendurr::touch::reader::{Electrodes, SensorReader};
use calendurr::transmitter::Transmitter;

use crate::drivers::adc::{OneshotAdc, SenseLine};
use crate::drivers::display::OledDisplay;
use crate::drivers::encoder::Encoder;
use crate::drivers::{ble, pull_up, spiffs};
use crate::tasks::cycle::{self, Devices};

/// Written by the encoder ISRs, read by the main cycle.
static CALENDAR: CalendarState = CalendarState::new(Date::DEFAULT);
/// Written by the Bluetooth task, read by the main cycle.
static LINK: LinkStatus = LinkStatus::new();

// ---------------------------------------------------------------------------
// Utility: milliseconds since boot (wraps after ~49 days; all users compare
// with wrapping arithmetic)
// ---------------------------------------------------------------------------
pub fn now_ms() -> u32 {
    unsafe { (esp_idf_sys::esp_timer_get_time() / 1000) as u32 }
}

/// Park the main task forever.  Used after a fatal boot failure so the
/// serial log stays readable.
pub fn halt() -> ! {
    log::error!("Halted");
    loop {
        thread::sleep(Duration::from_secs(60));
    }
}

pub fn run() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    log::info!("Calendurr firmware starting");

    // ---- Peripherals ------------------------------------------------------
    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;
    let nvs = EspDefaultNvsPartition::take()?;

    // ---- Display ----------------------------------------------------------
    let i2c_config = I2cConfig::new().baudrate(I2C_BAUDRATE_KHZ.kHz().into());
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        pins.gpio8, // PIN_I2C_SDA
        pins.gpio9, // PIN_I2C_SCL
        &i2c_config,
    )?;
    let mut display = OledDisplay::new(i2c);
    if let Err(e) = display.init().and_then(|()| display.show_message("Initializing...")) {
        log::error!("OLED init failed: {:?}", e);
        halt();
    }

    // ---- Stored date ------------------------------------------------------
    let date_file = DateFile::new(DATE_FILE);
    match spiffs::mount() {
        Ok(()) => CALENDAR.restore(date_file.load_or_default()),
        Err(e) => log::warn!("SPIFFS mount failed, date will not persist: {:?}", e),
    }
    log::info!("Starting at {}", CALENDAR.date());

    // ---- Buttons ----------------------------------------------------------
    let send_button = PinDriver::input(pins.gpio4.downgrade_input())?; // PIN_SEND_BUTTON
    pull_up(PIN_SEND_BUTTON)?;
    let ble_button = PinDriver::input(pins.gpio5.downgrade_input())?; // PIN_BLE_BUTTON
    pull_up(PIN_BLE_BUTTON)?;
    let buttons = InputManager::new(send_button, ble_button);

    // ---- Encoders ---------------------------------------------------------
    let day = Encoder::attach(
        pins.gpio6.downgrade_input(),
        pins.gpio7.downgrade_input(),
        (PIN_DAY_A, PIN_DAY_B),
        &CALENDAR,
        CalendarState::on_day_edge,
    )?;
    let month = Encoder::attach(
        pins.gpio15.downgrade_input(),
        pins.gpio16.downgrade_input(),
        (PIN_MONTH_A, PIN_MONTH_B),
        &CALENDAR,
        CalendarState::on_month_edge,
    )?;

    // ---- ADC --------------------------------------------------------------
    let adc: &'static OneshotAdc = Box::leak(Box::new(OneshotAdc::new()?));
    adc.configure(ADC_CHANNEL_SENSE)?; // PIN_SENSE
    adc.configure(ADC_CHANNEL_BATTERY)?; // PIN_BATTERY_ADC

    // ---- Touch sensor -----------------------------------------------------
    let electrodes = Electrodes {
        top_right: PinDriver::output(pins.gpio11.downgrade_output())?, // PIN_TOP_R
        top_left: PinDriver::output(pins.gpio12.downgrade_output())?, // PIN_TOP_L
        bottom_left: PinDriver::output(pins.gpio13.downgrade_output())?, // PIN_BOTTOM_L
        bottom_right: PinDriver::output(pins.gpio14.downgrade_output())?, // PIN_BOTTOM_R
    };
    let reader = SensorReader::new(electrodes, SenseLine::new(adc, ADC_CHANNEL_SENSE), Ets);

    // ---- BLE --------------------------------------------------------------
    let link = match ble::start(peripherals.modem, nvs, &LINK) {
        Ok(link) => link,
        Err(e) => {
            log::error!("BLE init failed: {:?}", e);
            if let Err(e) = display.show_message("BLE failure") {
                log::error!("{:?}", e);
            }
            halt();
        }
    };
    let transmitter = Transmitter::new(link, TransmitConfig::default());

    log::info!("Boot complete");
    cycle::main_cycle(
        Devices { reader, buttons, transmitter, display, encoders: [day, month], adc, date_file },
        &CALENDAR,
        &LINK,
    )
}
