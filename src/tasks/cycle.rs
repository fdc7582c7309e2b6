// Calendurr: Main Cycle
//
// Everything outside the encoder ISRs and the Bluetooth task runs here, in
// one loop:
//   1. buttons (send batch / hold-to-disconnect)
//   2. link transitions (open a batch on connect)
//   3. sensor acquisition, filtering and coordinate transmission
//   4. encoder interrupt re-arm
//   5. battery reading every BATTERY_CHECK_INTERVAL_MS, also published to
//      the BLE Battery Service
//   6. status screen, redrawn only when something on it changed

use std::thread;
use std::time::Duration;

use esp_idf_hal::delay::Ets;
use esp_idf_hal::gpio::{AnyInputPin, AnyOutputPin, Input, Output, PinDriver};

use calendurr::battery;
use calendurr::calendar::CalendarState;
use calendurr::config::*;
use calendurr::events::ButtonEvent;
use calendurr::input::InputManager;
use calendurr::link::{BleLink, LinkStatus};
use calendurr::screen::Status;
use calendurr::storage::DateFile;
use calendurr::touch::reader::SensorReader;
use calendurr::touch::TouchPipeline;
use calendurr::transmitter::Transmitter;

use crate::drivers::adc::{OneshotAdc, SenseLine};
use crate::drivers::ble::Link;
use crate::drivers::display::OledDisplay;
use crate::drivers::encoder::Encoder;
use crate::firmware::now_ms;

pub type Reader = SensorReader<PinDriver<'static, AnyOutputPin, Output>, SenseLine, Ets>;
pub type Buttons = InputManager<PinDriver<'static, AnyInputPin, Input>, PinDriver<'static, AnyInputPin, Input>>;

/// Peripherals owned by the cycle.
pub struct Devices {
    pub reader: Reader,
    pub buttons: Buttons,
    pub transmitter: Transmitter<Link>,
    pub display: OledDisplay,
    pub encoders: [Encoder; 2],
    pub adc: &'static OneshotAdc,
    pub date_file: DateFile,
}

pub fn main_cycle(mut dev: Devices, calendar: &'static CalendarState, link: &'static LinkStatus) -> ! {
    log::info!("Main cycle started");

    let mut pipeline = TouchPipeline::new(Calibration::default());
    let mut was_connected = false;
    let mut battery = dev.adc.battery_volts();
    publish_battery(&mut dev.transmitter, battery);
    let mut last_battery_ms = now_ms();
    let mut shown: Option<Status> = None;
    let yield_for = Duration::from_millis(CYCLE_YIELD_MS);

    loop {
        // ---- Buttons -------------------------------------------------------
        match dev.buttons.update(now_ms()) {
            Some(ButtonEvent::Send) => {
                let date = calendar.date();
                if dev.transmitter.send_and_save(date, &dev.date_file) {
                    log::info!("Date {} sent", date);
                } else {
                    log::info!("Send pressed with no central connected");
                }
            }
            Some(ButtonEvent::DisconnectHold) => {
                if let Err(e) = dev.display.show_message("Disconnecting...") {
                    log::warn!("{:?}", e);
                }
                shown = None;
                dev.transmitter.link_mut().disconnect();
            }
            None => {}
        }

        // ---- Link ----------------------------------------------------------
        let connected = dev.transmitter.link().is_connected();
        if connected && !was_connected {
            log::info!("Central connected ({} earlier disconnects)", link.disconnect_count());
            dev.transmitter.open_batch();
        }
        was_connected = connected;

        // ---- Touch ---------------------------------------------------------
        let sample = dev.reader.acquire();
        if pipeline.process(sample).is_none() {
            log::trace!("No usable touch in {:?}", sample);
        }
        dev.transmitter.maybe_send(pipeline.state(), now_ms());

        // ---- Encoders ------------------------------------------------------
        for encoder in dev.encoders.iter_mut() {
            if let Err(e) = encoder.rearm() {
                log::warn!("Encoder re-arm failed: {:?}", e);
            }
        }

        // ---- Battery -------------------------------------------------------
        let now = now_ms();
        if now.wrapping_sub(last_battery_ms) >= BATTERY_CHECK_INTERVAL_MS {
            battery = dev.adc.battery_volts();
            publish_battery(&mut dev.transmitter, battery);
            last_battery_ms = now;
        }

        // ---- Screen --------------------------------------------------------
        let status = Status { date: calendar.date(), connected, battery_volts: battery };
        if shown != Some(status) {
            match dev.display.show_status(&status) {
                Ok(()) => shown = Some(status),
                Err(e) => log::warn!("Status redraw failed: {:?}", e),
            }
        }

        thread::sleep(yield_for);
    }
}

fn publish_battery(transmitter: &mut Transmitter<Link>, volts: Option<f32>) {
    if let Some(volts) = volts {
        transmitter.link_mut().set_battery_level(battery::level_percent(volts));
    }
}
