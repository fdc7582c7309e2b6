// Calendurr: BLE Stand-in
//
// Used when the firmware is built without the `experimental` feature (the
// esp-idf-svc Bluetooth API lives behind it).  Payloads go to the log and
// the link never reports a central, so nothing is transmitted.

use esp_idf_hal::modem::Modem;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use calendurr::link::{BleLink, LinkStatus};

pub struct Link {
    _modem: Modem,
    status: &'static LinkStatus,
}

pub fn start(modem: Modem, _nvs: EspDefaultNvsPartition, status: &'static LinkStatus) -> anyhow::Result<Link> {
    log::warn!("built without Bluetooth support, payloads will only be logged");
    Ok(Link { _modem: modem, status })
}

impl BleLink for Link {
    fn write(&mut self, payload: &[u8]) {
        log::info!("ble <- {}", String::from_utf8_lossy(payload));
    }

    fn is_connected(&self) -> bool {
        self.status.is_connected()
    }

    fn disconnect(&mut self) {
        log::info!("no central to disconnect");
    }

    fn set_battery_level(&mut self, percent: u8) {
        log::debug!("battery level {}%", percent);
    }
}
