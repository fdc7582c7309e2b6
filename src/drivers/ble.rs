// Calendurr: BLE UART Peripheral
//
// Three services on the Bluedroid GATT server:
//   - Nordic UART: TX (notify) carries the calendar's messages, RX (write)
//     is only logged.
//   - Device Information: manufacturer and model strings.
//   - Battery: level in percent, read or notify.
// Bluedroid accepts one attribute request at a time, so each creation event
// issues the next request.  The peripheral advertises under a fixed name and
// starts advertising again whenever the central drops.
//
// Stack callbacks run on the Bluedroid task; they only touch `GattState`
// (behind a mutex) and the shared `LinkStatus`.

use std::sync::{Arc, Mutex, PoisonError};

use esp_idf_hal::modem::Modem;
use esp_idf_svc::bt::ble::gap::{AdvConfiguration, BleGapEvent, EspBleGap};
use esp_idf_svc::bt::ble::gatt::server::{ConnectionId, EspGatts, GattsEvent};
use esp_idf_svc::bt::ble::gatt::{
    AutoResponse, GattCharacteristic, GattDescriptor, GattId, GattInterface, GattServiceId, GattStatus, Handle,
    Permission, Property,
};
use esp_idf_svc::bt::{Ble, BtDriver, BtStatus, BtUuid};
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_sys::{self as sys, esp};

use calendurr::config::*;
use calendurr::link::{BleLink, LinkStatus, MAX_PAYLOAD};

type Driver = BtDriver<'static, Ble>;
type Gap = EspBleGap<'static, Ble, Arc<Driver>>;
type Gatts = EspGatts<'static, Ble, Arc<Driver>>;

/// Client Characteristic Configuration descriptor.
const CCCD_UUID: u16 = 0x2902;
const DEVICE_INFO_UUID: u16 = 0x180A;
const MANUFACTURER_UUID: u16 = 0x2A29;
const MODEL_UUID: u16 = 0x2A24;
const BATTERY_SERVICE_UUID: u16 = 0x180F;
const BATTERY_LEVEL_UUID: u16 = 0x2A19;

/// Service, two characteristics with their values, one CCCD.
const NUS_HANDLES: u16 = 8;
/// Service, two read-only characteristics with their values.
const DEVICE_INFO_HANDLES: u16 = 6;
/// Service, the level characteristic with its value, one CCCD.
const BATTERY_HANDLES: u16 = 5;

#[derive(Debug, Default)]
struct GattState {
    gatt_if: Option<GattInterface>,
    nus: Option<Handle>,
    tx: Option<Handle>,
    rx: Option<Handle>,
    cccd: Option<Handle>,
    battery_service: Option<Handle>,
    battery: Option<Handle>,
    battery_cccd: Option<Handle>,
    conn_id: Option<ConnectionId>,
}

#[derive(Clone)]
struct Server {
    gap: Arc<Gap>,
    gatts: Arc<Gatts>,
    state: Arc<Mutex<GattState>>,
    status: &'static LinkStatus,
}

pub struct Link {
    server: Server,
}

/// Bring up the controller, register the services and start advertising.
pub fn start(modem: Modem, nvs: EspDefaultNvsPartition, status: &'static LinkStatus) -> anyhow::Result<Link> {
    let driver = Arc::new(BtDriver::new(modem, Some(nvs))?);

    let server = Server {
        gap: Arc::new(EspBleGap::new(driver.clone())?),
        gatts: Arc::new(EspGatts::new(driver)?),
        state: Arc::new(Mutex::new(GattState::default())),
        status,
    };

    let gap_server = server.clone();
    server.gap.subscribe(move |event| gap_server.on_gap_event(event))?;

    let gatts_server = server.clone();
    server.gatts.subscribe(move |(gatt_if, event)| gatts_server.on_gatts_event(gatt_if, event))?;

    server.gatts.register_app(BLE_APP_ID)?;
    log::info!("BLE stack up, registering services");

    Ok(Link { server })
}

fn service_id(uuid: BtUuid) -> GattServiceId {
    GattServiceId { id: GattId { uuid, inst_id: 0 }, is_primary: true }
}

fn read_only(uuid: u16, max_len: usize) -> GattCharacteristic {
    GattCharacteristic {
        uuid: BtUuid::uuid16(uuid),
        permissions: Permission::Read.into(),
        properties: Property::Read.into(),
        max_len,
        auto_rsp: AutoResponse::ByGatt,
    }
}

fn cccd() -> GattDescriptor {
    GattDescriptor { uuid: BtUuid::uuid16(CCCD_UUID), permissions: Permission::Read | Permission::Write }
}

impl Server {
    fn state(&self) -> std::sync::MutexGuard<'_, GattState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn on_gap_event(&self, event: BleGapEvent) {
        match event {
            BleGapEvent::AdvertisingConfigured(status) => {
                if status != BtStatus::Success {
                    log::warn!("advertising config failed: {:?}", status);
                } else if let Err(e) = self.gap.start_advertising() {
                    log::warn!("start advertising failed: {:?}", e);
                }
            }
            BleGapEvent::AdvertisingStarted(status) => {
                log::info!("advertising as \"{}\" ({:?})", BLE_DEVICE_NAME, status);
            }
            _ => {}
        }
    }

    fn on_gatts_event(&self, gatt_if: GattInterface, event: GattsEvent) {
        if let Err(e) = self.handle_gatts_event(gatt_if, event) {
            log::warn!("GATT event handling failed: {:?}", e);
        }
    }

    fn handle_gatts_event(&self, gatt_if: GattInterface, event: GattsEvent) -> Result<(), sys::EspError> {
        match event {
            GattsEvent::ServiceRegistered { status, app_id } => {
                if status != GattStatus::Ok || app_id != BLE_APP_ID {
                    log::warn!("app {} registration failed: {:?}", app_id, status);
                    return Ok(());
                }
                self.state().gatt_if = Some(gatt_if);

                self.gap.set_device_name(BLE_DEVICE_NAME)?;
                self.gap.set_adv_conf(&AdvConfiguration {
                    include_name: true,
                    include_txpower: true,
                    flag: 2,
                    service_uuid: Some(BtUuid::uuid128(NUS_SERVICE_UUID)),
                    ..Default::default()
                })?;
                self.gatts.create_service(gatt_if, &service_id(BtUuid::uuid128(NUS_SERVICE_UUID)), NUS_HANDLES)?;
            }
            GattsEvent::ServiceCreated { status, service_handle, service_id: created, .. } => {
                if status != GattStatus::Ok {
                    log::warn!("service {:?} not created: {:?}", created.id.uuid, status);
                    return Ok(());
                }
                self.gatts.start_service(service_handle)?;

                let uuid = created.id.uuid;
                if uuid == BtUuid::uuid128(NUS_SERVICE_UUID) {
                    self.state().nus = Some(service_handle);
                    self.gatts.add_characteristic(
                        service_handle,
                        &GattCharacteristic {
                            uuid: BtUuid::uuid128(NUS_TX_UUID),
                            permissions: Permission::Read.into(),
                            properties: Property::Notify.into(),
                            max_len: MAX_PAYLOAD,
                            auto_rsp: AutoResponse::ByApp,
                        },
                        &[],
                    )?;
                } else if uuid == BtUuid::uuid16(DEVICE_INFO_UUID) {
                    self.gatts.add_characteristic(
                        service_handle,
                        &read_only(MANUFACTURER_UUID, BLE_MANUFACTURER.len()),
                        BLE_MANUFACTURER.as_bytes(),
                    )?;
                } else if uuid == BtUuid::uuid16(BATTERY_SERVICE_UUID) {
                    self.state().battery_service = Some(service_handle);
                    self.gatts.add_characteristic(
                        service_handle,
                        &GattCharacteristic {
                            uuid: BtUuid::uuid16(BATTERY_LEVEL_UUID),
                            permissions: Permission::Read.into(),
                            properties: Property::Read | Property::Notify,
                            max_len: 1,
                            auto_rsp: AutoResponse::ByGatt,
                        },
                        &[100],
                    )?;
                }
            }
            GattsEvent::CharacteristicAdded { status, attr_handle, service_handle, char_uuid } => {
                if status != GattStatus::Ok {
                    log::warn!("characteristic {:?} not added: {:?}", char_uuid, status);
                    return Ok(());
                }
                if char_uuid == BtUuid::uuid128(NUS_TX_UUID) {
                    self.state().tx = Some(attr_handle);
                    self.gatts.add_descriptor(service_handle, &cccd())?;
                } else if char_uuid == BtUuid::uuid128(NUS_RX_UUID) {
                    self.state().rx = Some(attr_handle);
                    self.gatts.create_service(
                        gatt_if,
                        &service_id(BtUuid::uuid16(DEVICE_INFO_UUID)),
                        DEVICE_INFO_HANDLES,
                    )?;
                } else if char_uuid == BtUuid::uuid16(MANUFACTURER_UUID) {
                    self.gatts.add_characteristic(
                        service_handle,
                        &read_only(MODEL_UUID, BLE_MODEL.len()),
                        BLE_MODEL.as_bytes(),
                    )?;
                } else if char_uuid == BtUuid::uuid16(MODEL_UUID) {
                    self.gatts.create_service(
                        gatt_if,
                        &service_id(BtUuid::uuid16(BATTERY_SERVICE_UUID)),
                        BATTERY_HANDLES,
                    )?;
                } else if char_uuid == BtUuid::uuid16(BATTERY_LEVEL_UUID) {
                    self.state().battery = Some(attr_handle);
                    self.gatts.add_descriptor(service_handle, &cccd())?;
                }
            }
            GattsEvent::DescriptorAdded { status, attr_handle, service_handle, descr_uuid, .. } => {
                if status != GattStatus::Ok || descr_uuid != BtUuid::uuid16(CCCD_UUID) {
                    log::warn!("descriptor {:?} not added: {:?}", descr_uuid, status);
                    return Ok(());
                }
                let mut state = self.state();
                if Some(service_handle) == state.nus {
                    state.cccd = Some(attr_handle);
                    drop(state);
                    self.gatts.add_characteristic(
                        service_handle,
                        &GattCharacteristic {
                            uuid: BtUuid::uuid128(NUS_RX_UUID),
                            permissions: Permission::Write.into(),
                            properties: Property::Write | Property::WriteNoResponse,
                            max_len: MAX_PAYLOAD,
                            auto_rsp: AutoResponse::ByApp,
                        },
                        &[],
                    )?;
                } else if Some(service_handle) == state.battery_service {
                    state.battery_cccd = Some(attr_handle);
                    log::info!("GATT services ready");
                }
            }
            GattsEvent::PeerConnected { conn_id, addr, .. } => {
                log::info!("central {:?} connected", addr);
                self.state().conn_id = Some(conn_id);
                self.status.on_connect();
            }
            GattsEvent::PeerDisconnected { addr, reason, .. } => {
                log::info!("central {:?} gone", addr);
                self.state().conn_id = None;
                self.status.on_disconnect(reason);
                self.gap.start_advertising()?;
            }
            GattsEvent::Write { conn_id, trans_id, handle, need_rsp, value, .. } => {
                let (rx, cccd, battery_cccd) = {
                    let state = self.state();
                    (state.rx, state.cccd, state.battery_cccd)
                };
                if Some(handle) == rx {
                    log::info!("central wrote: {}", String::from_utf8_lossy(value));
                }
                let answered = [rx, cccd, battery_cccd].contains(&Some(handle));
                if need_rsp && answered {
                    self.gatts.send_response(gatt_if, conn_id, trans_id, GattStatus::Ok, None)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn notify(&self, data: &[u8]) -> Result<(), sys::EspError> {
        let tx = self.state().tx;
        match tx {
            Some(tx) => self.indicate(tx, data),
            None => Ok(()),
        }
    }

    /// Notify `handle` to the connected central, if any.
    fn indicate(&self, handle: Handle, data: &[u8]) -> Result<(), sys::EspError> {
        let (gatt_if, conn_id) = {
            let state = self.state();
            match (state.gatt_if, state.conn_id) {
                (Some(gatt_if), Some(conn_id)) => (gatt_if, conn_id),
                _ => return Ok(()),
            }
        };
        esp!(unsafe {
            sys::esp_ble_gatts_send_indicate(
                gatt_if,
                conn_id,
                handle,
                data.len() as u16,
                data.as_ptr() as *mut u8,
                false,
            )
        })
    }

    /// Store the level in the attribute table for reads, then notify it.
    fn publish_battery(&self, percent: u8) -> Result<(), sys::EspError> {
        let Some(battery) = self.state().battery else {
            return Ok(());
        };
        let value = [percent];
        esp!(unsafe { sys::esp_ble_gatts_set_attr_value(battery, 1, value.as_ptr()) })?;
        self.indicate(battery, &value)
    }
}

impl BleLink for Link {
    fn write(&mut self, payload: &[u8]) {
        if let Err(e) = self.server.notify(payload) {
            log::warn!("notify failed: {:?}", e);
        }
    }

    fn is_connected(&self) -> bool {
        self.server.status.is_connected()
    }

    fn disconnect(&mut self) {
        let (gatt_if, conn_id) = {
            let state = self.server.state();
            (state.gatt_if, state.conn_id)
        };
        if let (Some(gatt_if), Some(conn_id)) = (gatt_if, conn_id) {
            if let Err(e) = esp!(unsafe { sys::esp_ble_gatts_close(gatt_if, conn_id) }) {
                log::warn!("disconnect failed: {:?}", e);
            }
        }
    }

    fn set_battery_level(&mut self, percent: u8) {
        if let Err(e) = self.server.publish_battery(percent) {
            log::warn!("battery level update failed: {:?}", e);
        }
    }
}
