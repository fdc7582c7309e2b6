// Calendurr: firmware core
//
// Everything here is hardware independent: the touch pipeline, calendar
// state, BLE message framing, button logic, persisted date and the status
// screen layout.  The binary binds these to ESP-IDF peripherals.

pub mod battery;
pub mod calendar;
pub mod config;
pub mod events;
pub mod input;
pub mod link;
pub mod screen;
pub mod storage;
pub mod touch;
pub mod transmitter;
