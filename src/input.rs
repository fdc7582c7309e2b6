// Calendurr: Button Input Manager
//
// Two active-LOW buttons, polled once per main cycle:
//   - send: fires once per press, presses closer than SEND_DEBOUNCE_MS apart
//     are ignored;
//   - BLE: while held, blocks the cycle until either the button is released
//     (nothing happens) or it has been down for DISCONNECT_HOLD_MS.

use std::thread;
use std::time::{Duration, Instant};

use embedded_hal::digital::InputPin;

use crate::config::*;
use crate::events::ButtonEvent;

/// Treat a pin read error as "not pressed".
fn is_pressed<P: InputPin>(pin: &mut P) -> bool {
    pin.is_low().unwrap_or(false)
}

/// Poll `pin` until it is released or has been held for `hold`.  Returns
/// `true` if the hold completed.
pub fn wait_for_hold<P: InputPin>(pin: &mut P, hold: Duration, poll: Duration) -> bool {
    let start = Instant::now();
    while is_pressed(pin) {
        if start.elapsed() >= hold {
            return true;
        }
        thread::sleep(poll);
    }
    false
}

pub struct InputManager<S, B> {
    send_pin: S,
    ble_pin: B,

    // Send button state
    send_down: bool,
    last_send_ms: Option<u32>,

    hold: Duration,
    poll: Duration,
}

impl<S: InputPin, B: InputPin> InputManager<S, B> {
    pub fn new(send_pin: S, ble_pin: B) -> Self {
        Self {
            send_pin,
            ble_pin,
            send_down: false,
            last_send_ms: None,
            hold: Duration::from_millis(DISCONNECT_HOLD_MS),
            poll: Duration::from_millis(BUTTON_POLL_MS),
        }
    }

    /// Call once per main cycle.
    pub fn update(&mut self, now_ms: u32) -> Option<ButtonEvent> {
        if self.poll_send(now_ms) {
            return Some(ButtonEvent::Send);
        }

        if is_pressed(&mut self.ble_pin) && wait_for_hold(&mut self.ble_pin, self.hold, self.poll) {
            log::info!("BLE button held for {:?}", self.hold);
            return Some(ButtonEvent::DisconnectHold);
        }

        None
    }

    fn poll_send(&mut self, now_ms: u32) -> bool {
        let pressed = is_pressed(&mut self.send_pin);
        let edge = pressed && !self.send_down;
        self.send_down = pressed;
        if !edge {
            return false;
        }

        if let Some(last) = self.last_send_ms {
            if now_ms.wrapping_sub(last) < SEND_DEBOUNCE_MS {
                return false;
            }
        }
        self.last_send_ms = Some(now_ms);
        true
    }
}
