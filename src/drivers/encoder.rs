// Calendurr: Rotary Encoder Interrupts
//
// Rising edges on channel A run the calendar handler in ISR context; the
// handler samples channel B with a raw register read to get the direction.
// esp-idf-hal disables a pin's interrupt after it fires, so the main cycle
// calls `rearm` every pass.

use esp_idf_hal::gpio::{AnyInputPin, Input, InterruptType, PinDriver};
use esp_idf_sys::{self as sys, EspError};

use calendurr::calendar::CalendarState;

use super::pull_up;

pub type EdgeHandler = fn(&CalendarState, u32, bool);

pub struct Encoder {
    channel_a: PinDriver<'static, AnyInputPin, Input>,
    _channel_b: PinDriver<'static, AnyInputPin, Input>,
}

impl Encoder {
    pub fn attach(
        a: AnyInputPin,
        b: AnyInputPin,
        (a_gpio, b_gpio): (i32, i32),
        calendar: &'static CalendarState,
        on_edge: EdgeHandler,
    ) -> anyhow::Result<Self> {
        let mut channel_a = PinDriver::input(a)?;
        let channel_b = PinDriver::input(b)?;
        pull_up(a_gpio)?;
        pull_up(b_gpio)?;

        channel_a.set_interrupt_type(InterruptType::PosEdge)?;

        let callback = move || {
            let paired_high = unsafe { sys::gpio_get_level(b_gpio) } == 1;
            on_edge(calendar, crate::firmware::now_ms(), paired_high);
        };
        // SAFETY: the callback only reads a GPIO level and the system timer
        // and stores into atomics; it never blocks or allocates.
        unsafe {
            channel_a.subscribe(callback)?;
        }
        channel_a.enable_interrupt()?;

        Ok(Self { channel_a, _channel_b: channel_b })
    }

    pub fn rearm(&mut self) -> Result<(), EspError> {
        self.channel_a.enable_interrupt()
    }
}
