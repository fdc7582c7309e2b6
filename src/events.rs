// Calendurr: System Events & Data Types

// ---------------------------------------------------------------------------
// Sensor Data
// ---------------------------------------------------------------------------

/// One acquisition cycle: the sense line sampled under each bias pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawSample {
    pub x_raw: u16,
    pub y_raw: u16,
}

impl RawSample {
    pub const fn new(x_raw: u16, y_raw: u16) -> Self {
        Self { x_raw, y_raw }
    }
}

/// A point in calibrated sensor space.  `(0, 0)` never comes out of a real
/// contact and doubles as "no data".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const ZERO: Self = Self { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

// ---------------------------------------------------------------------------
// Button Events: returned by the input manager to the main cycle
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    /// Send button pressed (debounced).
    Send,
    /// BLE button held long enough to drop the connection.
    DisconnectHold,
}
