// Calendurr: BLE Link Interface & Wire Messages
//
// Payloads are short UTF-8 strings, one per BLE write, at most 20 bytes (the
// default ATT MTU minus the header).  The companion app parses them by
// prefix:
//
//   C:<x>,<y>                coordinate report
//   DATE-<n>:<month>,<day>   date report (untagged: <month>,<day>)
//   START|STOP|END[-<n>]     batch framing markers
//
// `<n>` is a process-wide counter that lets the peer spot duplicates and
// gaps; nothing is ever retransmitted.

use core::fmt::{self, Write};
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use heapless::String;

use crate::calendar::Date;
use crate::events::Position;

pub const MAX_PAYLOAD: usize = 20;

pub type Payload = String<MAX_PAYLOAD>;

/// The radio, as seen by the transmitter.
pub trait BleLink {
    /// Best-effort write of one payload.  No delivery confirmation.
    fn write(&mut self, payload: &[u8]);
    fn is_connected(&self) -> bool;
    /// Drop the current connection, if any.
    fn disconnect(&mut self);
    /// Publish the battery level (0-100 %) to the Battery Service.
    fn set_battery_level(&mut self, _percent: u8) {}
}

/// Connection state written from the BLE stack's callbacks and read by the
/// main cycle.
#[derive(Debug, Default)]
pub struct LinkStatus {
    connected: AtomicBool,
    disconnects: AtomicU32,
}

impl LinkStatus {
    pub const fn new() -> Self {
        Self { connected: AtomicBool::new(false), disconnects: AtomicU32::new(0) }
    }

    pub fn on_connect(&self) {
        self.connected.store(true, Ordering::Release);
        log::info!("BLE central connected");
    }

    pub fn on_disconnect(&self, reason: impl fmt::Debug) {
        self.connected.store(false, Ordering::Release);
        self.disconnects.fetch_add(1, Ordering::Relaxed);
        log::info!("BLE central disconnected, reason = {:?}", reason);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn disconnect_count(&self) -> u32 {
        self.disconnects.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Start,
    Stop,
    End,
}

impl Marker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Stop => "STOP",
            Self::End => "END",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundMessage {
    Coordinate(Position),
    Date { date: Date, tag: Option<u16> },
    Marker { marker: Marker, tag: Option<u16> },
}

/// The message does not fit in one BLE write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameError;

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "payload longer than {} bytes", MAX_PAYLOAD)
    }
}

impl std::error::Error for FrameError {}

impl OutboundMessage {
    pub fn encode(&self) -> Result<Payload, FrameError> {
        let mut out = Payload::new();
        self.write_to(&mut out).map_err(|_| FrameError)?;
        Ok(out)
    }

    fn write_to(&self, out: &mut Payload) -> fmt::Result {
        match *self {
            Self::Coordinate(p) => write!(out, "C:{},{}", p.x, p.y),
            Self::Date { date, tag: Some(n) } => write!(out, "DATE-{}:{}", n, date),
            Self::Date { date, tag: None } => write!(out, "{}", date),
            Self::Marker { marker, tag: Some(n) } => write!(out, "{}-{}", marker.as_str(), n),
            Self::Marker { marker, tag: None } => out.push_str(marker.as_str()).map_err(|_| fmt::Error),
        }
    }
}

impl fmt::Display for OutboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.encode() {
            Ok(payload) => f.write_str(&payload),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}
