// Calendurr: Calendar State
//
// Day and month are set with two rotary encoders.  Each encoder's interrupt
// channel fires `on_day_edge` / `on_month_edge` from ISR context, so the
// handlers only touch atomics: no locks, no allocation.  Each handler owns
// its counter; the main cycle reads both without synchronisation and redraws
// on the next pass if it caught them mid-update.

use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crate::config::ENCODER_DEBOUNCE_MS;

pub const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

/// Days in `month` (1-12).  February is always 28.
pub fn days_in_month(month: u8) -> u8 {
    match month {
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Step `value` by one within `1..=max`, wrapping at both ends.
fn wrap_step(value: u8, max: u8, forward: bool) -> u8 {
    let value = value.clamp(1, max);
    if forward {
        value % max + 1
    } else {
        (value + max - 2) % max + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date {
    pub month: u8,
    pub day: u8,
}

impl Date {
    pub const DEFAULT: Self = Self { month: 1, day: 1 };

    /// `None` unless month is 1-12 and day fits that month.
    pub fn new(month: u8, day: u8) -> Option<Self> {
        ((1..=12).contains(&month) && (1..=days_in_month(month)).contains(&day)).then_some(Self { month, day })
    }

    /// Parse the `"<month>,<day>"` form used on the wire and in the date file.
    pub fn parse(s: &str) -> Option<Self> {
        let (month, day) = s.trim().split_once(',')?;
        Self::new(month.trim().parse().ok()?, day.trim().parse().ok()?)
    }

    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[usize::from(self.month.clamp(1, 12)) - 1]
    }
}

impl Default for Date {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.month, self.day)
    }
}

/// Time of the last accepted edge of one encoder.
struct Debounce {
    last_ms: AtomicU32,
    armed: AtomicBool,
}

impl Debounce {
    const fn new() -> Self {
        Self { last_ms: AtomicU32::new(0), armed: AtomicBool::new(false) }
    }

    /// True if the edge at `now_ms` should be acted on.  The window runs
    /// from the last accepted edge; rejected edges do not extend it.
    fn accept(&self, now_ms: u32) -> bool {
        let armed = self.armed.load(Ordering::Relaxed);
        if armed && now_ms.wrapping_sub(self.last_ms.load(Ordering::Relaxed)) < ENCODER_DEBOUNCE_MS {
            return false;
        }
        self.last_ms.store(now_ms, Ordering::Relaxed);
        self.armed.store(true, Ordering::Relaxed);
        true
    }
}

pub struct CalendarState {
    day: AtomicU8,
    month: AtomicU8,
    day_edge: Debounce,
    month_edge: Debounce,
}

impl CalendarState {
    pub const fn new(date: Date) -> Self {
        Self {
            day: AtomicU8::new(date.day),
            month: AtomicU8::new(date.month),
            day_edge: Debounce::new(),
            month_edge: Debounce::new(),
        }
    }

    /// Overwrite both counters, e.g. with the date loaded at boot.
    pub fn restore(&self, date: Date) {
        self.month.store(date.month, Ordering::Relaxed);
        self.day.store(date.day, Ordering::Relaxed);
    }

    /// Day encoder edge.  `paired_high` is the level of the direction channel.
    pub fn on_day_edge(&self, now_ms: u32, paired_high: bool) {
        if !self.day_edge.accept(now_ms) {
            return;
        }
        let max = days_in_month(self.month.load(Ordering::Relaxed));
        let day = self.day.load(Ordering::Relaxed);
        self.day.store(wrap_step(day, max, paired_high), Ordering::Relaxed);
    }

    /// Month encoder edge.  Leaves the day alone; `date()` clamps it.
    pub fn on_month_edge(&self, now_ms: u32, paired_high: bool) {
        if !self.month_edge.accept(now_ms) {
            return;
        }
        let month = self.month.load(Ordering::Relaxed);
        self.month.store(wrap_step(month, 12, paired_high), Ordering::Relaxed);
    }

    /// Current date, with the day clamped into the current month.
    pub fn date(&self) -> Date {
        let month = self.month.load(Ordering::Relaxed).clamp(1, 12);
        let day = self.day.load(Ordering::Relaxed).clamp(1, days_in_month(month));
        Date { month, day }
    }
}

impl Default for CalendarState {
    fn default() -> Self {
        Self::new(Date::DEFAULT)
    }
}
