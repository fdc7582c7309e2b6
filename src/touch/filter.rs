// Calendurr: Exponential Filter + Recency Averager
//
// Accepted positions go through a first-order IIR filter, then a moving
// average over the filtered value, the previous average and up to four older
// averages.  The average grows from 1 to 6 taps as the history fills after a
// reset and stays at 6 from then on.
//
// Everything is kept in `f32` and only rounded on the way out.

use crate::events::Position;

/// Older averages kept behind the current one.
pub const HISTORY_LEN: usize = 4;

/// Consecutive cycles at one position, the first one included, that drop
/// the state.
pub const STALE_RESET_CYCLES: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    Idle,
    Tracking,
    Stalling,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Smoothed {
    x: f32,
    y: f32,
}

impl Smoothed {
    fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    fn rounded(&self) -> Position {
        Position::new(self.x.round() as i32, self.y.round() as i32)
    }
}

impl From<Position> for Smoothed {
    fn from(p: Position) -> Self {
        Self { x: p.x as f32, y: p.y as f32 }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    filtered: Smoothed,
    average: Smoothed,
    /// Most recent first.
    history: [Smoothed; HISTORY_LEN],
    stale_count: u8,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one accepted position.  `previous` is the position the gate
    /// produced on the cycle before this one.
    pub fn update(&mut self, position: Position, previous: Position, coeff: f32) {
        if position == previous {
            self.stale_count += 1;
            if self.stale_count + 1 >= STALE_RESET_CYCLES {
                log::debug!("touch held still for {} cycles, dropping it", STALE_RESET_CYCLES);
                self.reset();
            }
            return;
        }

        self.stale_count = 0;

        self.filtered = if self.filtered.is_zero() {
            position.into()
        } else {
            Smoothed {
                x: coeff * position.x as f32 + (1.0 - coeff) * self.filtered.x,
                y: coeff * position.y as f32 + (1.0 - coeff) * self.filtered.y,
            }
        };

        let prior = self.average;
        let (mut sum_x, mut sum_y, mut taps) = (self.filtered.x, self.filtered.y, 1u8);
        for p in core::iter::once(&prior).chain(self.history.iter()).filter(|p| !p.is_zero()) {
            sum_x += p.x;
            sum_y += p.y;
            taps += 1;
        }
        self.average = Smoothed { x: sum_x / f32::from(taps), y: sum_y / f32::from(taps) };

        self.history.rotate_right(1);
        self.history[0] = prior;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn average(&self) -> Position {
        self.average.rounded()
    }

    pub fn filtered(&self) -> Position {
        self.filtered.rounded()
    }

    /// Older averages, most recent first, rounded.
    pub fn history(&self) -> [Position; HISTORY_LEN] {
        self.history.map(|p| p.rounded())
    }

    pub fn stale_count(&self) -> u8 {
        self.stale_count
    }

    /// The averaged position, or `None` when there is nothing to report.
    pub fn report(&self) -> Option<Position> {
        let average = self.average();
        (!average.is_zero()).then_some(average)
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }

    pub fn tracking_state(&self) -> TrackingState {
        if self.average().is_zero() {
            TrackingState::Idle
        } else if self.stale_count > 0 {
            TrackingState::Stalling
        } else {
            TrackingState::Tracking
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COEFF: f32 = 0.1;

    /// Feeds `positions` as consecutive cycles, starting from an idle state.
    fn run(positions: &[Position]) -> FilterState {
        let mut state = FilterState::new();
        let mut previous = Position::ZERO;
        for &p in positions {
            state.update(p, previous, COEFF);
            previous = p;
        }
        state
    }

    #[test]
    fn first_motion_takes_the_position_as_is() {
        let state = run(&[Position::new(80, 80)]);
        assert_eq!(state.filtered(), Position::new(80, 80));
        assert_eq!(state.average(), Position::new(80, 80));
        assert_eq!(state.tracking_state(), TrackingState::Tracking);
        assert_eq!(state.history(), [Position::ZERO; HISTORY_LEN]);
    }

    #[test]
    fn repeated_input_leaves_average_untouched() {
        let p = Position::new(80, 80);
        let state = run(&[p, p, p]);
        assert_eq!(state.average(), p);
        assert_eq!(state.stale_count(), 2);
        assert_eq!(state.tracking_state(), TrackingState::Stalling);
    }

    #[test]
    fn same_position_five_times_resets_four_does_not() {
        let p = Position::new(120, 60);

        let state = run(&[p; 4]);
        assert_eq!(state.stale_count(), 3);
        assert_eq!(state.average(), p);
        assert!(!state.is_idle());

        let state = run(&[p; 5]);
        assert!(state.is_idle());
        assert_eq!(state.tracking_state(), TrackingState::Idle);
        assert_eq!(state.report(), None);
    }

    #[test]
    fn stillness_after_motion_counts_from_the_new_position() {
        let p = Position::new(100, 100);
        let q = Position::new(101, 100);

        let state = run(&[p, p, p, q, q, q, q]);
        assert_eq!(state.stale_count(), 3);
        assert!(!state.is_idle());

        let state = run(&[p, p, p, q, q, q, q, q]);
        assert!(state.is_idle());
    }

    #[test]
    fn motion_clears_the_stale_count() {
        let p = Position::new(100, 100);
        let q = Position::new(101, 100);
        let state = run(&[p, p, p, p, q]);
        assert_eq!(state.stale_count(), 0);
        assert_eq!(state.tracking_state(), TrackingState::Tracking);
    }

    #[test]
    fn exponential_filter_uses_coefficient() {
        let state = run(&[Position::new(100, 100), Position::new(200, 150)]);
        // 0.1 * 200 + 0.9 * 100, 0.1 * 150 + 0.9 * 100
        assert_eq!(state.filtered(), Position::new(110, 105));
    }

    #[test]
    fn tap_count_grows_to_six() {
        // x walks by 100, y stays at 100; filtered.x: 100, 110, 129, 156.1, 190.49, 231.441
        let xs = [100, 200, 300, 400, 500, 600, 700];
        let positions: Vec<_> = xs.iter().map(|&x| Position::new(x, 100)).collect();

        let mut state = FilterState::new();
        let mut previous = Position::ZERO;
        let mut averages = Vec::new();
        for &p in &positions {
            state.update(p, previous, COEFF);
            previous = p;
            averages.push(state.average().x);
        }

        // cycle 1: 1 tap  -> 100
        // cycle 2: 2 taps -> (110 + 100) / 2 = 105
        // cycle 3: 3 taps -> (129 + 105 + 100) / 3 = 111.333
        // cycle 4: 4 taps -> (156.1 + 111.333 + 105 + 100) / 4 = 118.108
        // cycle 5: 5 taps -> (190.49 + 118.108 + 111.333 + 105 + 100) / 5 = 124.986
        // cycle 6: 6 taps -> (231.441 + 124.986 + 118.108 + 111.333 + 105 + 100) / 6 = 131.811
        // cycle 7: 6 taps, oldest (100) dropped:
        //          (278.297 + 131.811 + 124.986 + 118.108 + 111.333 + 105) / 6 = 144.923
        assert_eq!(averages, vec![100, 105, 111, 118, 125, 132, 145]);
        assert_eq!(state.average().y, 100);
        assert_eq!(
            state.history(),
            [
                Position::new(132, 100),
                Position::new(125, 100),
                Position::new(118, 100),
                Position::new(111, 100),
            ]
        );
    }

    #[test]
    fn constant_input_converges_without_overshoot() {
        let target = Position::new(200, 150);
        let mut state = FilterState::new();
        let mut previous = Position::ZERO;

        // Start far from the target, then jitter by one unit around it.
        state.update(Position::new(100, 100), previous, COEFF);
        previous = Position::new(100, 100);

        let mut last = state.average();
        for i in 0..200 {
            let p = if i % 2 == 0 { target } else { Position::new(target.x + 1, target.y) };
            state.update(p, previous, COEFF);
            previous = p;

            let avg = state.average();
            assert!(avg.x + 1 >= last.x && avg.y + 1 >= last.y, "moved backwards: {last:?} -> {avg:?}");
            assert!(avg.x <= target.x + 1 && avg.y <= target.y + 1, "overshot: {avg:?}");
            last = avg;
        }
        assert!((last.x - target.x).abs() <= 1);
        assert!((last.y - target.y).abs() <= 1);
        assert!((last.x - state.filtered().x).abs() <= 1, "{last:?} vs {:?}", state.filtered());
    }

    #[test]
    fn average_catches_up_with_the_filter() {
        // Jitter keeps every cycle a motion cycle; the average must settle
        // on the filtered value instead of stalling below it.
        let mut state = FilterState::new();
        let mut previous = Position::ZERO;
        for i in 0..2000 {
            let p = if i % 2 == 0 { Position::new(200, 150) } else { Position::new(201, 150) };
            state.update(p, previous, COEFF);
            previous = p;
        }
        let (avg, filtered) = (state.average(), state.filtered());
        assert!((avg.x - filtered.x).abs() <= 1, "{avg:?} vs {filtered:?}");
        assert_eq!(avg.y, 150);
        assert_eq!(filtered.y, 150);
    }
}
