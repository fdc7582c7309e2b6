// Calendurr: Validity Gate
//
// Marginal contact on a resistive sheet produces large one-cycle jumps.  A
// coarse presence check plus a tight per-cycle delta bound is enough at the
// rate the main cycle samples.

use crate::config::Calibration;
use crate::events::{Position, RawSample};

/// Why a cycle produced no usable position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// At least one axis is under the contact threshold: nothing is touching.
    NoContact,
    /// The reading jumped at least `noise_threshold` from the previous one.
    Glitch(Position),
}

impl Calibration {
    /// Affine map from raw ADC counts to sensor space.
    pub fn map(&self, sample: RawSample) -> Position {
        Position {
            x: (i32::from(sample.x_raw) - i32::from(self.x_min)) / i32::from(self.x_divisor.max(1)),
            y: (i32::from(sample.y_raw) - i32::from(self.y_min)) / i32::from(self.y_divisor.max(1)),
        }
    }

    pub fn in_contact(&self, sample: RawSample) -> bool {
        sample.x_raw >= self.contact_threshold && sample.y_raw >= self.contact_threshold
    }
}

pub fn gate(sample: RawSample, previous: Position, calibration: &Calibration) -> Result<Position, Rejection> {
    let position = calibration.map(sample);

    if !calibration.in_contact(sample) {
        return Err(Rejection::NoContact);
    }

    let dx = previous.x - position.x;
    let dy = previous.y - position.y;
    if dx.abs() >= calibration.noise_threshold || dy.abs() >= calibration.noise_threshold {
        return Err(Rejection::Glitch(position));
    }

    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cal() -> Calibration {
        Calibration::default()
    }

    #[test]
    fn maps_with_offset_and_divisor() {
        // (9000 - 7000) / 25 = 80
        assert_eq!(cal().map(RawSample::new(9000, 9000)), Position::new(80, 80));
        assert_eq!(cal().map(RawSample::new(16383, 8000)), Position::new(375, 40));
    }

    #[test]
    fn either_axis_below_threshold_is_no_contact() {
        let prev = Position::new(80, 80);
        for sample in [
            RawSample::new(7999, 9000),
            RawSample::new(9000, 7999),
            RawSample::new(0, 0),
            RawSample::new(u16::MAX, 100),
        ] {
            assert_eq!(gate(sample, prev, &cal()), Err(Rejection::NoContact), "{sample:?}");
        }
    }

    #[test]
    fn threshold_itself_counts_as_contact() {
        assert_eq!(gate(RawSample::new(8000, 8000), Position::new(40, 40), &cal()), Ok(Position::new(40, 40)));
    }

    #[test]
    fn jump_of_noise_threshold_or_more_is_a_glitch() {
        // 9000 -> 80, 15500 -> 340
        let far = RawSample::new(15500, 9000);
        assert_eq!(gate(far, Position::new(90, 80), &cal()), Err(Rejection::Glitch(Position::new(340, 80))));

        // exactly 250 on y
        let sample = RawSample::new(9000, 9000);
        assert_eq!(
            gate(sample, Position::new(80, 330), &cal()),
            Err(Rejection::Glitch(Position::new(80, 80)))
        );
    }

    #[test]
    fn jump_just_under_threshold_passes() {
        let sample = RawSample::new(9000, 9000);
        assert_eq!(gate(sample, Position::new(329, 329), &cal()), Ok(Position::new(80, 80)));
    }

    #[test]
    fn contact_is_checked_before_delta() {
        assert_eq!(
            gate(RawSample::new(100, 100), Position::new(300, 300), &cal()),
            Err(Rejection::NoContact)
        );
    }

    #[test]
    fn calibration_is_adjustable() {
        let tuned = Calibration { contact_threshold: 2000, x_min: 1490, y_min: 1400, x_divisor: 2, y_divisor: 2, ..cal() };
        assert_eq!(gate(RawSample::new(2150, 2115), Position::new(320, 350), &tuned), Ok(Position::new(330, 357)));
    }
}
