// Calendurr: Sensor Reader
//
// The sheet has one electrode per corner and a single sense line.  Driving
// the right edge high and the left edge low puts a voltage gradient across X;
// driving the top edge high and the bottom edge low does the same for Y.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{OutputPin, PinState};

use crate::config::SETTLE_DELAY_MS;
use crate::events::RawSample;

/// One-shot sample of the shared sense line.
pub trait AnalogSense {
    fn sample(&mut self) -> u16;
}

/// The four corner electrodes.
pub struct Electrodes<P> {
    pub top_right: P,
    pub top_left: P,
    pub bottom_left: P,
    pub bottom_right: P,
}

/// Electrode levels, in `Electrodes` field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BiasPattern([bool; 4]);

const X_BIAS: BiasPattern = BiasPattern([true, false, false, true]);
const Y_BIAS: BiasPattern = BiasPattern([true, true, false, false]);

pub struct SensorReader<P, A, D> {
    electrodes: Electrodes<P>,
    sense: A,
    delay: D,
}

impl<P, A, D> SensorReader<P, A, D>
where
    P: OutputPin,
    A: AnalogSense,
    D: DelayNs,
{
    pub fn new(electrodes: Electrodes<P>, sense: A, delay: D) -> Self {
        Self { electrodes, sense, delay }
    }

    /// Bias, settle and sample each axis in turn.  Blocks for about 2 ms.
    ///
    /// Always returns a sample; without a contact it is just noise and the
    /// gate throws it away.
    pub fn acquire(&mut self) -> RawSample {
        let x_raw = self.sample_axis(X_BIAS);
        let y_raw = self.sample_axis(Y_BIAS);
        RawSample { x_raw, y_raw }
    }

    fn sample_axis(&mut self, pattern: BiasPattern) -> u16 {
        self.bias(pattern);
        self.delay.delay_ms(SETTLE_DELAY_MS);
        self.sense.sample()
    }

    fn bias(&mut self, BiasPattern(levels): BiasPattern) {
        let Electrodes { top_right, top_left, bottom_left, bottom_right } = &mut self.electrodes;
        for (pin, level) in [top_right, top_left, bottom_left, bottom_right].into_iter().zip(levels) {
            // A stuck pin only corrupts this sample.
            let _ = pin.set_state(PinState::from(level));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Shared view of the electrode levels plus everything that happened.
    #[derive(Default)]
    struct Bench {
        levels: [bool; 4],
        settled_ms: u32,
        log: Vec<String>,
    }

    struct MockPin {
        index: usize,
        bench: Rc<RefCell<Bench>>,
    }

    impl embedded_hal::digital::ErrorType for MockPin {
        type Error = Infallible;
    }

    impl OutputPin for MockPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.bench.borrow_mut().levels[self.index] = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.bench.borrow_mut().levels[self.index] = true;
            Ok(())
        }
    }

    /// Returns a reading that encodes which pattern was active, so the test
    /// can tell the axes apart.
    struct MockSense {
        bench: Rc<RefCell<Bench>>,
    }

    impl AnalogSense for MockSense {
        fn sample(&mut self) -> u16 {
            let mut bench = self.bench.borrow_mut();
            let levels = bench.levels;
            let settled = bench.settled_ms;
            bench.log.push(format!("sample {levels:?} after {settled}ms"));
            bench.settled_ms = 0;
            if BiasPattern(levels) == X_BIAS {
                9100
            } else if BiasPattern(levels) == Y_BIAS {
                9200
            } else {
                0
            }
        }
    }

    struct MockDelay {
        bench: Rc<RefCell<Bench>>,
    }

    impl DelayNs for MockDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.bench.borrow_mut().settled_ms += ns / 1_000_000;
        }
    }

    fn reader(bench: &Rc<RefCell<Bench>>) -> SensorReader<MockPin, MockSense, MockDelay> {
        let pin = |index| MockPin { index, bench: Rc::clone(bench) };
        SensorReader::new(
            Electrodes {
                top_right: pin(0),
                top_left: pin(1),
                bottom_left: pin(2),
                bottom_right: pin(3),
            },
            MockSense { bench: Rc::clone(bench) },
            MockDelay { bench: Rc::clone(bench) },
        )
    }

    #[test]
    fn samples_x_then_y_under_their_bias_patterns() {
        let bench = Rc::new(RefCell::new(Bench::default()));
        let sample = reader(&bench).acquire();

        assert_eq!(sample, RawSample::new(9100, 9200));
        assert_eq!(
            bench.borrow().log,
            vec![
                "sample [true, false, false, true] after 1ms".to_string(),
                "sample [true, true, false, false] after 1ms".to_string(),
            ]
        );
    }

    #[test]
    fn every_acquisition_rebiases_both_axes() {
        let bench = Rc::new(RefCell::new(Bench::default()));
        let mut reader = reader(&bench);

        reader.acquire();
        reader.acquire();

        assert_eq!(bench.borrow().log.len(), 4);
        assert!(bench.borrow().log.iter().all(|entry| entry.ends_with("after 1ms")));
    }
}
