// Calendurr: Touch Pipeline
//
// reader -> gate -> filter.  The pipeline owns the filter state and the
// previous cycle's position; the reader is kept separate so the pipeline can
// be driven from recorded samples.

pub mod filter;
pub mod gate;
pub mod reader;

use crate::config::Calibration;
use crate::events::{Position, RawSample};

use self::filter::FilterState;
use self::gate::{gate, Rejection};

pub struct TouchPipeline {
    calibration: Calibration,
    state: FilterState,
    last_position: Position,
}

impl TouchPipeline {
    pub fn new(calibration: Calibration) -> Self {
        Self {
            calibration,
            state: FilterState::new(),
            last_position: Position::ZERO,
        }
    }

    /// Run one sample through the pipeline.  Returns the averaged position,
    /// or `None` while there is nothing worth reporting.
    pub fn process(&mut self, sample: RawSample) -> Option<Position> {
        match gate(sample, self.last_position, &self.calibration) {
            Ok(position) => {
                self.state.update(position, self.last_position, self.calibration.smoothing);
                self.last_position = position;
            }
            Err(Rejection::NoContact) => {
                if !self.state.is_idle() {
                    log::trace!("contact lost");
                }
                self.state.reset();
                self.last_position = Position::ZERO;
            }
            Err(Rejection::Glitch(position)) => {
                log::debug!("glitch {:?} -> {:?}, resetting filter", self.last_position, position);
                self.state.reset();
                self.last_position = position;
            }
        }
        self.state.report()
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }
}
