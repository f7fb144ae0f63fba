//! Two-phase clock.
//!
//! The clock cycles through four steps, advanced by [`Behavior::tick`]:
//!
//! | Step | Phase 1 | Phase 2 |
//! |------|---------|---------|
//! | 0 | low | low |
//! | 1 | high | low |
//! | 2 | low | low |
//! | 3 | low | high |
//!
//! Both outputs carry the clock on bit 0, the reset button on bit 1 and a
//! constant enable on bit 2. Bit 3 is left undefined.

use crate::error::SimError;
use crate::module::{Behavior, DataMap};
use crate::port::{Port, PortKind};
use crate::signal::{Bit, Signal};

const KEY: &str = "clock_phase";

/// Two-phase clock with a reset button.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Clock {
    step: u8,
    reset: bool,
}

impl Clock {
    /// Phase 1 output index.
    pub const PHASE_1: usize = 0;
    /// Phase 2 output index.
    pub const PHASE_2: usize = 1;

    /// Current step, `0..4`.
    pub fn step(&self) -> u8 {
        self.step
    }

    /// `true` while the reset button is held.
    pub fn reset_held(&self) -> bool {
        self.reset
    }

    /// Holds or releases the reset button. While held the clock stays at step 0.
    pub fn set_reset(&mut self, held: bool) {
        self.reset = held;
    }

    fn phase(&self, high: bool) -> Signal {
        Signal::undefined()
            .with_bit(0, Bit::from_bool(high))
            .with_bit(1, Bit::from_bool(self.reset))
            .with_bit(2, Bit::High)
    }
}

impl Behavior for Clock {
    fn name(&self) -> &'static str {
        "clock"
    }

    fn ports(&self) -> Vec<Port> {
        vec![
            Port::output("Phase 1", PortKind::Clock),
            Port::output("Phase 2", PortKind::Clock),
        ]
    }

    fn propagate(&mut self, ports: &mut [Port]) {
        if self.reset {
            self.step = 0;
        }
        ports[Self::PHASE_1].set_value(self.phase(self.step == 1));
        ports[Self::PHASE_2].set_value(self.phase(self.step == 3));
    }

    fn is_autonomous(&self) -> bool {
        true
    }

    fn tick(&mut self) {
        self.step = (self.step + 1) % 4;
    }

    fn data_in(&mut self, data: &DataMap) -> Result<(), SimError> {
        if let Some(raw) = data.get(KEY) {
            self.step = raw
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|s| *s < 4)
                .ok_or_else(|| SimError::bad_data(KEY, raw))?;
        }
        Ok(())
    }

    fn data_out(&self, data: &mut DataMap) {
        data.insert(KEY.to_string(), self.step.to_string());
    }
}
