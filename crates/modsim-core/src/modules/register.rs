//! 4-bit register.

use crate::error::SimError;
use crate::module::{Behavior, DataMap};
use crate::port::{Port, PortKind};
use crate::signal::Signal;

const KEY: &str = "latched_value";

/// Level-triggered 4-bit latch.
///
/// Control bits: 0 clock, 1 reset, 2 enable. The control input is pulled to
/// `0101` (clock high, reset low, enable high), so an unconnected register
/// follows its data input. Reset takes priority and latches zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Register {
    stored: Signal,
}

impl Default for Register {
    fn default() -> Self {
        Self {
            stored: Signal::from_uint(0),
        }
    }
}

impl Register {
    /// Data input index.
    pub const DATA_IN: usize = 0;
    /// Control input index.
    pub const CONTROL_IN: usize = 1;
    /// Data output index.
    pub const DATA_OUT: usize = 2;
    /// Control output index.
    pub const CONTROL_OUT: usize = 3;

    /// The latched value.
    pub fn stored(&self) -> Signal {
        self.stored
    }

    /// Overwrites the latched value. The outputs follow on the next propagate.
    pub fn set_stored(&mut self, v: Signal) {
        self.stored = v;
    }

    /// Latches zero.
    pub fn clear(&mut self) {
        self.stored = Signal::from_uint(0);
    }
}

impl Behavior for Register {
    fn name(&self) -> &'static str {
        "register"
    }

    fn ports(&self) -> Vec<Port> {
        vec![
            Port::input("Data in", PortKind::Data),
            Port::input_with_pull(
                "Control in",
                PortKind::Clock,
                Signal::from_bools(false, true, false, true),
            ),
            Port::output("Data out", PortKind::Data),
            Port::output("Control out", PortKind::Clock),
        ]
    }

    fn propagate(&mut self, ports: &mut [Port]) {
        let control = ports[Self::CONTROL_IN].value();
        if control.is_high(1) {
            self.stored = Signal::from_int(0);
        } else if control.is_high(0) && control.is_high(2) {
            self.stored = ports[Self::DATA_IN].value();
        }
        ports[Self::DATA_OUT].set_value(self.stored);
        ports[Self::CONTROL_OUT].set_value(control);
    }

    fn affected(&self, _ports: &[Port], input: usize) -> Vec<usize> {
        match input {
            Self::CONTROL_IN => vec![Self::DATA_OUT, Self::CONTROL_OUT],
            Self::DATA_IN => vec![Self::DATA_OUT],
            _ => Vec::new(),
        }
    }

    fn is_cycle_breaking(&self) -> bool {
        true
    }

    fn data_in(&mut self, data: &DataMap) -> Result<(), SimError> {
        if let Some(raw) = data.get(KEY) {
            self.stored = raw.parse().map_err(|_| SimError::bad_data(KEY, raw))?;
        }
        Ok(())
    }

    fn data_out(&self, data: &mut DataMap) {
        data.insert(KEY.to_string(), self.stored.to_string());
    }
}
