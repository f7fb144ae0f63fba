//! Four toggle switches driving a single output.

use crate::error::SimError;
use crate::module::{Behavior, DataMap};
use crate::port::{Port, PortKind};
use crate::signal::Signal;

const KEY: &str = "switch_set";

/// A bank of four toggle switches. Toggle 0 drives the most significant bit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Switch {
    toggles: [bool; 4],
}

impl Switch {
    /// Output port index.
    pub const DATA: usize = 0;

    /// Current toggle positions, most significant first.
    pub fn toggles(&self) -> [bool; 4] {
        self.toggles
    }

    /// Sets all toggles, most significant first.
    pub fn set_toggles(&mut self, toggles: [bool; 4]) {
        self.toggles = toggles;
    }

    /// The value the switches drive.
    pub fn value(&self) -> Signal {
        let [s1, s2, s3, s4] = self.toggles;
        Signal::from_bools(s1, s2, s3, s4)
    }
}

impl Behavior for Switch {
    fn name(&self) -> &'static str {
        "switch"
    }

    fn ports(&self) -> Vec<Port> {
        vec![Port::output("Data", PortKind::Generic)]
    }

    fn propagate(&mut self, ports: &mut [Port]) {
        ports[Self::DATA].set_value(self.value());
    }

    fn data_in(&mut self, data: &DataMap) -> Result<(), SimError> {
        let Some(raw) = data.get(KEY) else {
            return Ok(());
        };
        let bits: Vec<char> = raw.chars().collect();
        if bits.len() != 4 {
            return Err(SimError::bad_data(KEY, raw));
        }
        for (toggle, c) in self.toggles.iter_mut().zip(bits) {
            *toggle = match c {
                '0' => false,
                '1' => true,
                _ => return Err(SimError::bad_data(KEY, raw)),
            };
        }
        Ok(())
    }

    fn data_out(&self, data: &mut DataMap) {
        let s: String = self.toggles.iter().map(|&t| if t { '1' } else { '0' }).collect();
        data.insert(KEY.to_string(), s);
    }
}
