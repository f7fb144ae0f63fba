//! Chained shifter.
//!
//! Control bits 0-1 give the distance: `00` pass, `01` one, `10` two, `11`
//! three. Bits shifted in come from the chain input, and the bits shifted out
//! leave on the chain output, so shifters can be cascaded into wider words.
//! The control input is pulled to `xx01`.

use crate::module::Behavior;
use crate::modules::control_passthrough_affected;
use crate::port::{Port, PortKind};
use crate::signal::{Bit, Signal};

/// Left or right shifter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shift {
    left: bool,
}

impl Shift {
    /// Result output index.
    pub const RESULT: usize = 0;
    /// Chain output index.
    pub const CHAIN_OUT: usize = 1;
    /// Control output index.
    pub const CONTROL_OUT: usize = 2;
    /// Control input index.
    pub const CONTROL_IN: usize = 3;
    /// Data input index.
    pub const DATA_IN: usize = 4;
    /// Chain input index.
    pub const CHAIN_IN: usize = 5;

    /// A shifter towards the most significant bit.
    pub fn left() -> Self {
        Self { left: true }
    }

    /// A shifter towards the least significant bit.
    pub fn right() -> Self {
        Self { left: false }
    }

    /// `true` for a left shifter.
    pub fn is_left(&self) -> bool {
        self.left
    }

    /// Bit position counted from the edge the shift moves away from.
    fn sided(&self, which: usize) -> usize {
        if self.left { 3 - which } else { which }
    }

    fn shift(&self, input: Signal, dist: usize, chain: Signal) -> Signal {
        let src = input.bits();
        let mut out = src;
        for i in 0..4 - dist {
            if self.left {
                out[i + dist] = src[i];
            } else {
                out[i] = src[i + dist];
            }
        }
        // Vacated positions, nearest the moving edge first.
        let fill: &[(usize, usize)] = match dist {
            1 => &[(0, 0)],
            2 => &[(0, 2), (1, 1)],
            _ => &[(2, 0), (0, 2), (1, 1)],
        };
        for &(pos, chain_bit) in fill {
            let at = if self.left { pos } else { 3 - pos };
            out[at] = chain.bit(chain_bit);
        }
        Signal::from_bits(out)
    }
}

impl Behavior for Shift {
    fn name(&self) -> &'static str {
        if self.left { "lshift" } else { "rshift" }
    }

    fn ports(&self) -> Vec<Port> {
        vec![
            Port::output("Result", PortKind::Data),
            Port::output("Chain out", PortKind::Data),
            Port::output("Control out", PortKind::Control),
            Port::input_with_pull("Control in", PortKind::Control, Signal::from_raw(1, 3)),
            Port::input("Data in", PortKind::Data),
            Port::input("Chain in", PortKind::Data),
        ]
    }

    fn propagate(&mut self, ports: &mut [Port]) {
        let control = ports[Self::CONTROL_IN].value();
        let data = ports[Self::DATA_IN].value();
        let chain = ports[Self::CHAIN_IN].value();

        let dist = (control.to_uint() & 3) as usize;
        let mut chain_out = [Bit::Undefined; 4];
        if control.is_high(0) {
            chain_out[0] = data.bit(self.sided(0));
            chain_out[1] = data.bit(self.sided(1));
            chain_out[2] = data.bit(self.sided(2));
        } else {
            chain_out[0] = data.bit(self.sided(0));
            chain_out[1] = data.bit(self.sided(0));
            chain_out[2] = data.bit(self.sided(1));
        }

        let result = if dist == 0 { data } else { self.shift(data, dist, chain) };
        ports[Self::RESULT].set_value(result);
        ports[Self::CHAIN_OUT].set_value(Signal::from_bits(chain_out));
        ports[Self::CONTROL_OUT].set_value(control);
    }

    fn affected(&self, ports: &[Port], input: usize) -> Vec<usize> {
        control_passthrough_affected(ports, input, Self::CONTROL_IN, Self::CONTROL_OUT)
    }
}
