//! Arithmetic and logic units.

use crate::module::Behavior;
use crate::modules::control_passthrough_affected;
use crate::port::{Port, PortKind};
use crate::signal::{Bit, Signal};

/// Bitwise logic unit. Control bits 0-1 select the function:
/// `0` NOT A, `1` A AND B, `2` A OR B, `3` A XOR B.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LogicUnit;

impl LogicUnit {
    /// Result output index.
    pub const RESULT: usize = 0;
    /// Control output index.
    pub const CONTROL_OUT: usize = 1;
    /// Input A index.
    pub const A: usize = 2;
    /// Input B index.
    pub const B: usize = 3;
    /// Control input index.
    pub const CONTROL_IN: usize = 4;
}

impl Behavior for LogicUnit {
    fn name(&self) -> &'static str {
        "logic"
    }

    fn ports(&self) -> Vec<Port> {
        vec![
            Port::output("Result", PortKind::Data),
            Port::output("Control out", PortKind::Control),
            Port::input("Input A", PortKind::Data),
            Port::input("Input B", PortKind::Data),
            Port::input("Control in", PortKind::Control),
        ]
    }

    fn propagate(&mut self, ports: &mut [Port]) {
        let a = ports[Self::A].value().to_uint();
        let b = ports[Self::B].value().to_uint();
        let control = ports[Self::CONTROL_IN].value();
        let result = match control.to_uint() & 3 {
            0 => !a,
            1 => a & b,
            2 => a | b,
            _ => a ^ b,
        };
        ports[Self::RESULT].set_value(Signal::from_uint(result));
        ports[Self::CONTROL_OUT].set_value(control);
    }

    fn affected(&self, ports: &[Port], input: usize) -> Vec<usize> {
        control_passthrough_affected(ports, input, Self::CONTROL_IN, Self::CONTROL_OUT)
    }
}

/// 4-bit adder/subtractor.
///
/// Control in:
/// - bit 0 with bit 1 low: pass A through
/// - bit 1: complement B (subtract)
/// - bit 2: carry in
/// - bit 3: not-zero chain in
///
/// Control out copies control in, with the carry out on bit 2 and the
/// not-zero chain (any earlier stage or this result nonzero) on bit 3.
///
/// The bool output is the sign bit of the result when control bits 0 and 1
/// are both high, otherwise a zero test over the whole chain. It drives all
/// four bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AddSub;

impl AddSub {
    /// Result output index.
    pub const RESULT: usize = 0;
    /// Bool output index.
    pub const BOOL: usize = 1;
    /// Control output index.
    pub const CONTROL_OUT: usize = 2;
    /// Input A index.
    pub const A: usize = 3;
    /// Input B index.
    pub const B: usize = 4;
    /// Control input index.
    pub const CONTROL_IN: usize = 5;
}

impl Behavior for AddSub {
    fn name(&self) -> &'static str {
        "addsub"
    }

    fn ports(&self) -> Vec<Port> {
        vec![
            Port::output("Result", PortKind::Data),
            Port::output("Bool test Result", PortKind::Data),
            Port::output("Control out", PortKind::Control),
            Port::input("Input A", PortKind::Data),
            Port::input("Input B", PortKind::Data),
            Port::input("Control in", PortKind::Control),
        ]
    }

    fn propagate(&mut self, ports: &mut [Port]) {
        let a = ports[Self::A].value().to_uint();
        let control = ports[Self::CONTROL_IN].value();
        let complement = if control.is_high(1) { 0xF } else { 0 };
        let b = ports[Self::B].value().to_uint() ^ complement;
        let carry = u32::from(control.is_high(2));

        let sum = if control.is_high(0) && !control.is_high(1) {
            a
        } else {
            a + b + carry
        };
        let carry_out = (sum >> 4) & 1 == 1;
        let result = Signal::from_uint(sum);

        let not_zero = control.is_high(3) || result.to_uint() != 0;
        let control_out = control
            .with_bit(2, Bit::from_bool(carry_out))
            .with_bit(3, Bit::from_bool(not_zero));

        let test = if control.is_high(0) && control.is_high(1) {
            result.is_high(3)
        } else {
            !not_zero
        };

        ports[Self::RESULT].set_value(result);
        ports[Self::BOOL].set_value(Signal::splat(Bit::from_bool(test)));
        ports[Self::CONTROL_OUT].set_value(control_out);
    }
}
