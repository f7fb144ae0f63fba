//! The built-in module library.
//!
//! | Type | Name | Notes |
//! |------|------|-------|
//! | [`Switch`] | `switch` | four toggles driving one output |
//! | [`Clock`] | `clock` | two-phase clock, advanced by `Circuit::step` |
//! | [`Register`] | `register` | 4-bit latch, cycle-breaking |
//! | [`Ram`] | `ram` | 64K x 8 memory, cycle-breaking |
//! | [`LogicUnit`] | `logic` | NOT/AND/OR/XOR |
//! | [`AddSub`] | `addsub` | adder/subtractor with flags |
//! | [`OrGate`] | `or` | chained OR with pass-throughs |
//! | [`Mux`] | `mux` | 4-way selector |
//! | [`Demux`] | `demux` | 4-way distributor |
//! | [`Fanout`] | `fanout` | one input to four outputs |
//! | [`Shift`] | `lshift`, `rshift` | chained shifter |
//! | [`SplitMerge`] | `splitmerge` | bidirectional bit splitter |

mod arith;
mod clock;
mod ram;
mod register;
mod routing;
mod shift;
mod split_merge;
mod switch;

pub use arith::{AddSub, LogicUnit};
pub use clock::Clock;
pub use ram::Ram;
pub use register::Register;
pub use routing::{Demux, Fanout, Mux, OrGate};
pub use shift::Shift;
pub use split_merge::SplitMerge;
pub use switch::Switch;

use crate::module::default_affected;
use crate::port::Port;

/// Runs a behaviour once over its declared ports, for unit tests.
#[cfg(test)]
pub(crate) fn ports_of(b: &mut dyn crate::module::Behavior) -> Vec<Port> {
    let mut ports = b.ports();
    b.propagate(&mut ports);
    ports
}

/// Simulates a linked input: stores `v` and marks the port as linked.
#[cfg(test)]
pub(crate) fn drive(ports: &mut [Port], index: usize, v: crate::Signal) {
    ports[index].link = Some(crate::LinkId(u32::MAX));
    ports[index].set_value(v);
}

/// Default fan-out, except that `control_out` only follows `control_in`.
pub(crate) fn control_passthrough_affected(
    ports: &[Port],
    input: usize,
    control_in: usize,
    control_out: usize,
) -> Vec<usize> {
    let mut out = default_affected(ports, input);
    if input != control_in {
        out.retain(|&i| i != control_out);
    }
    out
}
