//! Signal routing: OR chain, multiplexer, demultiplexer and fanout.

use crate::module::Behavior;
use crate::modules::control_passthrough_affected;
use crate::port::{Port, PortKind};
use crate::signal::{Bit, Signal};

const LETTERS: [&str; 4] = ["A", "B", "C", "D"];

fn four(prefix: &str, kind: PortKind, output: bool) -> impl Iterator<Item = Port> {
    LETTERS.into_iter().map(move |l| {
        let name = format!("{prefix} {l}");
        if output {
            Port::output(&name, kind)
        } else {
            Port::input(&name, kind)
        }
    })
}

/// Four-input OR with pass-through outputs and a chain input.
///
/// The result drives bit 0 only: HIGH if bit 0 of any input (or of the chain
/// input) is HIGH. Each input is also copied to its pass-through output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OrGate;

impl OrGate {
    /// Result output index.
    pub const RESULT: usize = 0;
    /// First pass-through output index.
    pub const PASS_A: usize = 1;
    /// Chain input index.
    pub const CHAIN_IN: usize = 5;
    /// First data input index.
    pub const INPUT_A: usize = 6;
}

impl Behavior for OrGate {
    fn name(&self) -> &'static str {
        "or"
    }

    fn ports(&self) -> Vec<Port> {
        let mut ports = vec![Port::output("Or'ed output", PortKind::Control)];
        ports.extend(four("Pass", PortKind::Generic, true));
        ports.push(Port::input("Chain in", PortKind::Control));
        ports.extend(four("Input", PortKind::Generic, false));
        ports
    }

    fn propagate(&mut self, ports: &mut [Port]) {
        let mut any = ports[Self::CHAIN_IN].value().is_high(0);
        for i in 0..4 {
            let v = ports[Self::INPUT_A + i].value();
            ports[Self::PASS_A + i].set_value(v);
            any |= v.is_high(0);
        }
        ports[Self::RESULT].set_value(Signal::undefined().with_bit(0, Bit::from_bool(any)));
    }

    fn affected(&self, _ports: &[Port], input: usize) -> Vec<usize> {
        let mut out = vec![Self::RESULT];
        if (Self::INPUT_A..Self::INPUT_A + 4).contains(&input) {
            out.push(Self::PASS_A + input - Self::INPUT_A);
        }
        out
    }
}

/// Four-way multiplexer. Control bits 0-1 select the input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Mux;

impl Mux {
    /// Selected output index.
    pub const OUTPUT: usize = 0;
    /// Control output index.
    pub const CONTROL_OUT: usize = 1;
    /// First data input index.
    pub const INPUT_A: usize = 2;
    /// Control input index.
    pub const CONTROL_IN: usize = 6;
}

impl Behavior for Mux {
    fn name(&self) -> &'static str {
        "mux"
    }

    fn ports(&self) -> Vec<Port> {
        let mut ports = vec![
            Port::output("Selected output", PortKind::Data),
            Port::output("Control out", PortKind::Control),
        ];
        ports.extend(four("Input", PortKind::Data, false));
        ports.push(Port::input("Control in", PortKind::Control));
        ports
    }

    fn propagate(&mut self, ports: &mut [Port]) {
        let control = ports[Self::CONTROL_IN].value();
        let sel = (control.to_uint() & 3) as usize;
        let v = ports[Self::INPUT_A + sel].value();
        ports[Self::OUTPUT].set_value(v);
        ports[Self::CONTROL_OUT].set_value(control);
    }

    fn affected(&self, ports: &[Port], input: usize) -> Vec<usize> {
        control_passthrough_affected(ports, input, Self::CONTROL_IN, Self::CONTROL_OUT)
    }
}

/// Four-way demultiplexer. The selected output copies the input; the others
/// are driven to zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Demux;

impl Demux {
    /// Data input index.
    pub const INPUT: usize = 0;
    /// Control input index.
    pub const CONTROL_IN: usize = 1;
    /// First data output index.
    pub const OUTPUT_A: usize = 2;
    /// Control output index.
    pub const CONTROL_OUT: usize = 6;
}

impl Behavior for Demux {
    fn name(&self) -> &'static str {
        "demux"
    }

    fn ports(&self) -> Vec<Port> {
        let mut ports = vec![
            Port::input("Input", PortKind::Data),
            Port::input("Control in", PortKind::Control),
        ];
        ports.extend(four("Output", PortKind::Data, true));
        ports.push(Port::output("Control out", PortKind::Control));
        ports
    }

    fn propagate(&mut self, ports: &mut [Port]) {
        let control = ports[Self::CONTROL_IN].value();
        let sel = (control.to_uint() & 3) as usize;
        let v = ports[Self::INPUT].value();
        for i in 0..4 {
            let out = if i == sel { v } else { Signal::from_uint(0) };
            ports[Self::OUTPUT_A + i].set_value(out);
        }
        ports[Self::CONTROL_OUT].set_value(control);
    }

    fn affected(&self, ports: &[Port], input: usize) -> Vec<usize> {
        control_passthrough_affected(ports, input, Self::CONTROL_IN, Self::CONTROL_OUT)
    }
}

/// Copies one input to four outputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Fanout;

impl Fanout {
    /// Input index.
    pub const INPUT: usize = 4;
}

impl Behavior for Fanout {
    fn name(&self) -> &'static str {
        "fanout"
    }

    fn ports(&self) -> Vec<Port> {
        let mut ports: Vec<Port> = four("Output", PortKind::Generic, true).collect();
        ports.push(Port::input("Input", PortKind::Generic));
        ports
    }

    fn propagate(&mut self, ports: &mut [Port]) {
        let v = ports[Self::INPUT].value();
        for p in &mut ports[..Self::INPUT] {
            p.set_value(v);
        }
    }
}
