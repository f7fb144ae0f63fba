//! Modules: the circuit's nodes.
//!
//! A [`Module`] owns an ordered list of [`Port`]s and a [`ModuleKind`] that
//! carries its behaviour and latched state. Every behaviour implements the
//! [`Behavior`] trait:
//!
//! - `ports()` declares the port list once, at construction.
//! - `propagate()` reads inputs (and internal state) and writes outputs.
//! - `affected()` maps an input port to the outputs it can influence; the
//!   static loop check walks this map.
//! - `data_in()`/`data_out()` load and save persistent state as string pairs.
//!
//! Register and RAM are *cycle-breaking*: their outputs change only on a clock
//! edge, so a feedback path through them is not a combinational loop.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::SimError;
use crate::modules::{
    AddSub, Clock, Demux, Fanout, LogicUnit, Mux, OrGate, Ram, Register, Shift, SplitMerge, Switch,
};
use crate::port::Port;

/// Persistent module state as key/value strings.
pub type DataMap = BTreeMap<String, String>;

/// Unique identifier for a module in a circuit.
///
/// Module IDs are assigned sequentially and never reused within a circuit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub(crate) u32);

impl ModuleId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleId({})", self.0)
    }
}

/// Behaviour of a module type.
pub trait Behavior {
    /// Type name, as used in bench files.
    fn name(&self) -> &'static str;

    /// Declares the module's ports, in index order.
    fn ports(&self) -> Vec<Port>;

    /// Recomputes outputs from inputs and internal state.
    fn propagate(&mut self, ports: &mut [Port]);

    /// Output ports influenced by input port `input`.
    fn affected(&self, ports: &[Port], input: usize) -> Vec<usize> {
        default_affected(ports, input)
    }

    /// `false` if port `index` must not be linked given the other ports'
    /// current links.
    fn accepts_link(&self, _ports: &[Port], _index: usize) -> bool {
        true
    }

    /// `true` if outputs only change on a clock edge.
    fn is_cycle_breaking(&self) -> bool {
        false
    }

    /// `true` if the module is driven by [`Circuit::step`](crate::Circuit::step).
    fn is_autonomous(&self) -> bool {
        false
    }

    /// Advances internal time by one simulation step.
    fn tick(&mut self) {}

    /// Loads persistent state. Unknown keys are ignored.
    fn data_in(&mut self, _data: &DataMap) -> Result<(), SimError> {
        Ok(())
    }

    /// Saves persistent state.
    fn data_out(&self, _data: &mut DataMap) {}
}

/// Every other port that can output, provided `input` can input.
pub fn default_affected(ports: &[Port], input: usize) -> Vec<usize> {
    match ports.get(input) {
        Some(p) if p.can_input() => ports
            .iter()
            .enumerate()
            .filter(|&(i, p)| i != input && p.can_output())
            .map(|(i, _)| i)
            .collect(),
        _ => Vec::new(),
    }
}

/// The closed set of module types, plus an escape hatch for custom behaviour.
pub enum ModuleKind {
    /// Four toggle switches.
    Switch(Switch),
    /// Two-phase clock.
    Clock(Clock),
    /// 4-bit register.
    Register(Register),
    /// 64K x 8 memory.
    Ram(Box<Ram>),
    /// NOT/AND/OR/XOR unit.
    Logic(LogicUnit),
    /// Adder/subtractor.
    AddSub(AddSub),
    /// Chained OR.
    Or(OrGate),
    /// 4-way multiplexer.
    Mux(Mux),
    /// 4-way demultiplexer.
    Demux(Demux),
    /// 1-to-4 fanout.
    Fanout(Fanout),
    /// Chained shifter, left or right.
    Shift(Shift),
    /// Bidirectional bit splitter/merger.
    SplitMerge(SplitMerge),
    /// User-supplied behaviour.
    Custom(Box<dyn Behavior + Send>),
}

impl ModuleKind {
    /// Names accepted by [`ModuleKind::from_name`].
    pub const NAMES: &'static [&'static str] = &[
        "switch",
        "clock",
        "register",
        "ram",
        "logic",
        "addsub",
        "or",
        "mux",
        "demux",
        "fanout",
        "lshift",
        "rshift",
        "splitmerge",
    ];

    /// Builds a fresh module kind by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "switch" => Self::Switch(Switch::default()),
            "clock" => Self::Clock(Clock::default()),
            "register" => Self::Register(Register::default()),
            "ram" => Self::Ram(Box::default()),
            "logic" => Self::Logic(LogicUnit),
            "addsub" => Self::AddSub(AddSub),
            "or" => Self::Or(OrGate),
            "mux" => Self::Mux(Mux),
            "demux" => Self::Demux(Demux),
            "fanout" => Self::Fanout(Fanout),
            "lshift" => Self::Shift(Shift::left()),
            "rshift" => Self::Shift(Shift::right()),
            "splitmerge" => Self::SplitMerge(SplitMerge),
            _ => return None,
        })
    }

    /// Shared view of the behaviour.
    pub fn behavior(&self) -> &dyn Behavior {
        match self {
            Self::Switch(b) => b,
            Self::Clock(b) => b,
            Self::Register(b) => b,
            Self::Ram(b) => b.as_ref(),
            Self::Logic(b) => b,
            Self::AddSub(b) => b,
            Self::Or(b) => b,
            Self::Mux(b) => b,
            Self::Demux(b) => b,
            Self::Fanout(b) => b,
            Self::Shift(b) => b,
            Self::SplitMerge(b) => b,
            Self::Custom(b) => b.as_ref(),
        }
    }

    /// Mutable view of the behaviour.
    pub fn behavior_mut(&mut self) -> &mut dyn Behavior {
        match self {
            Self::Switch(b) => b,
            Self::Clock(b) => b,
            Self::Register(b) => b,
            Self::Ram(b) => b.as_mut(),
            Self::Logic(b) => b,
            Self::AddSub(b) => b,
            Self::Or(b) => b,
            Self::Mux(b) => b,
            Self::Demux(b) => b,
            Self::Fanout(b) => b,
            Self::Shift(b) => b,
            Self::SplitMerge(b) => b,
            Self::Custom(b) => b.as_mut(),
        }
    }
}

impl fmt::Debug for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleKind({})", self.behavior().name())
    }
}

/// A node of the circuit.
#[derive(Debug)]
pub struct Module {
    kind: ModuleKind,
    ports: Vec<Port>,
    label: String,
    position: (f64, f64),
    pub(crate) error: bool,
}

impl Module {
    /// Builds a module, declares its ports and computes its initial outputs.
    pub fn new(kind: ModuleKind) -> Self {
        let ports = kind.behavior().ports();
        let mut module = Self {
            kind,
            ports,
            label: String::new(),
            position: (0.0, 0.0),
            error: false,
        };
        module.settle();
        module
    }

    /// Loads persistent state into a module that is not yet in a circuit and
    /// recomputes its outputs, so links made to it carry the loaded values.
    pub fn with_data(mut self, data: &DataMap) -> Result<Self, SimError> {
        self.data_in(data)?;
        self.settle();
        Ok(self)
    }

    fn settle(&mut self) {
        self.run_behavior();
        for p in &mut self.ports {
            p.clear_updated();
        }
    }

    /// Builds a module by type name.
    pub fn from_name(name: &str) -> Option<Self> {
        ModuleKind::from_name(name).map(Self::new)
    }

    /// Sets the label.
    #[must_use]
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    /// Sets the position.
    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = (x, y);
        self
    }

    /// Type name.
    pub fn name(&self) -> &'static str {
        self.kind.behavior().name()
    }

    /// Behaviour and state.
    pub fn kind(&self) -> &ModuleKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut ModuleKind {
        &mut self.kind
    }

    /// Ports in declaration order.
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub(crate) fn ports_mut(&mut self) -> &mut [Port] {
        &mut self.ports
    }

    /// Port `index`, if it exists.
    pub fn port(&self, index: usize) -> Option<&Port> {
        self.ports.get(index)
    }

    /// Index of the port called `name`.
    pub fn port_index(&self, name: &str) -> Option<usize> {
        self.ports.iter().position(|p| p.name() == name)
    }

    /// User-visible label.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn set_label(&mut self, label: String) -> String {
        std::mem::replace(&mut self.label, label)
    }

    /// Position in the editor.
    pub fn position(&self) -> (f64, f64) {
        self.position
    }

    pub(crate) fn translate(&mut self, dx: f64, dy: f64) {
        self.position.0 += dx;
        self.position.1 += dy;
    }

    /// `true` if the module took part in a rejected link or a run-time loop.
    pub fn has_error(&self) -> bool {
        self.error
    }

    /// `false` if port `index` must not take a new link.
    pub fn accepts_link(&self, index: usize) -> bool {
        self.kind.behavior().accepts_link(&self.ports, index)
    }

    /// `true` for register-like modules.
    pub fn is_cycle_breaking(&self) -> bool {
        self.kind.behavior().is_cycle_breaking()
    }

    /// `true` for clock-like modules.
    pub fn is_autonomous(&self) -> bool {
        self.kind.behavior().is_autonomous()
    }

    /// Output ports influenced by port `input`.
    pub fn affected(&self, input: usize) -> Vec<usize> {
        self.kind.behavior().affected(&self.ports, input)
    }

    pub(crate) fn run_behavior(&mut self) {
        self.kind.behavior_mut().propagate(&mut self.ports);
    }

    pub(crate) fn tick(&mut self) {
        self.kind.behavior_mut().tick();
    }

    /// Loads persistent state.
    pub fn data_in(&mut self, data: &DataMap) -> Result<(), SimError> {
        self.kind.behavior_mut().data_in(data)
    }

    /// Saves persistent state.
    pub fn data_out(&self) -> DataMap {
        let mut data = DataMap::new();
        self.kind.behavior().data_out(&mut data);
        data
    }
}
