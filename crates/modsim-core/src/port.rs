//! Module ports.
//!
//! A [`Port`] is a typed connection point owned by one module. Its
//! [`PortRole`] fixes how it behaves:
//!
//! - `Input` reads the linked value with undefined bits filled from its pull
//!   value, or reads the pull value alone when unlinked.
//! - `Output` is written by its module's behaviour.
//! - `Bidir` starts undecided and is forced to act as an input or an output
//!   when a link is made to it. While undecided it reads as undefined and
//!   ignores writes.
//!
//! Ports are addressed from outside their module by [`PortId`].

use crate::link::LinkId;
use crate::module::ModuleId;
use crate::signal::Signal;

/// Cosmetic classification of a port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum PortKind {
    /// Data bus.
    #[default]
    Data,
    /// Control lines.
    Control,
    /// Clock lines.
    Clock,
    /// Anything else.
    Generic,
}

/// The face of a module a port sits on.
///
/// Bidirectional ports on the same side take the same direction; ports on
/// opposite sides take opposite directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// Input face.
    Input,
    /// Output face.
    Output,
}

/// Direction a port currently operates in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Receives a value over its link.
    Input,
    /// Drives its link.
    Output,
    /// Not yet decided (bidirectional ports only).
    Bidir,
}

impl Mode {
    /// `Input` and `Output` swap; `Bidir` is its own opposite.
    #[inline]
    pub fn opposite(self) -> Mode {
        match self {
            Mode::Input => Mode::Output,
            Mode::Output => Mode::Input,
            Mode::Bidir => Mode::Bidir,
        }
    }
}

/// What a port is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortRole {
    /// Reads a value; undefined bits are filled from `pull`.
    Input {
        /// Value seen while unlinked, and fill for undefined linked bits.
        pull: Signal,
    },
    /// Written by the owning module.
    Output,
    /// Direction negotiated at link time.
    Bidir {
        /// Current mode.
        mode: Mode,
    },
}

/// Address of a port: owning module plus declaration index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId {
    /// Owning module.
    pub module: ModuleId,
    /// Index into the module's port list.
    pub index: usize,
}

impl PortId {
    /// Shorthand constructor.
    #[inline]
    pub fn new(module: ModuleId, index: usize) -> Self {
        Self { module, index }
    }
}

impl std::fmt::Display for PortId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.module, self.index)
    }
}

/// A connection point on a module.
#[derive(Clone, Debug)]
pub struct Port {
    name: String,
    kind: PortKind,
    role: PortRole,
    side: Side,
    value: Signal,
    updated: bool,
    pub(crate) link: Option<LinkId>,
}

impl Port {
    fn with_role(name: &str, kind: PortKind, role: PortRole, side: Side) -> Self {
        Self {
            name: name.to_string(),
            kind,
            role,
            side,
            value: Signal::undefined(),
            updated: false,
            link: None,
        }
    }

    /// An input port pulled low.
    pub fn input(name: &str, kind: PortKind) -> Self {
        Self::input_with_pull(name, kind, Signal::from_uint(0))
    }

    /// An input port with an explicit pull value.
    pub fn input_with_pull(name: &str, kind: PortKind, pull: Signal) -> Self {
        Self::with_role(name, kind, PortRole::Input { pull }, Side::Input)
    }

    /// An output port.
    pub fn output(name: &str, kind: PortKind) -> Self {
        Self::with_role(name, kind, PortRole::Output, Side::Output)
    }

    /// An undecided bidirectional port on the given side.
    pub fn bidir(name: &str, kind: PortKind, side: Side) -> Self {
        Self::with_role(name, kind, PortRole::Bidir { mode: Mode::Bidir }, side)
    }

    /// Display name, unique within the module.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cosmetic kind.
    pub fn kind(&self) -> PortKind {
        self.kind
    }

    /// Role.
    pub fn role(&self) -> PortRole {
        self.role
    }

    /// Face of the module.
    pub fn side(&self) -> Side {
        self.side
    }

    /// Link attached to this port, if any.
    pub fn link(&self) -> Option<LinkId> {
        self.link
    }

    /// Current direction. Fixed ports report their fixed direction.
    pub fn mode(&self) -> Mode {
        match self.role {
            PortRole::Input { .. } => Mode::Input,
            PortRole::Output => Mode::Output,
            PortRole::Bidir { mode } => mode,
        }
    }

    /// `true` for bidirectional ports.
    pub fn is_bidir(&self) -> bool {
        matches!(self.role, PortRole::Bidir { .. })
    }

    /// `true` if the port can receive a value in its current mode.
    pub fn can_input(&self) -> bool {
        self.mode() != Mode::Output
    }

    /// `true` if the port can drive a link in its current mode.
    pub fn can_output(&self) -> bool {
        self.mode() != Mode::Input
    }

    /// `true` unless the port is an undecided bidirectional port.
    pub fn has_direction(&self) -> bool {
        self.mode() != Mode::Bidir
    }

    /// Value as seen by the owning module.
    pub fn value(&self) -> Signal {
        match self.role {
            PortRole::Input { pull } => {
                if self.link.is_some() {
                    self.value.resolve_pull(pull)
                } else {
                    pull
                }
            }
            PortRole::Output => self.value,
            PortRole::Bidir { mode: Mode::Bidir } => Signal::undefined(),
            PortRole::Bidir { .. } => self.value,
        }
    }

    /// The stored value without pull resolution.
    pub fn raw_value(&self) -> Signal {
        self.value
    }

    /// `true` if any bit of the visible value is defined.
    pub fn is_connected(&self) -> bool {
        self.value().any_defined()
    }

    /// Stores `v`. Returns `true` and marks the port updated if the value
    /// changed; otherwise clears the updated flag and returns `false`.
    ///
    /// Undecided bidirectional ports ignore writes.
    pub fn set_value(&mut self, v: Signal) -> bool {
        if let PortRole::Bidir { mode: Mode::Bidir } = self.role {
            return false;
        }
        if self.value == v {
            self.updated = false;
            false
        } else {
            self.value = v;
            self.updated = true;
            true
        }
    }

    /// `true` if the last write changed the value.
    pub fn was_updated(&self) -> bool {
        self.updated
    }

    pub(crate) fn clear_updated(&mut self) {
        self.updated = false;
    }

    /// Input pull value, if this is an input port.
    pub fn pull(&self) -> Option<Signal> {
        match self.role {
            PortRole::Input { pull } => Some(pull),
            _ => None,
        }
    }

    /// Overwrites the mode of a bidirectional port. Fixed ports are unchanged.
    /// Returns `true` if the mode changed.
    pub(crate) fn force_mode(&mut self, mode: Mode) -> bool {
        match &mut self.role {
            PortRole::Bidir { mode: m } if *m != mode => {
                *m = mode;
                true
            }
            _ => false,
        }
    }
}
