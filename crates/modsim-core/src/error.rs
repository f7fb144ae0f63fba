//! Error types for circuit editing and propagation.

use thiserror::Error;

use crate::link::LinkId;
use crate::module::ModuleId;
use crate::port::PortId;

/// Reasons a link request is rejected. The circuit is unchanged on error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// Both ends are the same port.
    #[error("cannot link a port to itself: {0}")]
    SamePort(PortId),

    /// Both ends are on the same module.
    #[error("cannot link two ports of the same module: {0}")]
    SameModule(ModuleId),

    /// Both ends have a fixed direction and it is the same.
    #[error("cannot link {a} to {b}: both ports have the same direction")]
    IncompatiblePorts {
        /// First end.
        a: PortId,
        /// Second end.
        b: PortId,
    },

    /// No direction assignment makes one end drive the other.
    #[error("cannot decide a direction for a link between {a} and {b}")]
    Unresolvable {
        /// First end.
        a: PortId,
        /// Second end.
        b: PortId,
    },

    /// The module does not take a link on this port in its current wiring.
    #[error("port {0} cannot take a link while its side is already driven")]
    Refused(PortId),

    /// The link would close a combinational loop through these modules.
    #[error("link would create a loop through {} module(s)", modules.len())]
    WouldLoop {
        /// Modules on the discovered loop, flagged with `error`.
        modules: Vec<ModuleId>,
    },

    /// An end does not exist.
    #[error("port not found: {0}")]
    PortNotFound(PortId),
}

/// Errors raised while simulating or editing a circuit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// Propagation revisited a link on one path and was halted.
    #[error("loop detected at {module} via {link}; simulation halted")]
    RuntimeLoop {
        /// Module whose output closed the loop.
        module: ModuleId,
        /// Link traversed twice.
        link: LinkId,
    },

    /// The module does not exist.
    #[error("module not found: {0}")]
    ModuleNotFound(ModuleId),

    /// The link does not exist.
    #[error("link not found: {0}")]
    LinkNotFound(LinkId),

    /// The module is of a different kind than the operation requires.
    #[error("{module} is a {actual}, expected a {expected}")]
    WrongKind {
        /// Module addressed.
        module: ModuleId,
        /// Kind required.
        expected: &'static str,
        /// Kind found.
        actual: &'static str,
    },

    /// A persistent data entry could not be parsed.
    #[error("bad value {value:?} for data key '{key}'")]
    BadData {
        /// Data key.
        key: String,
        /// Offending value.
        value: String,
    },
}

impl SimError {
    /// Create a bad data error.
    pub fn bad_data(key: &str, value: &str) -> Self {
        SimError::BadData {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}
