//! Modsim Core - signal propagation engine for a 4-bit logic simulator
//!
//! This crate holds everything below the editor: the value model, the wiring
//! graph, the propagation engine and the undo history.
//!
//! # Core Abstractions
//!
//! ## Values
//!
//! - [`Signal`] - Four bits, each high, low or undefined
//! - [`Bit`] - One of those bits
//!
//! ## Graph
//!
//! - [`Port`] - Input, output or bidirectional pin with a value and an updated flag
//! - [`Link`] - Directed wire from a source port to a target port
//! - [`Module`] - Ports plus a [`Behavior`]; the built-in kinds live in [`modules`]
//! - [`Circuit`] - Module and link arenas, link negotiation, propagation and history
//!
//! ## History
//!
//! - [`OperationStack`] - Ring buffer of reversible operations with nested compounds
//! - [`EditOp`] - The circuit edits it records
//!
//! ## Running
//!
//! - [`Simulation`] - Circuit behind a mutex, driven by a ticker thread
//!
//! # Example
//!
//! ```rust
//! use modsim_core::{Circuit, LinkPath, Module, PortId, Signal};
//! use modsim_core::modules::{Fanout, Switch};
//!
//! let mut circuit = Circuit::new();
//! let sw = circuit.add_module(Module::from_name("switch").unwrap());
//! let fan = circuit.add_module(Module::from_name("fanout").unwrap());
//!
//! circuit
//!     .create_link(PortId::new(sw, Switch::DATA), PortId::new(fan, Fanout::INPUT), LinkPath::default())
//!     .unwrap();
//! circuit.set_switches(sw, [true, false, true, false]).unwrap();
//!
//! assert_eq!(circuit.value(PortId::new(fan, 0)), Some(Signal::from_uint(0b1010)));
//!
//! circuit.undo();
//! assert_eq!(circuit.value(PortId::new(fan, 0)), Some(Signal::from_uint(0)));
//! ```
//!
//! # Design Principles
//!
//! - **Explicit context**: no globals; every operation runs against a [`Circuit`]
//! - **Arena IDs**: modules and links are addressed by index, never by reference
//! - **Recoverable misuse**: protocol violations warn and recover instead of panicking

pub mod circuit;
pub mod error;
pub mod history;
pub mod link;
pub mod module;
pub mod modules;
pub mod ops;
pub mod port;
pub mod signal;
pub mod simulation;

// Re-export main types at crate root
pub use circuit::Circuit;
pub use error::{LinkError, SimError};
pub use history::{MAX_HISTORY, Operation, OperationStack};
pub use link::{Link, LinkId, LinkPath};
pub use module::{Behavior, DataMap, Module, ModuleId, ModuleKind, default_affected};
pub use ops::{EditOp, ModeChange};
pub use port::{Mode, Port, PortId, PortKind, PortRole, Side};
pub use signal::{Bit, ParseSignalError, Signal};
pub use simulation::{DEFAULT_TICK_INTERVAL, Simulation};
