//! Configuration and bench files for the modsim simulator.
//!
//! # Features
//!
//! - **Settings**: [`SimConfig`] holds the tick interval, undo depth and log filter
//! - **Benches**: [`Bench`] describes a circuit in TOML and builds it into a
//!   [`Circuit`](modsim_core::Circuit), or captures a live circuit back into TOML
//!
//! # Example
//!
//! ```rust
//! use modsim_config::{Bench, ModuleSpec};
//!
//! let bench = Bench::new("demo")
//!     .with_module(ModuleSpec::new("in", "switch").with_data("switch_set", "0101"))
//!     .with_module(ModuleSpec::new("split", "fanout"))
//!     .with_link("in.Data", "split.Input");
//!
//! let circuit = bench.build().unwrap();
//! let out = circuit.find_port("split", "Output C").unwrap();
//! assert_eq!(circuit.value(out).unwrap().to_uint(), 5);
//! ```

mod bench;
mod error;
mod sim_config;

pub use bench::{Bench, LinkSpec, ModuleSpec};
pub use error::ConfigError;
pub use sim_config::SimConfig;
