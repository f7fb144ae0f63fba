//! Undo records for circuit edits.
//!
//! Every recorded edit of a [`Circuit`] pushes one [`EditOp`] onto the
//! circuit's [`OperationStack`](crate::OperationStack). Replaying an op goes
//! through the circuit's unrecorded primitives, so undo and redo never add
//! history of their own.

use crate::circuit::Circuit;
use crate::history::Operation;
use crate::link::Link;
use crate::module::{Module, ModuleId, ModuleKind};
use crate::port::{Mode, PortId};
use crate::signal::Signal;

/// One port's mode before and after a directionality change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModeChange {
    /// Port changed.
    pub port: PortId,
    /// Mode before.
    pub old: Mode,
    /// Mode after.
    pub new: Mode,
}

/// A reversible circuit edit.
#[derive(Debug)]
pub enum EditOp {
    /// A module was added. Holds the module while undone.
    AddModule {
        /// Slot the module lives in.
        id: ModuleId,
        /// The module, while it is out of the circuit.
        module: Option<Module>,
    },
    /// A module was removed. Holds the module while removed.
    RemoveModule {
        /// Slot the module lived in.
        id: ModuleId,
        /// The module, while it is out of the circuit.
        module: Option<Module>,
    },
    /// A link was created.
    CreateLink {
        /// The link.
        link: Link,
    },
    /// A link was deleted.
    DeleteLink {
        /// The link.
        link: Link,
    },
    /// Bidirectional ports changed mode while a link was negotiated.
    Modes {
        /// Changes in the order they were applied.
        changes: Vec<ModeChange>,
    },
    /// A module moved.
    Move {
        /// Module moved.
        module: ModuleId,
        /// Horizontal offset.
        dx: f64,
        /// Vertical offset.
        dy: f64,
    },
    /// A module's label changed.
    Relabel {
        /// Module relabelled.
        module: ModuleId,
        /// Label before.
        old: String,
        /// Label after.
        new: String,
    },
    /// A switch bank was toggled.
    SetSwitches {
        /// Switch module.
        module: ModuleId,
        /// Toggles before.
        old: [bool; 4],
        /// Toggles after.
        new: [bool; 4],
    },
    /// A register's latched value was overwritten.
    SetStored {
        /// Register module.
        module: ModuleId,
        /// Value before.
        old: Signal,
        /// Value after.
        new: Signal,
    },
}

impl EditOp {
    fn set_switches(circuit: &mut Circuit, id: ModuleId, toggles: [bool; 4]) {
        if let Some(ModuleKind::Switch(sw)) = circuit.module_mut(id).map(Module::kind_mut) {
            sw.set_toggles(toggles);
        }
        circuit.propagate_quiet(id);
    }

    fn set_stored(circuit: &mut Circuit, id: ModuleId, value: Signal) {
        if let Some(ModuleKind::Register(reg)) = circuit.module_mut(id).map(Module::kind_mut) {
            reg.set_stored(value);
        }
        circuit.propagate_quiet(id);
    }
}

impl Operation<Circuit> for EditOp {
    fn undo(&mut self, circuit: &mut Circuit) {
        match self {
            EditOp::AddModule { id, module } => *module = circuit.take_module(*id),
            EditOp::RemoveModule { id, module } => {
                if let Some(m) = module.take() {
                    circuit.insert_module_at(*id, m);
                }
            }
            EditOp::CreateLink { link } => {
                circuit.detach_link(link.id);
            }
            EditOp::DeleteLink { link } => circuit.attach_link(link.clone()),
            EditOp::Modes { changes } => {
                for c in changes.iter().rev() {
                    circuit.force_mode(c.port, c.old);
                }
            }
            EditOp::Move { module, dx, dy } => {
                if let Some(m) = circuit.module_mut(*module) {
                    m.translate(-*dx, -*dy);
                }
            }
            EditOp::Relabel { module, old, .. } => {
                if let Some(m) = circuit.module_mut(*module) {
                    m.set_label(old.clone());
                }
            }
            EditOp::SetSwitches { module, old, .. } => Self::set_switches(circuit, *module, *old),
            EditOp::SetStored { module, old, .. } => Self::set_stored(circuit, *module, *old),
        }
    }

    fn redo(&mut self, circuit: &mut Circuit) {
        match self {
            EditOp::AddModule { id, module } => {
                if let Some(m) = module.take() {
                    circuit.insert_module_at(*id, m);
                }
            }
            EditOp::RemoveModule { id, module } => *module = circuit.take_module(*id),
            EditOp::CreateLink { link } => circuit.attach_link(link.clone()),
            EditOp::DeleteLink { link } => {
                circuit.detach_link(link.id);
            }
            EditOp::Modes { changes } => {
                for c in changes.iter() {
                    circuit.force_mode(c.port, c.new);
                }
            }
            EditOp::Move { module, dx, dy } => {
                if let Some(m) = circuit.module_mut(*module) {
                    m.translate(*dx, *dy);
                }
            }
            EditOp::Relabel { module, new, .. } => {
                if let Some(m) = circuit.module_mut(*module) {
                    m.set_label(new.clone());
                }
            }
            EditOp::SetSwitches { module, new, .. } => Self::set_switches(circuit, *module, *new),
            EditOp::SetStored { module, new, .. } => Self::set_stored(circuit, *module, *new),
        }
    }
}
