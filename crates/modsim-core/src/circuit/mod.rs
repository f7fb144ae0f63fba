//! The circuit: module and link arenas, edit API and undo history.
//!
//! [`Circuit`] is the explicit context every operation runs against. It owns
//!
//! - the module arena (`Vec<Option<Module>>`, indexed by [`ModuleId`]) and the
//!   link arena (indexed by [`LinkId`]); slots are never reused, so IDs stay
//!   valid across undo and redo;
//! - the autonomous roots (clocks) driven by [`Circuit::step`];
//! - the deferral state of the propagation engine;
//! - the shared running flag, cleared when a run-time loop halts propagation;
//! - the [`OperationStack`] of [`EditOp`]s.
//!
//! # Architecture
//!
//! The public edit methods record an [`EditOp`] and then call unrecorded
//! primitives (`insert_module_at`, `take_module`, `attach_link`,
//! `detach_link`, `force_mode`). Undo and redo call the same primitives, with
//! the history moved out of the circuit for the duration of the replay.
//!
//! Link negotiation lives in `wiring`, the propagation engine in `engine`.

mod engine;
mod wiring;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::SimError;
use crate::history::OperationStack;
use crate::link::{Link, LinkId};
use crate::module::{DataMap, Module, ModuleId, ModuleKind};
use crate::ops::EditOp;
use crate::port::{Port, PortId};
use crate::signal::Signal;

/// A circuit of modules joined by links.
#[derive(Debug)]
pub struct Circuit {
    modules: Vec<Option<Module>>,
    links: Vec<Option<Link>>,
    roots: Vec<ModuleId>,
    defer_depth: usize,
    deferred: Vec<ModuleId>,
    running: Arc<AtomicBool>,
    history: OperationStack<EditOp>,
    notice: Option<SimError>,
    ticks: u64,
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

impl Circuit {
    /// An empty circuit with the default history depth.
    pub fn new() -> Self {
        Self::with_history(OperationStack::default())
    }

    /// An empty circuit keeping at most `capacity` undo entries.
    pub fn with_history_capacity(capacity: usize) -> Self {
        Self::with_history(OperationStack::new(capacity))
    }

    fn with_history(history: OperationStack<EditOp>) -> Self {
        Self {
            modules: Vec::new(),
            links: Vec::new(),
            roots: Vec::new(),
            defer_depth: 0,
            deferred: Vec::new(),
            running: Arc::new(AtomicBool::new(false)),
            history,
            notice: None,
            ticks: 0,
        }
    }

    // --- Lookup ---

    /// The module in slot `id`.
    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub(crate) fn module_mut(&mut self, id: ModuleId) -> Option<&mut Module> {
        self.modules.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    fn get_module(&self, id: ModuleId) -> Result<&Module, SimError> {
        self.module(id).ok_or(SimError::ModuleNotFound(id))
    }

    fn get_module_mut(&mut self, id: ModuleId) -> Result<&mut Module, SimError> {
        self.module_mut(id).ok_or(SimError::ModuleNotFound(id))
    }

    /// Live modules in ID order.
    pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules
            .iter()
            .enumerate()
            .filter_map(|(i, m)| m.as_ref().map(|m| (ModuleId(i as u32), m)))
    }

    /// Number of live modules.
    pub fn module_count(&self) -> usize {
        self.modules.iter().flatten().count()
    }

    /// The first module labelled `label`.
    pub fn find_module(&self, label: &str) -> Option<ModuleId> {
        self.modules().find(|(_, m)| m.label() == label).map(|(id, _)| id)
    }

    /// The port called `port` on the module labelled `label`.
    pub fn find_port(&self, label: &str, port: &str) -> Option<PortId> {
        let id = self.find_module(label)?;
        let index = self.module(id)?.port_index(port)?;
        Some(PortId::new(id, index))
    }

    /// The port at `id`.
    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.module(id.module)?.port(id.index)
    }

    pub(crate) fn port_mut(&mut self, id: PortId) -> Option<&mut Port> {
        self.module_mut(id.module)?.ports_mut().get_mut(id.index)
    }

    /// The value the port's module currently sees (inputs) or drives (outputs).
    pub fn value(&self, id: PortId) -> Option<Signal> {
        self.port(id).map(Port::value)
    }

    /// The link in slot `id`.
    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.0 as usize).and_then(Option::as_ref)
    }

    /// Live links in ID order.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().flatten()
    }

    /// Number of live links.
    pub fn link_count(&self) -> usize {
        self.links().count()
    }

    /// Autonomous modules, in the order they were added.
    pub fn roots(&self) -> &[ModuleId] {
        &self.roots
    }

    /// Number of completed [`step`](Self::step) calls.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    // --- Modules ---

    /// Adds a module and records the addition.
    pub fn add_module(&mut self, module: Module) -> ModuleId {
        self.clear_errors();
        let id = ModuleId(self.modules.len() as u32);
        #[cfg(feature = "tracing")]
        tracing::debug!("add_module: {id} ({})", module.name());
        self.insert_module_at(id, module);
        self.history.push(EditOp::AddModule { id, module: None });
        id
    }

    /// Removes a module after deleting every link on it. The removal is one
    /// undo entry; the removed module is held by the history.
    pub fn remove_module(&mut self, id: ModuleId) -> Result<(), SimError> {
        let links: Vec<LinkId> = self
            .get_module(id)?
            .ports()
            .iter()
            .filter_map(Port::link)
            .collect();
        #[cfg(feature = "tracing")]
        tracing::debug!("remove_module: {id} ({} links)", links.len());

        self.begin_compound();
        for link in links {
            self.delete_link(link)?;
        }
        let module = self.take_module(id);
        self.history.push(EditOp::RemoveModule { id, module });
        self.end_compound();
        Ok(())
    }

    pub(crate) fn insert_module_at(&mut self, id: ModuleId, module: Module) {
        let slot = id.0 as usize;
        if self.modules.len() <= slot {
            self.modules.resize_with(slot + 1, || None);
        }
        if module.is_autonomous() {
            self.roots.push(id);
        }
        self.modules[slot] = Some(module);
    }

    pub(crate) fn take_module(&mut self, id: ModuleId) -> Option<Module> {
        let module = self.modules.get_mut(id.0 as usize)?.take()?;
        self.roots.retain(|r| *r != id);
        self.deferred.retain(|d| *d != id);
        Some(module)
    }

    // --- Errors ---

    /// Clears the error flag on every module.
    pub fn clear_errors(&mut self) {
        for m in self.modules.iter_mut().flatten() {
            m.error = false;
        }
    }

    /// Modules currently flagged with an error.
    pub fn errored_modules(&self) -> Vec<ModuleId> {
        self.modules().filter(|(_, m)| m.has_error()).map(|(id, _)| id).collect()
    }

    /// Takes the pending error raised where no caller could receive it, such
    /// as propagation triggered by undo. Each error is reported once.
    pub fn take_notice(&mut self) -> Option<SimError> {
        self.notice.take()
    }

    /// Keeps an error no caller could receive until [`take_notice`](Self::take_notice).
    pub(crate) fn set_notice(&mut self, err: SimError) {
        self.notice = Some(err);
    }

    // --- Running flag ---

    /// `true` while the simulation is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Sets the running flag.
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    /// The running flag, shared with ticker threads.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    // --- History ---

    /// The undo history.
    pub fn history(&self) -> &OperationStack<EditOp> {
        &self.history
    }

    /// Drops all undo history.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// `true` if an edit was recorded since the last [`reset_modified`](Self::reset_modified).
    pub fn is_modified(&self) -> bool {
        self.history.is_modified()
    }

    /// Clears the modified flag.
    pub fn reset_modified(&mut self) {
        self.history.reset_modified();
    }

    /// Reverts the last recorded edit. Returns `true` if anything was undone.
    pub fn undo(&mut self) -> bool {
        self.replay(|h, c| h.undo(c))
    }

    /// Re-applies the last undone edit. Returns `true` if anything was redone.
    pub fn redo(&mut self) -> bool {
        self.replay(|h, c| h.redo(c))
    }

    /// Opens a compound edit.
    pub fn begin_compound(&mut self) {
        self.history.begin_compound();
    }

    /// Closes a compound edit.
    pub fn end_compound(&mut self) {
        self.history.end_compound();
    }

    /// Reverts and discards the open compound edit.
    pub fn cancel_compound(&mut self) {
        self.replay(|h, c| h.cancel_compound(c));
    }

    fn replay<R>(&mut self, f: impl FnOnce(&mut OperationStack<EditOp>, &mut Circuit) -> R) -> R {
        let mut history = std::mem::replace(&mut self.history, OperationStack::new(0));
        let out = f(&mut history, self);
        self.history = history;
        out
    }

    // --- Edits ---

    /// Moves a module by `(dx, dy)`.
    pub fn move_module(&mut self, id: ModuleId, dx: f64, dy: f64) -> Result<(), SimError> {
        self.get_module_mut(id)?.translate(dx, dy);
        self.history.push(EditOp::Move { module: id, dx, dy });
        Ok(())
    }

    /// Changes a module's label.
    pub fn relabel(&mut self, id: ModuleId, label: &str) -> Result<(), SimError> {
        let old = self.get_module_mut(id)?.set_label(label.to_string());
        self.history.push(EditOp::Relabel {
            module: id,
            old,
            new: label.to_string(),
        });
        Ok(())
    }

    fn wrong_kind(&self, id: ModuleId, expected: &'static str) -> SimError {
        SimError::WrongKind {
            module: id,
            expected,
            actual: self.module(id).map_or("?", Module::name),
        }
    }

    /// Sets a switch bank, most significant toggle first, and propagates.
    pub fn set_switches(&mut self, id: ModuleId, toggles: [bool; 4]) -> Result<(), SimError> {
        let old = match self.get_module_mut(id)?.kind_mut() {
            ModuleKind::Switch(sw) => {
                let old = sw.toggles();
                sw.set_toggles(toggles);
                old
            }
            _ => return Err(self.wrong_kind(id, "switch")),
        };
        self.history.push(EditOp::SetSwitches {
            module: id,
            old,
            new: toggles,
        });
        self.propagate(id)
    }

    /// Overwrites a register's latched value and propagates.
    pub fn set_register(&mut self, id: ModuleId, value: Signal) -> Result<(), SimError> {
        let old = match self.get_module_mut(id)?.kind_mut() {
            ModuleKind::Register(reg) => {
                let old = reg.stored();
                reg.set_stored(value);
                old
            }
            _ => return Err(self.wrong_kind(id, "register")),
        };
        self.history.push(EditOp::SetStored {
            module: id,
            old,
            new: value,
        });
        self.propagate(id)
    }

    /// Holds or releases a clock's reset button and propagates. Not recorded.
    pub fn set_clock_reset(&mut self, id: ModuleId, held: bool) -> Result<(), SimError> {
        match self.get_module_mut(id)?.kind_mut() {
            ModuleKind::Clock(clk) => clk.set_reset(held),
            _ => return Err(self.wrong_kind(id, "clock")),
        }
        self.propagate(id)
    }

    /// Loads persistent state into a module and propagates from it. Not
    /// recorded.
    pub fn load_module_data(&mut self, id: ModuleId, data: &DataMap) -> Result<(), SimError> {
        self.get_module_mut(id)?.data_in(data)?;
        self.propagate(id)
    }

    /// Saves a module's persistent state.
    pub fn module_data(&self, id: ModuleId) -> Result<DataMap, SimError> {
        Ok(self.get_module(id)?.data_out())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::{Register, Switch};

    fn switch(c: &mut Circuit, label: &str) -> ModuleId {
        c.add_module(Module::from_name("switch").unwrap().with_label(label))
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut c = Circuit::new();
        let a = switch(&mut c, "a");
        c.remove_module(a).unwrap();
        let b = switch(&mut c, "b");
        assert_ne!(a, b);
        assert_eq!(c.module_count(), 1);
    }

    #[test]
    fn test_add_remove_undo() {
        let mut c = Circuit::new();
        let a = switch(&mut c, "a");
        c.remove_module(a).unwrap();
        assert!(c.module(a).is_none());
        assert!(c.undo());
        assert_eq!(c.module(a).unwrap().label(), "a");
        assert!(c.undo());
        assert!(c.module(a).is_none());
        assert!(c.redo());
        assert!(c.redo());
        assert!(c.module(a).is_none());
        assert_eq!(c.module_count(), 0);
    }

    #[test]
    fn test_find_port() {
        let mut c = Circuit::new();
        let a = switch(&mut c, "sw");
        assert_eq!(c.find_port("sw", "Data"), Some(PortId::new(a, Switch::DATA)));
        assert_eq!(c.find_port("sw", "Nope"), None);
        assert_eq!(c.find_port("other", "Data"), None);
    }

    #[test]
    fn test_move_and_relabel_undo() {
        let mut c = Circuit::new();
        let a = switch(&mut c, "a");
        c.move_module(a, 10.0, -5.0).unwrap();
        c.relabel(a, "b").unwrap();
        assert_eq!(c.module(a).unwrap().position(), (10.0, -5.0));
        assert_eq!(c.module(a).unwrap().label(), "b");
        c.undo();
        assert_eq!(c.module(a).unwrap().label(), "a");
        c.undo();
        assert_eq!(c.module(a).unwrap().position(), (0.0, 0.0));
    }

    #[test]
    fn test_set_switches_wrong_kind() {
        let mut c = Circuit::new();
        let r = c.add_module(Module::from_name("register").unwrap());
        let err = c.set_switches(r, [true; 4]).unwrap_err();
        assert!(matches!(err, SimError::WrongKind { expected: "switch", .. }));
        assert!(c.set_register(r, Signal::from_uint(6)).is_ok());
        assert_eq!(c.history().len(), 2);
        // Unconnected control is pulled to clock+enable, so the latch follows
        // its (pulled low) data input straight away.
        let out = PortId::new(r, Register::DATA_OUT);
        assert_eq!(c.value(out), Some(Signal::from_uint(0)));
    }

    #[test]
    fn test_missing_module() {
        let mut c = Circuit::new();
        let ghost = ModuleId(42);
        assert_eq!(c.remove_module(ghost), Err(SimError::ModuleNotFound(ghost)));
        assert!(c.move_module(ghost, 1.0, 1.0).is_err());
        assert!(c.module_data(ghost).is_err());
    }

    #[test]
    fn test_clock_is_root() {
        let mut c = Circuit::new();
        let clk = c.add_module(Module::from_name("clock").unwrap());
        assert_eq!(c.roots(), &[clk]);
        c.remove_module(clk).unwrap();
        assert!(c.roots().is_empty());
        c.undo();
        assert_eq!(c.roots(), &[clk]);
    }
}
