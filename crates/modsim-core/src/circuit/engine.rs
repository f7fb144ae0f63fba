//! Worklist propagation, deferral and the autonomous tick.
//!
//! # Architecture
//!
//! [`Circuit::propagate`] drains a breadth-first queue of
//! `(module, visited links)`. Each item runs the module's behaviour and
//! forwards every updated output across its link, enqueueing the target module
//! with a copy of the visited set plus that link. Reaching a link already in
//! the item's own set means a combinational loop: the module is flagged, the
//! running flag is cleared and the queue is dropped.
//!
//! Visited sets are per path, so a module reached along two independent paths
//! runs twice, which is what reconverging fan-out needs.

use std::collections::VecDeque;

use crate::error::SimError;
use crate::link::{LinkId, LinkSet};
use crate::module::ModuleId;
use crate::signal::Signal;

use super::Circuit;

impl Circuit {
    /// Propagates from `id` until the circuit is quiet.
    ///
    /// While deferring, the module is only recorded. A run-time loop halts
    /// propagation and returns [`SimError::RuntimeLoop`]; the circuit stays
    /// editable.
    pub fn propagate(&mut self, id: ModuleId) -> Result<(), SimError> {
        if self.module(id).is_none() {
            return Err(SimError::ModuleNotFound(id));
        }
        if self.defer_depth > 0 {
            if !self.deferred.contains(&id) {
                self.deferred.push(id);
            }
            return Ok(());
        }

        let mut queue = VecDeque::from([(id, LinkSet::default())]);
        while let Some((mid, visited)) = queue.pop_front() {
            let Some(module) = self.module_mut(mid) else {
                continue;
            };
            module.run_behavior();

            let mut transfers: Vec<(LinkId, Signal)> = Vec::new();
            let mut closed = None;
            for port in module.ports_mut() {
                if !port.can_output() {
                    port.clear_updated();
                    continue;
                }
                if port.was_updated()
                    && let Some(link) = port.link
                {
                    if visited.contains(link) {
                        closed = Some(link);
                        break;
                    }
                    transfers.push((link, port.value()));
                }
                port.clear_updated();
            }

            if let Some(link) = closed {
                module.error = true;
                // Outputs ahead of the loop still reach their targets.
                for (link, value) in transfers {
                    self.transfer(link, value);
                }
                self.set_running(false);
                #[cfg(feature = "tracing")]
                tracing::error!("propagate: loop at {mid} via {link}; simulation halted");
                return Err(SimError::RuntimeLoop { module: mid, link });
            }

            for (link, value) in transfers {
                let Some(target) = self.transfer(link, value) else {
                    continue;
                };
                let mut next = visited.clone();
                next.insert(link);
                queue.push_back((target, next));
            }
        }
        Ok(())
    }

    /// Copies `value` onto the target of `link` and returns the target module.
    fn transfer(&mut self, link: LinkId, value: Signal) -> Option<ModuleId> {
        let target = self.link(link)?.target;
        if let Some(port) = self.port_mut(target) {
            port.set_value(value);
        }
        Some(target.module)
    }

    /// Propagates where no caller can take the error; a halt is kept as the
    /// pending notice.
    pub(crate) fn propagate_quiet(&mut self, id: ModuleId) {
        if let Err(err) = self.propagate(id) {
            self.set_notice(err);
        }
    }

    /// Opens a deferral guard. Until the matching outermost
    /// [`end_defer`](Self::end_defer), `propagate` only records modules.
    pub fn begin_defer(&mut self) {
        self.defer_depth += 1;
    }

    /// Closes a deferral guard. The outermost close propagates every recorded
    /// module once, in the order first recorded.
    ///
    /// A halt drops the modules still pending.
    pub fn end_defer(&mut self) -> Result<(), SimError> {
        if self.defer_depth == 0 {
            #[cfg(feature = "tracing")]
            tracing::warn!("end_defer without begin_defer; ignoring");
            return Ok(());
        }
        self.defer_depth -= 1;
        if self.defer_depth > 0 {
            return Ok(());
        }

        let pending = std::mem::take(&mut self.deferred);
        #[cfg(feature = "tracing")]
        tracing::debug!("end_defer: flushing {} module(s)", pending.len());
        for id in pending {
            if self.module(id).is_some() {
                self.propagate(id)?;
            }
        }
        Ok(())
    }

    /// `true` while a deferral guard is open.
    pub fn is_deferring(&self) -> bool {
        self.defer_depth > 0
    }

    /// One autonomous tick: advances every root (clock) and propagates from
    /// it, in the order the roots were added. Does nothing while deferring.
    pub fn step(&mut self) -> Result<(), SimError> {
        if self.is_deferring() {
            return Ok(());
        }
        self.ticks += 1;
        for id in self.roots.clone() {
            if let Some(module) = self.module_mut(id) {
                module.tick();
            }
            self.propagate(id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::link::LinkPath;
    use crate::module::{Behavior, Module, ModuleKind};
    use crate::modules::{Clock, Register, Switch};
    use crate::port::{Port, PortId, PortKind};

    /// Adds one to its input and counts its runs.
    struct Incrementer {
        runs: Arc<AtomicUsize>,
    }

    impl Behavior for Incrementer {
        fn name(&self) -> &'static str {
            "inc"
        }

        fn ports(&self) -> Vec<Port> {
            vec![Port::input("In", PortKind::Data), Port::output("Out", PortKind::Data)]
        }

        fn propagate(&mut self, ports: &mut [Port]) {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let v = ports[0].value().to_uint().wrapping_add(1);
            ports[1].set_value(Signal::from_uint(v));
        }
    }

    fn incrementer(c: &mut Circuit) -> (ModuleId, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let kind = ModuleKind::Custom(Box::new(Incrementer { runs: Arc::clone(&runs) }));
        (c.add_module(Module::new(kind)), runs)
    }

    #[test]
    fn test_value_flows_downstream() {
        let mut c = Circuit::new();
        let s = c.add_module(Module::from_name("switch").unwrap());
        let (a, _) = incrementer(&mut c);
        let (b, _) = incrementer(&mut c);
        c.create_link(PortId::new(s, Switch::DATA), PortId::new(a, 0), LinkPath::default())
            .unwrap();
        c.create_link(PortId::new(a, 1), PortId::new(b, 0), LinkPath::default())
            .unwrap();
        c.set_switches(s, [false, false, true, true]).unwrap();
        assert_eq!(c.value(PortId::new(b, 1)), Some(Signal::from_uint(5)));
    }

    #[test]
    fn test_runtime_loop_halts() {
        let mut c = Circuit::new();
        let (x, _) = incrementer(&mut c);
        let (y, _) = incrementer(&mut c);
        c.set_running(true);

        c.begin_defer();
        c.connect_unchecked(PortId::new(x, 1), PortId::new(y, 0)).unwrap();
        let back = c.connect_unchecked(PortId::new(y, 1), PortId::new(x, 0)).unwrap();
        let err = c.end_defer().unwrap_err();

        assert!(matches!(err, SimError::RuntimeLoop { .. }));
        assert!(!c.is_running());
        assert_eq!(c.errored_modules().len(), 1);
        // The caller got the error, so there is nothing left to report.
        assert_eq!(c.take_notice(), None);

        // Still editable: breaking the loop lets propagation settle.
        c.delete_link(back).unwrap();
        assert!(c.propagate(x).is_ok());
    }

    #[test]
    fn test_loop_closed_by_edit_leaves_notice() {
        let mut c = Circuit::new();
        let (x, _) = incrementer(&mut c);
        let (y, _) = incrementer(&mut c);
        c.connect_unchecked(PortId::new(x, 1), PortId::new(y, 0)).unwrap();
        assert_eq!(c.take_notice(), None);

        c.connect_unchecked(PortId::new(y, 1), PortId::new(x, 0)).unwrap();
        assert!(matches!(c.take_notice(), Some(SimError::RuntimeLoop { .. })));
        assert_eq!(c.take_notice(), None);
    }

    /// Drives a fresh count onto both outputs on every run.
    struct Fork {
        count: u32,
    }

    impl Behavior for Fork {
        fn name(&self) -> &'static str {
            "fork"
        }

        fn ports(&self) -> Vec<Port> {
            vec![
                Port::input("In", PortKind::Data),
                Port::output("Out 0", PortKind::Data),
                Port::output("Out 1", PortKind::Data),
            ]
        }

        fn propagate(&mut self, ports: &mut [Port]) {
            self.count = (self.count + 1) % 16;
            ports[1].set_value(Signal::from_uint(self.count));
            ports[2].set_value(Signal::from_uint(self.count));
        }
    }

    #[test]
    fn test_runtime_loop_still_delivers_earlier_outputs() {
        let mut c = Circuit::new();
        let x = c.add_module(Module::new(ModuleKind::Custom(Box::new(Fork { count: 0 }))));
        let (sink, _) = incrementer(&mut c);
        let (y, _) = incrementer(&mut c);

        c.begin_defer();
        c.connect_unchecked(PortId::new(x, 1), PortId::new(sink, 0)).unwrap();
        c.connect_unchecked(PortId::new(x, 2), PortId::new(y, 0)).unwrap();
        c.connect_unchecked(PortId::new(y, 1), PortId::new(x, 0)).unwrap();
        let _ = c.end_defer();
        c.clear_errors();

        let err = c.propagate(x).unwrap_err();
        assert!(matches!(err, SimError::RuntimeLoop { module, .. } if module == x));
        assert_eq!(c.value(PortId::new(sink, 0)), c.value(PortId::new(x, 1)));
    }

    #[test]
    fn test_deferred_batch_runs_each_module_once() {
        let toggles = [[true, false, false, false], [false, true, true, false], [true, true, false, true]];

        let mut direct = Circuit::new();
        let s = direct.add_module(Module::from_name("switch").unwrap());
        let (a, _) = incrementer(&mut direct);
        direct
            .create_link(PortId::new(s, Switch::DATA), PortId::new(a, 0), LinkPath::default())
            .unwrap();
        for t in toggles {
            direct.set_switches(s, t).unwrap();
        }

        let mut batched = Circuit::new();
        let s2 = batched.add_module(Module::from_name("switch").unwrap());
        let (a2, runs) = incrementer(&mut batched);
        batched
            .create_link(PortId::new(s2, Switch::DATA), PortId::new(a2, 0), LinkPath::default())
            .unwrap();
        let before = runs.load(Ordering::SeqCst);

        batched.begin_defer();
        batched.begin_defer();
        for t in toggles {
            batched.set_switches(s2, t).unwrap();
        }
        batched.end_defer().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), before);
        batched.end_defer().unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), before + 1);
        assert_eq!(batched.value(PortId::new(a2, 1)), direct.value(PortId::new(a, 1)));
        assert_eq!(batched.value(PortId::new(a2, 1)), Some(Signal::from_uint(14)));
    }

    #[test]
    fn test_unbalanced_end_defer_is_ignored() {
        let mut c = Circuit::new();
        assert!(c.end_defer().is_ok());
        assert!(!c.is_deferring());
    }

    #[test]
    fn test_step_advances_clock_into_register() {
        let mut c = Circuit::new();
        let clk = c.add_module(Module::from_name("clock").unwrap());
        let s = c.add_module(Module::from_name("switch").unwrap());
        let r = c.add_module(Module::from_name("register").unwrap());
        c.create_link(PortId::new(s, Switch::DATA), PortId::new(r, Register::DATA_IN), LinkPath::default())
            .unwrap();
        c.create_link(
            PortId::new(clk, Clock::PHASE_1),
            PortId::new(r, Register::CONTROL_IN),
            LinkPath::default(),
        )
        .unwrap();
        c.set_switches(s, [true, false, false, true]).unwrap();
        c.propagate(r).unwrap();
        let out = PortId::new(r, Register::DATA_OUT);

        // Phase 1 is low at step 0, so nothing is latched yet.
        assert_eq!(c.value(out), Some(Signal::from_uint(0)));
        c.step().unwrap();
        assert_eq!(c.ticks(), 1);
        assert_eq!(c.value(out), Some(Signal::from_uint(9)));
    }

    #[test]
    fn test_step_is_skipped_while_deferring() {
        let mut c = Circuit::new();
        c.add_module(Module::from_name("clock").unwrap());
        c.begin_defer();
        c.step().unwrap();
        assert_eq!(c.ticks(), 0);
    }
}
