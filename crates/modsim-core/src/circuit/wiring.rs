//! Link creation, direction negotiation and static loop detection.
//!
//! Creating a link runs inside a compound edit so a rejected request leaves
//! the circuit exactly as it was:
//!
//! 1. Validate the ends.
//! 2. Delete any links already on either end.
//! 3. Pick the direction and force undecided bidirectional ends, spreading
//!    the decision through their modules and links.
//! 4. Walk the `affected` map downstream from the new target. Reaching the
//!    new link again means a combinational loop; registers and RAM end the
//!    walk.
//! 5. Commit, or cancel the compound and report the loop.

use std::collections::HashSet;

use crate::error::{LinkError, SimError};
use crate::link::{Link, LinkId, LinkPath};
use crate::module::ModuleId;
use crate::ops::{EditOp, ModeChange};
use crate::port::{Mode, PortId};
use crate::signal::Signal;

use super::Circuit;

impl Circuit {
    /// Links ports `a` and `b`.
    ///
    /// Direction is resolved from the port roles: two undecided bidirectional
    /// ports link `a` to `b`; otherwise whichever end can drive becomes the
    /// source and `path` is reversed if that is `b`. Links already on either
    /// end are deleted. The target takes the source's value, but nothing is
    /// propagated; call [`propagate`](Self::propagate) on the target module.
    ///
    /// On error the circuit and its history are unchanged, except that the
    /// modules of a rejected loop are flagged with `error`.
    pub fn create_link(&mut self, a: PortId, b: PortId, path: LinkPath) -> Result<LinkId, LinkError> {
        let pa = self.port(a).ok_or(LinkError::PortNotFound(a))?;
        let pb = self.port(b).ok_or(LinkError::PortNotFound(b))?;
        if a == b {
            return Err(LinkError::SamePort(a));
        }
        if a.module == b.module {
            return Err(LinkError::SameModule(a.module));
        }
        if pa.has_direction() && pb.has_direction() && pa.can_output() == pb.can_output() {
            return Err(LinkError::IncompatiblePorts { a, b });
        }
        for end in [a, b] {
            if self.module(end.module).is_some_and(|m| !m.accepts_link(end.index)) {
                return Err(LinkError::Refused(end));
            }
        }

        self.clear_errors();
        self.begin_compound();

        for end in [a, b] {
            if let Some(old) = self.port(end).and_then(|p| p.link) {
                // The link exists, so this cannot fail.
                let _ = self.delete_link(old);
            }
        }

        let (Some(pa), Some(pb)) = (self.port(a), self.port(b)) else {
            self.cancel_compound();
            return Err(LinkError::PortNotFound(a));
        };
        let (source, target, reversed) = if !pa.has_direction() && !pb.has_direction() {
            (a, b, false)
        } else if pa.can_output() && pb.can_input() {
            (a, b, false)
        } else if pa.can_input() && pb.can_output() {
            (b, a, true)
        } else {
            self.cancel_compound();
            return Err(LinkError::Unresolvable { a, b });
        };

        let mut path = path;
        if reversed {
            path.reverse();
        }
        let id = LinkId(self.links.len() as u32);
        let link = Link {
            id,
            source,
            target,
            path,
        };
        self.insert_link(link.clone());

        let mut changes = Vec::new();
        self.set_mode(source, Mode::Output, &mut changes);
        self.set_mode(target, Mode::Input, &mut changes);
        if !changes.is_empty() {
            self.history.push(EditOp::Modes { changes });
        }

        if let Some(modules) = self.find_loop(id) {
            #[cfg(feature = "tracing")]
            tracing::warn!("create_link: {source} → {target} would close a loop through {modules:?}");
            self.remove_link(id);
            self.cancel_compound();
            for m in &modules {
                if let Some(module) = self.module_mut(*m) {
                    module.error = true;
                }
            }
            return Err(LinkError::WouldLoop { modules });
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("create_link: {source} → {target} as {id}");
        self.history.push(EditOp::CreateLink { link });
        self.end_compound();

        let v = self.value(source).unwrap_or_default();
        if let Some(p) = self.port_mut(target) {
            p.set_value(v);
        }
        Ok(id)
    }

    /// Links `source` to `target` without direction negotiation or loop
    /// checks, then propagates. Existing links on either end are deleted.
    ///
    /// For loaders replaying a known-good circuit, and for building loops on
    /// purpose.
    pub fn connect_unchecked(&mut self, source: PortId, target: PortId) -> Result<LinkId, LinkError> {
        let mut old_links = Vec::new();
        for end in [source, target] {
            let port = self.port(end).ok_or(LinkError::PortNotFound(end))?;
            old_links.extend(port.link);
        }

        self.begin_compound();
        for old in old_links {
            let _ = self.delete_link(old);
        }
        let id = LinkId(self.links.len() as u32);
        let link = Link {
            id,
            source,
            target,
            path: LinkPath::default(),
        };
        #[cfg(feature = "tracing")]
        tracing::debug!("connect_unchecked: {source} → {target} as {id}");
        self.attach_link(link.clone());
        self.history.push(EditOp::CreateLink { link });
        self.end_compound();
        Ok(id)
    }

    /// Deletes a link. The target reads undefined, its module is propagated,
    /// and both ends fall back to undecided where their modules allow it.
    pub fn delete_link(&mut self, id: LinkId) -> Result<(), SimError> {
        let link = self.detach_link(id).ok_or(SimError::LinkNotFound(id))?;
        #[cfg(feature = "tracing")]
        tracing::debug!("delete_link: {id} ({} → {})", link.source, link.target);
        self.history.push(EditOp::DeleteLink { link });
        Ok(())
    }

    fn insert_link(&mut self, link: Link) {
        let slot = link.id.0 as usize;
        if self.links.len() <= slot {
            self.links.resize_with(slot + 1, || None);
        }
        for end in [link.source, link.target] {
            if let Some(p) = self.port_mut(end) {
                p.link = Some(link.id);
            }
        }
        self.links[slot] = Some(link);
    }

    fn remove_link(&mut self, id: LinkId) -> Option<Link> {
        let link = self.links.get_mut(id.0 as usize)?.take()?;
        for end in [link.source, link.target] {
            if let Some(p) = self.port_mut(end) {
                p.link = None;
            }
        }
        Some(link)
    }

    /// Puts a link (back) into the circuit: fixes the end modes, copies the
    /// source value across and propagates the target module.
    pub(crate) fn attach_link(&mut self, link: Link) {
        let (source, target) = (link.source, link.target);
        self.insert_link(link);
        let mut scratch = Vec::new();
        self.set_mode(source, Mode::Output, &mut scratch);
        self.set_mode(target, Mode::Input, &mut scratch);
        let v = self.value(source).unwrap_or_default();
        if let Some(p) = self.port_mut(target) {
            p.set_value(v);
        }
        self.propagate_quiet(target.module);
    }

    /// Takes a link out of the circuit: the target reads undefined, its
    /// module is propagated, then both ends return to undecided.
    pub(crate) fn detach_link(&mut self, id: LinkId) -> Option<Link> {
        let link = self.remove_link(id)?;
        if let Some(p) = self.port_mut(link.target) {
            p.set_value(Signal::undefined());
        }
        self.propagate_quiet(link.target.module);
        let mut scratch = Vec::new();
        self.set_mode(link.source, Mode::Bidir, &mut scratch);
        self.set_mode(link.target, Mode::Bidir, &mut scratch);
        Some(link)
    }

    /// Overwrites one port's mode with no further effects.
    pub(crate) fn force_mode(&mut self, port: PortId, mode: Mode) {
        if let Some(p) = self.port_mut(port) {
            p.force_mode(mode);
        }
    }

    /// Sets a bidirectional port's mode and spreads it.
    ///
    /// A port only returns to `Bidir` while no port on its module holds a
    /// link. A decided port spreads its mode only if it holds a link. Spreading
    /// gives every other bidirectional port on the module the same mode (same
    /// side) or the opposite mode (other side), and gives the far end of each
    /// of their links the opposite of that. Fixed-direction ports ignore all
    /// of this. Applied changes are appended to `changes`.
    fn set_mode(&mut self, root: PortId, mode: Mode, changes: &mut Vec<ModeChange>) {
        let mut work = vec![(root, mode)];
        let mut seen: HashSet<(PortId, Mode)> = HashSet::new();

        while let Some((pid, mode)) = work.pop() {
            if !seen.insert((pid, mode)) {
                continue;
            }
            let Some(module) = self.module(pid.module) else {
                continue;
            };
            let Some(port) = module.port(pid.index) else {
                continue;
            };
            let old = port.mode();
            if !port.is_bidir() || old == mode {
                continue;
            }
            let spread = if mode == Mode::Bidir {
                if module.ports().iter().any(|p| p.link.is_some()) {
                    continue;
                }
                true
            } else {
                port.link.is_some()
            };
            let side = port.side();

            let mut next = Vec::new();
            if spread {
                for (i, p) in module.ports().iter().enumerate() {
                    if i == pid.index || !p.is_bidir() {
                        continue;
                    }
                    let (near, far) = if p.side() == side {
                        (mode, mode.opposite())
                    } else {
                        (mode.opposite(), mode)
                    };
                    let here = PortId::new(pid.module, i);
                    next.push((here, near));
                    if let Some(far_end) = p.link.and_then(|l| self.link(l)).and_then(|l| l.other_end(here)) {
                        next.push((far_end, far));
                    }
                }
            }

            self.force_mode(pid, mode);
            changes.push(ModeChange { port: pid, old, new: mode });
            work.extend(next.into_iter().rev());
        }
    }

    /// Searches downstream of link `new` for a path back to it. Returns the
    /// modules on the path, starting at the link's target.
    fn find_loop(&self, new: LinkId) -> Option<Vec<ModuleId>> {
        let start = self.link(new)?.target;
        let mut visited: HashSet<PortId> = HashSet::new();
        // (entry port, index of the trail node we came from)
        let mut trail: Vec<(PortId, Option<usize>)> = Vec::new();
        let mut stack = vec![(start, None)];

        while let Some((entry, parent)) = stack.pop() {
            if !visited.insert(entry) {
                continue;
            }
            let Some(module) = self.module(entry.module) else {
                continue;
            };
            if module.is_cycle_breaking() {
                continue;
            }
            let node = trail.len();
            trail.push((entry, parent));

            for out in module.affected(entry.index) {
                let Some(port) = module.port(out) else {
                    continue;
                };
                if !port.can_output() {
                    continue;
                }
                let Some(l) = port.link else {
                    continue;
                };
                if l == new {
                    let mut modules = Vec::new();
                    let mut cur = Some(node);
                    while let Some(i) = cur {
                        modules.push(trail[i].0.module);
                        cur = trail[i].1;
                    }
                    modules.reverse();
                    return Some(modules);
                }
                let here = PortId::new(entry.module, out);
                if let Some(next) = self.link(l).filter(|next| next.source == here) {
                    stack.push((next.target, Some(node)));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Module;
    use crate::modules::{Fanout, LogicUnit, Register, SplitMerge, Switch};

    fn add(c: &mut Circuit, name: &str) -> ModuleId {
        c.add_module(Module::from_name(name).unwrap())
    }

    #[test]
    fn test_link_rejections() {
        let mut c = Circuit::new();
        let s1 = add(&mut c, "switch");
        let s2 = add(&mut c, "switch");
        let f = add(&mut c, "fanout");
        let out1 = PortId::new(s1, Switch::DATA);
        let out2 = PortId::new(s2, Switch::DATA);
        let fan_out = PortId::new(f, 0);
        let fan_in = PortId::new(f, Fanout::INPUT);

        assert_eq!(c.create_link(out1, out1, LinkPath::default()), Err(LinkError::SamePort(out1)));
        assert_eq!(
            c.create_link(fan_out, fan_in, LinkPath::default()),
            Err(LinkError::SameModule(f))
        );
        assert!(matches!(
            c.create_link(out1, out2, LinkPath::default()),
            Err(LinkError::IncompatiblePorts { .. })
        ));
        let ghost = PortId::new(s1, 9);
        assert_eq!(c.create_link(ghost, fan_in, LinkPath::default()), Err(LinkError::PortNotFound(ghost)));
        assert_eq!(c.link_count(), 0);
        assert_eq!(c.history().len(), 3);
    }

    #[test]
    fn test_reversed_link_flips_path() {
        let mut c = Circuit::new();
        let s = add(&mut c, "switch");
        let f = add(&mut c, "fanout");
        let path = LinkPath::new(vec![(0.0, 0.0), (5.0, 5.0)]);
        let id = c
            .create_link(PortId::new(f, Fanout::INPUT), PortId::new(s, Switch::DATA), path)
            .unwrap();
        let link = c.link(id).unwrap();
        assert_eq!(link.source, PortId::new(s, Switch::DATA));
        assert_eq!(link.path.points, vec![(5.0, 5.0), (0.0, 0.0)]);
    }

    #[test]
    fn test_relinking_replaces_old_link() {
        let mut c = Circuit::new();
        let s1 = add(&mut c, "switch");
        let s2 = add(&mut c, "switch");
        let f = add(&mut c, "fanout");
        let input = PortId::new(f, Fanout::INPUT);
        let first = c.create_link(PortId::new(s1, Switch::DATA), input, LinkPath::default()).unwrap();
        let second = c.create_link(PortId::new(s2, Switch::DATA), input, LinkPath::default()).unwrap();
        assert!(c.link(first).is_none());
        assert_eq!(c.port(input).unwrap().link(), Some(second));
        assert!(c.port(PortId::new(s1, Switch::DATA)).unwrap().link().is_none());

        // One undo restores the first link.
        c.undo();
        assert_eq!(c.port(input).unwrap().link(), Some(first));
    }

    #[test]
    fn test_loop_rejected_and_state_restored() {
        let mut c = Circuit::new();
        let a = add(&mut c, "logic");
        let b = add(&mut c, "logic");
        let s = add(&mut c, "switch");
        let a_in = PortId::new(a, LogicUnit::A);
        let b_in = PortId::new(b, LogicUnit::A);
        c.create_link(PortId::new(a, LogicUnit::RESULT), b_in, LinkPath::default()).unwrap();
        let feed = c.create_link(PortId::new(s, Switch::DATA), a_in, LinkPath::default()).unwrap();
        let history_len = c.history().len();

        let err = c
            .create_link(PortId::new(b, LogicUnit::RESULT), a_in, LinkPath::default())
            .unwrap_err();
        assert_eq!(err, LinkError::WouldLoop { modules: vec![a, b] });
        assert!(c.module(a).unwrap().has_error());
        assert!(c.module(b).unwrap().has_error());
        assert!(!c.module(s).unwrap().has_error());

        // The link that was displaced is back and nothing was recorded.
        assert_eq!(c.port(a_in).unwrap().link(), Some(feed));
        assert_eq!(c.link_count(), 2);
        assert_eq!(c.history().len(), history_len);
    }

    #[test]
    fn test_register_breaks_loop() {
        let mut c = Circuit::new();
        let a = add(&mut c, "logic");
        let r = add(&mut c, "register");
        c.create_link(
            PortId::new(a, LogicUnit::RESULT),
            PortId::new(r, Register::DATA_IN),
            LinkPath::default(),
        )
        .unwrap();
        let back = c.create_link(
            PortId::new(r, Register::DATA_OUT),
            PortId::new(a, LogicUnit::A),
            LinkPath::default(),
        );
        assert!(back.is_ok());
        assert!(c.errored_modules().is_empty());
    }

    #[test]
    fn test_bidir_direction_spreads() {
        let mut c = Circuit::new();
        let sm = add(&mut c, "splitmerge");
        let s = add(&mut c, "switch");
        let a0 = PortId::new(sm, SplitMerge::A0);
        c.create_link(PortId::new(s, Switch::DATA), a0, LinkPath::default()).unwrap();

        let module = c.module(sm).unwrap();
        assert_eq!(module.ports()[SplitMerge::A0].mode(), Mode::Input);
        assert_eq!(module.ports()[SplitMerge::A1].mode(), Mode::Input);
        for i in 0..4 {
            assert_eq!(module.ports()[SplitMerge::B0 + i].mode(), Mode::Output);
        }

        // Deleting the only link releases every port.
        let id = c.port(a0).unwrap().link().unwrap();
        c.delete_link(id).unwrap();
        let module = c.module(sm).unwrap();
        assert!(module.ports().iter().all(|p| p.mode() == Mode::Bidir));
    }

    #[test]
    fn test_split_merge_takes_one_driven_a_port() {
        let mut c = Circuit::new();
        let sm = add(&mut c, "splitmerge");
        let s1 = add(&mut c, "switch");
        let s2 = add(&mut c, "switch");
        let a1 = PortId::new(sm, SplitMerge::A1);
        c.create_link(PortId::new(s1, Switch::DATA), PortId::new(sm, SplitMerge::A0), LinkPath::default())
            .unwrap();
        let history_len = c.history().len();

        assert_eq!(
            c.create_link(PortId::new(s2, Switch::DATA), a1, LinkPath::default()),
            Err(LinkError::Refused(a1))
        );
        assert_eq!(c.link_count(), 1);
        assert_eq!(c.history().len(), history_len);
    }

    #[test]
    fn test_split_merge_feeds_both_a_ports_when_merging() {
        let mut c = Circuit::new();
        let sm = add(&mut c, "splitmerge");
        let s = add(&mut c, "switch");
        let f1 = add(&mut c, "fanout");
        let f2 = add(&mut c, "fanout");
        c.create_link(PortId::new(s, Switch::DATA), PortId::new(sm, SplitMerge::B0), LinkPath::default())
            .unwrap();
        c.create_link(PortId::new(sm, SplitMerge::A0), PortId::new(f1, Fanout::INPUT), LinkPath::default())
            .unwrap();
        c.create_link(PortId::new(sm, SplitMerge::A1), PortId::new(f2, Fanout::INPUT), LinkPath::default())
            .unwrap();
        assert_eq!(c.link_count(), 3);
    }

    #[test]
    fn test_unchecked_relink_undoes_in_one_step() {
        let mut c = Circuit::new();
        let s1 = add(&mut c, "switch");
        let s2 = add(&mut c, "switch");
        let f = add(&mut c, "fanout");
        let input = PortId::new(f, Fanout::INPUT);
        let first = c.connect_unchecked(PortId::new(s1, Switch::DATA), input).unwrap();
        let len = c.history().len();
        let second = c.connect_unchecked(PortId::new(s2, Switch::DATA), input).unwrap();
        assert_eq!(c.history().len(), len + 1);
        assert_eq!(c.port(input).unwrap().link(), Some(second));

        assert!(c.undo());
        assert_eq!(c.port(input).unwrap().link(), Some(first));
        assert!(c.link(second).is_none());
    }

    #[test]
    fn test_bidir_to_bidir_follows_request_order() {
        let mut c = Circuit::new();
        let x = add(&mut c, "splitmerge");
        let y = add(&mut c, "splitmerge");
        let from = PortId::new(x, SplitMerge::B0);
        let to = PortId::new(y, SplitMerge::A0);
        let id = c.create_link(from, to, LinkPath::default()).unwrap();
        assert_eq!(c.link(id).unwrap().source, from);
        assert_eq!(c.port(from).unwrap().mode(), Mode::Output);
        assert_eq!(c.port(PortId::new(x, SplitMerge::A0)).unwrap().mode(), Mode::Input);
        assert_eq!(c.port(to).unwrap().mode(), Mode::Input);
        assert_eq!(c.port(PortId::new(y, SplitMerge::B0)).unwrap().mode(), Mode::Output);

        // Undo puts every port back to undecided.
        c.undo();
        assert!(c.links().next().is_none());
        for m in [x, y] {
            assert!(c.module(m).unwrap().ports().iter().all(|p| p.mode() == Mode::Bidir));
        }
    }

    #[test]
    fn test_delete_link_resets_target() {
        let mut c = Circuit::new();
        let s = add(&mut c, "switch");
        let f = add(&mut c, "fanout");
        c.set_switches(s, [false, true, true, false]).unwrap();
        let id = c
            .create_link(PortId::new(s, Switch::DATA), PortId::new(f, Fanout::INPUT), LinkPath::default())
            .unwrap();
        c.propagate(f).unwrap();
        assert_eq!(c.value(PortId::new(f, 0)), Some(Signal::from_uint(6)));

        c.delete_link(id).unwrap();
        assert_eq!(c.value(PortId::new(f, 0)), Some(Signal::from_uint(0)));
        assert_eq!(c.delete_link(id), Err(SimError::LinkNotFound(id)));
    }
}
