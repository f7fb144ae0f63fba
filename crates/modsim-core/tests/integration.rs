//! Integration tests for modsim-core.
//!
//! Builds small circuits through the public API and checks values end to end:
//! clocked feedback through registers, reconverging fan-out, RAM write/read,
//! bidirectional routing and whole-session undo/redo.

use modsim_core::modules::{AddSub, Clock, Fanout, LogicUnit, Ram, Register, SplitMerge, Switch};
use modsim_core::{Circuit, LinkPath, Mode, Module, ModuleId, PortId, Signal};

fn add(c: &mut Circuit, name: &str) -> ModuleId {
    c.add_module(Module::from_name(name).unwrap())
}

fn link(c: &mut Circuit, from: (ModuleId, usize), to: (ModuleId, usize)) {
    c.create_link(PortId::new(from.0, from.1), PortId::new(to.0, to.1), LinkPath::default())
        .unwrap();
}

fn nibble(n: u32) -> [bool; 4] {
    [n & 8 != 0, n & 4 != 0, n & 2 != 0, n & 1 != 0]
}

// ============================================================================
// 1. Clocked feedback
// ============================================================================

/// Two registers on opposite clock phases around an adder form a counter.
#[test]
fn two_phase_counter_counts() {
    let mut c = Circuit::new();
    let clk = add(&mut c, "clock");
    let one = add(&mut c, "switch");
    let adder = add(&mut c, "addsub");
    let r1 = add(&mut c, "register");
    let r2 = add(&mut c, "register");

    link(&mut c, (clk, Clock::PHASE_1), (r1, Register::CONTROL_IN));
    link(&mut c, (clk, Clock::PHASE_2), (r2, Register::CONTROL_IN));
    link(&mut c, (one, Switch::DATA), (adder, AddSub::B));
    link(&mut c, (r2, Register::DATA_OUT), (adder, AddSub::A));
    link(&mut c, (adder, AddSub::RESULT), (r1, Register::DATA_IN));
    link(&mut c, (r1, Register::DATA_OUT), (r2, Register::DATA_IN));
    c.set_switches(one, nibble(1)).unwrap();

    for _ in 0..4 * 5 {
        c.step().unwrap();
    }
    assert!(c.errored_modules().is_empty());
    assert_eq!(c.value(PortId::new(r2, Register::DATA_OUT)), Some(Signal::from_uint(5)));
    assert_eq!(c.value(PortId::new(adder, AddSub::RESULT)), Some(Signal::from_uint(6)));

    // Wraps at 16.
    for _ in 0..4 * 11 {
        c.step().unwrap();
    }
    assert_eq!(c.value(PortId::new(r2, Register::DATA_OUT)), Some(Signal::from_uint(0)));
}

#[test]
fn clock_reset_clears_register() {
    let mut c = Circuit::new();
    let clk = add(&mut c, "clock");
    let r = add(&mut c, "register");
    link(&mut c, (clk, Clock::PHASE_1), (r, Register::CONTROL_IN));
    c.set_register(r, Signal::from_uint(9)).unwrap();
    assert_eq!(c.value(PortId::new(r, Register::DATA_OUT)), Some(Signal::from_uint(9)));

    c.set_clock_reset(clk, true).unwrap();
    assert_eq!(c.value(PortId::new(r, Register::DATA_OUT)), Some(Signal::from_uint(0)));
}

// ============================================================================
// 2. Combinational paths
// ============================================================================

/// One source reaching a module along two paths is not a loop.
#[test]
fn reconverging_fanout_is_not_a_loop() {
    let mut c = Circuit::new();
    let s = add(&mut c, "switch");
    let f = add(&mut c, "fanout");
    let unit = add(&mut c, "logic");
    let fn_sel = add(&mut c, "switch");
    link(&mut c, (s, Switch::DATA), (f, Fanout::INPUT));
    link(&mut c, (f, 0), (unit, LogicUnit::A));
    link(&mut c, (f, 1), (unit, LogicUnit::B));
    link(&mut c, (fn_sel, Switch::DATA), (unit, LogicUnit::CONTROL_IN));

    c.set_switches(fn_sel, nibble(3)).unwrap();
    c.set_switches(s, nibble(0b0101)).unwrap();
    // A XOR A
    assert_eq!(c.value(PortId::new(unit, LogicUnit::RESULT)), Some(Signal::from_uint(0)));

    c.set_switches(fn_sel, nibble(0)).unwrap();
    // NOT A
    assert_eq!(c.value(PortId::new(unit, LogicUnit::RESULT)), Some(Signal::from_uint(0b1010)));
    assert!(c.errored_modules().is_empty());
}

#[test]
fn ram_write_then_read() {
    let mut c = Circuit::new();
    let addr = add(&mut c, "switch");
    let data = add(&mut c, "switch");
    let ctl = add(&mut c, "switch");
    let ram = add(&mut c, "ram");
    link(&mut c, (addr, Switch::DATA), (ram, Ram::ADDR_A));
    link(&mut c, (data, Switch::DATA), (ram, Ram::DATA_IN_A));
    link(&mut c, (ctl, Switch::DATA), (ram, Ram::CONTROL_IN));

    c.set_switches(addr, nibble(3)).unwrap();
    c.set_switches(data, nibble(7)).unwrap();
    // write + clock
    c.set_switches(ctl, nibble(0b0101)).unwrap();
    assert_eq!(c.value(PortId::new(ram, Ram::DATA_OUT_A)), Some(Signal::undefined()));

    c.set_switches(ctl, nibble(0)).unwrap();
    assert_eq!(c.value(PortId::new(ram, Ram::DATA_OUT_A)), Some(Signal::from_uint(7)));
    assert_eq!(c.value(PortId::new(ram, Ram::DATA_OUT_B)), Some(Signal::from_uint(0)));

    c.set_switches(addr, nibble(4)).unwrap();
    assert_eq!(c.value(PortId::new(ram, Ram::DATA_OUT_A)), Some(Signal::from_uint(0)));

    let saved = c.module_data(ram).unwrap();
    assert!(saved.contains_key("memory_store"));
}

#[test]
fn split_merge_routes_bits() {
    let mut c = Circuit::new();
    let s = add(&mut c, "switch");
    let sm = add(&mut c, "splitmerge");
    let f = add(&mut c, "fanout");
    link(&mut c, (s, Switch::DATA), (sm, SplitMerge::A0));
    link(&mut c, (sm, SplitMerge::B0), (f, Fanout::INPUT));
    assert_eq!(c.port(PortId::new(sm, SplitMerge::B0)).unwrap().mode(), Mode::Output);

    c.set_switches(s, nibble(0b1011)).unwrap();
    assert_eq!(c.value(PortId::new(sm, SplitMerge::B0)).unwrap().to_string(), "xx11");
    // The fanout's input pulls the undefined bits low.
    assert_eq!(c.value(PortId::new(f, 0)), Some(Signal::from_uint(0b0011)));
}

// ============================================================================
// 3. History
// ============================================================================

#[test]
fn whole_session_undo_redo() {
    let mut c = Circuit::new();
    let s = add(&mut c, "switch");
    let f = add(&mut c, "fanout");
    link(&mut c, (s, Switch::DATA), (f, Fanout::INPUT));
    c.set_switches(s, nibble(12)).unwrap();
    let out = PortId::new(f, 3);
    assert_eq!(c.value(out), Some(Signal::from_uint(12)));
    assert_eq!(c.history().len(), 4);

    while c.undo() {}
    assert_eq!(c.module_count(), 0);
    assert_eq!(c.link_count(), 0);
    assert_eq!(c.history().redo_len(), 4);

    while c.redo() {}
    assert_eq!(c.module_count(), 2);
    assert_eq!(c.link_count(), 1);
    assert_eq!(c.value(out), Some(Signal::from_uint(12)));
}

#[test]
fn remove_module_undo_restores_links() {
    let mut c = Circuit::new();
    let s = add(&mut c, "switch");
    let f = add(&mut c, "fanout");
    let g = add(&mut c, "fanout");
    link(&mut c, (s, Switch::DATA), (f, Fanout::INPUT));
    link(&mut c, (f, 0), (g, Fanout::INPUT));
    c.set_switches(s, nibble(9)).unwrap();
    assert_eq!(c.value(PortId::new(g, 2)), Some(Signal::from_uint(9)));

    c.remove_module(f).unwrap();
    assert_eq!(c.link_count(), 0);
    assert_eq!(c.value(PortId::new(g, 2)), Some(Signal::from_uint(0)));
    assert!(c.port(PortId::new(s, Switch::DATA)).unwrap().link().is_none());

    // One entry brings back the module and both links.
    assert!(c.undo());
    assert_eq!(c.link_count(), 2);
    assert_eq!(c.value(PortId::new(g, 2)), Some(Signal::from_uint(9)));
}

#[test]
fn undo_with_open_compound_cancels_it() {
    let mut c = Circuit::new();
    let s = add(&mut c, "switch");
    c.begin_compound();
    c.move_module(s, 3.0, 4.0).unwrap();
    assert!(!c.undo());
    assert_eq!(c.module(s).unwrap().position(), (0.0, 0.0));
    assert!(!c.history().in_compound());
    assert_eq!(c.history().len(), 1);
}
