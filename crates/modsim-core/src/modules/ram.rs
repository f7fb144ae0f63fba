//! 64K x 8 memory.
//!
//! Each of the 0x10000 addresses holds two nibbles, A (low) and B (high). The
//! address is built from four 4-bit address inputs, A lowest. Control bit 2
//! selects write mode: the data outputs float (undefined) and, while control
//! bit 0 is high and the write jumper is fitted, the data inputs are stored.
//! Otherwise the addressed nibbles are driven onto the outputs.
//!
//! Persistent form (`memory_store`): whitespace-separated runs of
//! `AAAA:HHHH...`, a 4-digit hex start address followed by two hex digits per
//! address (`B` then `A`). Zero cells are not written.

use std::fmt::Write as _;

use crate::error::SimError;
use crate::module::{Behavior, DataMap};
use crate::port::{Port, PortKind};
use crate::signal::Signal;

const STORE_KEY: &str = "memory_store";
const JUMPER_KEY: &str = "write_jumper";

const CLOCK_PIN: usize = 0;
const WRITE_PIN: usize = 2;

/// 64K x 8 RAM.
#[derive(Clone, Debug)]
pub struct Ram {
    store: Vec<Signal>,
    write_jumper: bool,
}

impl Default for Ram {
    fn default() -> Self {
        Self {
            store: vec![Signal::from_uint(0); Self::LOCATIONS],
            write_jumper: true,
        }
    }
}

impl Ram {
    /// Highest valid address.
    pub const MAX_ADDR: u32 = 0xFFFF;
    const LOCATIONS: usize = 0x20000;

    /// High data input index.
    pub const DATA_IN_B: usize = 0;
    /// Low data input index.
    pub const DATA_IN_A: usize = 1;
    /// Control input index.
    pub const CONTROL_IN: usize = 2;
    /// Lowest address input index; the other three follow.
    pub const ADDR_A: usize = 3;
    /// High data output index.
    pub const DATA_OUT_B: usize = 7;
    /// Low data output index.
    pub const DATA_OUT_A: usize = 8;
    /// Control output index.
    pub const CONTROL_OUT: usize = 9;

    /// `true` if writes are enabled.
    pub fn write_jumper(&self) -> bool {
        self.write_jumper
    }

    /// Fits or removes the write jumper.
    pub fn set_write_jumper(&mut self, on: bool) {
        self.write_jumper = on;
    }

    /// Zeroes every cell.
    pub fn clear(&mut self) {
        self.store.fill(Signal::from_uint(0));
    }

    /// Stores `a` (low) and `b` (high) at `address`.
    pub fn write(&mut self, address: u32, a: Signal, b: Signal) {
        if address > Self::MAX_ADDR {
            #[cfg(feature = "tracing")]
            tracing::warn!("ram write out of range: {address:#x}");
            return;
        }
        let slot = (address as usize) << 1;
        self.store[slot] = a;
        self.store[slot | 1] = b;
    }

    /// The `(a, b)` nibbles at `address`. Out of range reads are undefined.
    pub fn read(&self, address: u32) -> (Signal, Signal) {
        if address > Self::MAX_ADDR {
            #[cfg(feature = "tracing")]
            tracing::warn!("ram read out of range: {address:#x}");
            return (Signal::undefined(), Signal::undefined());
        }
        let slot = (address as usize) << 1;
        (self.store[slot], self.store[slot | 1])
    }

    fn byte_at(&self, address: usize) -> u8 {
        let a = self.store[address << 1].to_uint() as u8;
        let b = self.store[address << 1 | 1].to_uint() as u8;
        b << 4 | a
    }

    fn address(ports: &[Port]) -> u32 {
        (0..4).fold(0, |acc, i| acc | ports[Self::ADDR_A + i].value().to_uint() << (4 * i))
    }

    fn parse_store(&mut self, raw: &str) -> Result<(), SimError> {
        let bad = || SimError::bad_data(STORE_KEY, raw);
        for run in raw.split_whitespace() {
            let (start, bytes) = run.split_once(':').ok_or_else(bad)?;
            let start = u32::from_str_radix(start, 16).map_err(|_| bad())?;
            if bytes.len() % 2 != 0 || !bytes.is_ascii() {
                return Err(bad());
            }
            for (offset, pair) in bytes.as_bytes().chunks(2).enumerate() {
                let text = std::str::from_utf8(pair).map_err(|_| bad())?;
                let byte = u8::from_str_radix(text, 16).map_err(|_| bad())?;
                let address = start + offset as u32;
                if address > Self::MAX_ADDR {
                    return Err(bad());
                }
                self.write(
                    address,
                    Signal::from_uint(u32::from(byte & 0xF)),
                    Signal::from_uint(u32::from(byte >> 4)),
                );
            }
        }
        Ok(())
    }

    fn format_store(&self) -> String {
        let mut out = String::new();
        let mut addr = 0;
        let top = Self::MAX_ADDR as usize;
        while addr <= top {
            if self.byte_at(addr) == 0 {
                addr += 1;
                continue;
            }
            if !out.is_empty() {
                out.push(' ');
            }
            let _ = write!(out, "{addr:04X}:");
            while addr <= top && self.byte_at(addr) != 0 {
                let _ = write!(out, "{:02X}", self.byte_at(addr));
                addr += 1;
            }
        }
        out
    }
}

impl Behavior for Ram {
    fn name(&self) -> &'static str {
        "ram"
    }

    fn ports(&self) -> Vec<Port> {
        vec![
            Port::input("Data in B", PortKind::Data),
            Port::input("Data in A", PortKind::Data),
            Port::input("Control in", PortKind::Clock),
            Port::input("Address in A", PortKind::Control),
            Port::input("Address in B", PortKind::Control),
            Port::input("Address in C", PortKind::Control),
            Port::input("Address in D", PortKind::Control),
            Port::output("Data out B", PortKind::Data),
            Port::output("Data out A", PortKind::Data),
            Port::output("Control out", PortKind::Clock),
        ]
    }

    fn propagate(&mut self, ports: &mut [Port]) {
        let address = Self::address(ports);
        let control = ports[Self::CONTROL_IN].value();
        ports[Self::CONTROL_OUT].set_value(control);

        if control.is_high(WRITE_PIN) {
            ports[Self::DATA_OUT_A].set_value(Signal::undefined());
            ports[Self::DATA_OUT_B].set_value(Signal::undefined());
            if control.is_high(CLOCK_PIN) && self.write_jumper {
                let a = ports[Self::DATA_IN_A].value();
                let b = ports[Self::DATA_IN_B].value();
                self.write(address, a, b);
            }
        } else {
            let (a, b) = self.read(address);
            ports[Self::DATA_OUT_A].set_value(a);
            ports[Self::DATA_OUT_B].set_value(b);
        }
    }

    fn affected(&self, _ports: &[Port], input: usize) -> Vec<usize> {
        match input {
            Self::CONTROL_IN => vec![Self::DATA_OUT_A, Self::DATA_OUT_B, Self::CONTROL_OUT],
            i if (Self::ADDR_A..Self::ADDR_A + 4).contains(&i) => {
                vec![Self::DATA_OUT_A, Self::DATA_OUT_B]
            }
            _ => Vec::new(),
        }
    }

    fn is_cycle_breaking(&self) -> bool {
        true
    }

    fn data_in(&mut self, data: &DataMap) -> Result<(), SimError> {
        if let Some(raw) = data.get(STORE_KEY) {
            self.parse_store(raw)?;
        }
        self.write_jumper = match data.get(JUMPER_KEY).map(String::as_str) {
            None | Some("1") => true,
            Some("0") => false,
            Some(other) => return Err(SimError::bad_data(JUMPER_KEY, other)),
        };
        Ok(())
    }

    fn data_out(&self, data: &mut DataMap) {
        let store = self.format_store();
        if !store.is_empty() {
            data.insert(STORE_KEY.to_string(), store);
        }
        let jumper = if self.write_jumper { "1" } else { "0" };
        data.insert(JUMPER_KEY.to_string(), jumper.to_string());
    }
}
