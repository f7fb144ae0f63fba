//! Bidirectional bit splitter/merger.
//!
//! The A side has a 4-bit port (A0) and a 2-bit port (A1); the B side has
//! four ports B0-B3. All six are bidirectional: linking any of them fixes the
//! direction of the whole module, A side opposite to B side.
//!
//! Wiring, A to B:
//!
//! | A bit | B bit |
//! |-------|-------|
//! | A0.0 | B0.0 |
//! | A0.1 | B0.1, B1.0 |
//! | A0.2, A1.0 | B2.0 |
//! | A0.3, A1.1 | B2.1, B3.0 |
//!
//! Where two A bits drive one B bit, a defined A1 bit overrides A0. Going
//! B to A, bits landing on one wire are combined with [`Bit::merge`].
//!
//! Only one A port may be driven: once A0 or A1 holds an incoming link, the
//! other refuses new links.

use crate::module::Behavior;
use crate::port::{Mode, Port, PortKind, Side};
use crate::signal::Bit;

/// Bit splitter/merger with bidirectional ports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SplitMerge;

impl SplitMerge {
    /// 4-bit A port index.
    pub const A0: usize = 0;
    /// 2-bit A port index.
    pub const A1: usize = 1;
    /// First B port index; B1-B3 follow.
    pub const B0: usize = 2;
}

impl Behavior for SplitMerge {
    fn name(&self) -> &'static str {
        "splitmerge"
    }

    fn ports(&self) -> Vec<Port> {
        vec![
            Port::bidir("4-Bit Port A0", PortKind::Generic, Side::Input),
            Port::bidir("2-Bit Port A1", PortKind::Generic, Side::Input),
            Port::bidir("Port B0", PortKind::Generic, Side::Output),
            Port::bidir("Port B1", PortKind::Generic, Side::Output),
            Port::bidir("Port B2", PortKind::Generic, Side::Output),
            Port::bidir("Port B3", PortKind::Generic, Side::Output),
        ]
    }

    fn propagate(&mut self, ports: &mut [Port]) {
        let mut a0 = ports[Self::A0].value();
        let mut a1 = ports[Self::A1].value();
        let [mut b0, mut b1, mut b2, mut b3] =
            [0, 1, 2, 3].map(|i| ports[Self::B0 + i].value());

        let a_updated = ports[Self::A0].was_updated() || ports[Self::A1].was_updated();
        let b_updated = ports[Self::B0..].iter().any(Port::was_updated);

        if a_updated {
            if ports[Self::A0].is_connected() && ports[Self::A1].is_connected() {
                #[cfg(feature = "tracing")]
                tracing::warn!("split/merge driven from both A ports; ignoring update");
                return;
            }
            b0.set_bit(0, a0.bit(0));
            b1.set_bit(0, a0.bit(1));
            b0.set_bit(1, a0.bit(1));

            b3.set_bit(0, a0.bit(3));
            b3.resolve_bit(0, a1.bit(1));

            b2.set_bit(0, a0.bit(2));
            b2.resolve_bit(0, a1.bit(0));

            b2.set_bit(1, a0.bit(3));
            b2.resolve_bit(1, a1.bit(1));
        } else if b_updated {
            a0.set_bit(0, b0.bit(0));
            a0.set_bit(2, b2.bit(0));
            a1.set_bit(0, b2.bit(0));

            let high = Bit::merge(b2.bit(1), b3.bit(0));
            a1.set_bit(1, high);
            a0.set_bit(3, high);

            a0.set_bit(1, Bit::merge(b0.bit(1), b1.bit(0)));
        }

        ports[Self::A0].set_value(a0);
        ports[Self::A1].set_value(a1);
        for (i, v) in [b0, b1, b2, b3].into_iter().enumerate() {
            ports[Self::B0 + i].set_value(v);
        }
    }

    fn accepts_link(&self, ports: &[Port], index: usize) -> bool {
        let other = match index {
            Self::A0 => Self::A1,
            Self::A1 => Self::A0,
            _ => return true,
        };
        let p = &ports[other];
        p.link().is_none() || p.mode() != Mode::Input
    }

    fn affected(&self, _ports: &[Port], input: usize) -> Vec<usize> {
        if input == Self::A0 || input == Self::A1 {
            (Self::B0..Self::B0 + 4).collect()
        } else {
            vec![Self::A0, Self::A1]
        }
    }
}
