//! Links between ports.
//!
//! A [`Link`] joins an output-capable source port to an input-capable target
//! port on a different module. Direction is resolved when the link is created
//! (see [`Circuit::create_link`](crate::Circuit::create_link)); the stored
//! `source`/`target` are always in signal-flow order.

use crate::port::PortId;

/// Unique identifier for a link.
///
/// Link IDs are assigned sequentially and never reused within a circuit,
/// so a restored link keeps its ID across undo and redo.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub(crate) u32);

impl LinkId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LinkId({})", self.0)
    }
}

/// Cosmetic routing of a link: control points from source to target.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinkPath {
    /// Control points in drawing order.
    pub points: Vec<(f64, f64)>,
}

impl LinkPath {
    /// A path through the given points.
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    /// Flips the drawing order.
    pub fn reverse(&mut self) {
        self.points.reverse();
    }
}

/// A directed connection from `source` to `target`.
#[derive(Clone, Debug, PartialEq)]
pub struct Link {
    /// Identifier.
    pub id: LinkId,
    /// Driving port.
    pub source: PortId,
    /// Driven port.
    pub target: PortId,
    /// Cosmetic path, oriented source to target.
    pub path: LinkPath,
}

impl Link {
    /// The port at the other end from `port`, if `port` is an end of this link.
    pub fn other_end(&self, port: PortId) -> Option<PortId> {
        if port == self.source {
            Some(self.target)
        } else if port == self.target {
            Some(self.source)
        } else {
            None
        }
    }
}

/// Fixed-size bitset over link IDs, used as the per-path visited set of the
/// propagation worklist.
#[derive(Clone, Debug, Default)]
pub(crate) struct LinkSet {
    words: Vec<u64>,
}

impl LinkSet {
    pub(crate) fn contains(&self, id: LinkId) -> bool {
        let i = id.0 as usize;
        self.words.get(i / 64).is_some_and(|w| w & (1 << (i % 64)) != 0)
    }

    pub(crate) fn insert(&mut self, id: LinkId) {
        let i = id.0 as usize;
        if self.words.len() <= i / 64 {
            self.words.resize(i / 64 + 1, 0);
        }
        self.words[i / 64] |= 1 << (i % 64);
    }
}
