//! Undo/redo history.
//!
//! [`OperationStack`] is a fixed-capacity ring buffer of reversible
//! operations. It keeps three cursors over `capacity + 1` slots:
//!
//! ```text
//!  tail            head         future_head
//!   |  undo entries  |  redo entries  |
//! ```
//!
//! Pushing drops the redo entries; pushing onto a full stack evicts the oldest
//! entry. Operations pushed between [`begin_compound`](OperationStack::begin_compound)
//! and the matching [`end_compound`](OperationStack::end_compound) are
//! collected into one entry that undoes in reverse order. Compounds nest; only
//! the outermost end commits.
//!
//! Operations replay against a context `C` passed in by the caller. They hold
//! no reference back to the stack, so replaying can never push.

#[cfg(feature = "tracing")]
use tracing::warn;

/// Default number of undo entries kept.
pub const MAX_HISTORY: usize = 500;

/// A reversible edit over context `C`.
pub trait Operation<C> {
    /// Reverts the edit.
    fn undo(&mut self, ctx: &mut C);
    /// Re-applies the edit.
    fn redo(&mut self, ctx: &mut C);
}

#[derive(Debug)]
enum Entry<O> {
    Single(O),
    Compound(Vec<O>),
}

impl<O> Entry<O> {
    fn undo<C>(&mut self, ctx: &mut C)
    where
        O: Operation<C>,
    {
        match self {
            Entry::Single(op) => op.undo(ctx),
            Entry::Compound(ops) => {
                for op in ops.iter_mut().rev() {
                    op.undo(ctx);
                }
            }
        }
    }

    fn redo<C>(&mut self, ctx: &mut C)
    where
        O: Operation<C>,
    {
        match self {
            Entry::Single(op) => op.redo(ctx),
            Entry::Compound(ops) => {
                for op in ops.iter_mut() {
                    op.redo(ctx);
                }
            }
        }
    }
}

/// Ring buffer of undoable operations with nested compound support.
#[derive(Debug)]
pub struct OperationStack<O> {
    slots: Vec<Option<Entry<O>>>,
    capacity: usize,
    tail: usize,
    head: usize,
    future_head: usize,
    compound: Option<Vec<O>>,
    depth: usize,
    modified: bool,
}

impl<O> Default for OperationStack<O> {
    fn default() -> Self {
        Self::new(MAX_HISTORY)
    }
}

impl<O> OperationStack<O> {
    /// An empty stack holding at most `capacity` undo entries.
    ///
    /// A zero-capacity stack records nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            capacity,
            tail: 0,
            head: 0,
            future_head: 0,
            compound: None,
            depth: 0,
            modified: false,
        }
    }

    /// Maximum number of undo entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn ring(&self) -> usize {
        self.capacity + 1
    }

    fn next(&self, i: usize) -> usize {
        (i + 1) % self.ring()
    }

    fn prev(&self, i: usize) -> usize {
        (i + self.ring() - 1) % self.ring()
    }

    /// Number of entries that can be undone.
    pub fn len(&self) -> usize {
        (self.head + self.ring() - self.tail) % self.ring()
    }

    /// `true` if there is nothing to undo.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries that can be redone.
    pub fn redo_len(&self) -> usize {
        (self.future_head + self.ring() - self.head) % self.ring()
    }

    /// `true` if [`undo`](Self::undo) would revert something.
    pub fn can_undo(&self) -> bool {
        self.head != self.tail
    }

    /// `true` if [`redo`](Self::redo) would re-apply something.
    pub fn can_redo(&self) -> bool {
        self.head != self.future_head
    }

    /// `true` if anything was pushed since the last reset.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Clears the modified flag, e.g. after saving.
    pub fn reset_modified(&mut self) {
        self.modified = false;
    }

    /// `true` while a compound operation is collecting entries.
    pub fn in_compound(&self) -> bool {
        self.compound.is_some()
    }

    /// Current compound nesting depth.
    pub fn compound_depth(&self) -> usize {
        self.depth
    }

    /// Records a completed operation.
    ///
    /// Inside a compound the operation joins it. Otherwise the redo entries
    /// are dropped and, if the stack is full, the oldest entry is evicted.
    pub fn push(&mut self, op: O) {
        if self.capacity == 0 {
            return;
        }
        match self.compound.as_mut() {
            Some(ops) => ops.push(op),
            None => self.push_entry(Entry::Single(op)),
        }
    }

    fn push_entry(&mut self, entry: Entry<O>) {
        if self.capacity == 0 {
            return;
        }
        if self.slots.is_empty() {
            self.slots = (0..self.ring()).map(|_| None).collect();
        }
        while self.future_head != self.head {
            self.future_head = self.prev(self.future_head);
            self.slots[self.future_head] = None;
        }
        if self.len() == self.capacity {
            self.slots[self.tail] = None;
            self.tail = self.next(self.tail);
        }
        self.slots[self.head] = Some(entry);
        self.head = self.next(self.head);
        self.future_head = self.head;
        self.modified = true;
    }

    /// Reverts the most recent entry. Returns `true` if anything was undone.
    ///
    /// An open compound is cancelled instead.
    pub fn undo<C>(&mut self, ctx: &mut C) -> bool
    where
        O: Operation<C>,
    {
        if self.compound.is_some() {
            #[cfg(feature = "tracing")]
            warn!("undo during a compound operation; cancelling it");
            self.cancel_compound(ctx);
            return false;
        }
        if self.head == self.tail {
            return false;
        }
        self.head = self.prev(self.head);
        if let Some(entry) = self.slots[self.head].as_mut() {
            entry.undo(ctx);
        }
        true
    }

    /// Re-applies the most recently undone entry. Returns `true` if anything
    /// was redone.
    ///
    /// An open compound is cancelled instead.
    pub fn redo<C>(&mut self, ctx: &mut C) -> bool
    where
        O: Operation<C>,
    {
        if self.compound.is_some() {
            #[cfg(feature = "tracing")]
            warn!("redo during a compound operation; cancelling it");
            self.cancel_compound(ctx);
            return false;
        }
        if self.head == self.future_head {
            return false;
        }
        if let Some(entry) = self.slots[self.head].as_mut() {
            entry.redo(ctx);
        }
        self.head = self.next(self.head);
        true
    }

    /// Opens a compound operation, or nests inside the open one.
    ///
    /// Depth left over from a cancelled compound is dropped.
    pub fn begin_compound(&mut self) {
        if self.compound.is_none() {
            self.compound = Some(Vec::new());
            self.depth = 1;
        } else {
            self.depth += 1;
        }
    }

    /// Closes one level of compound. The outermost close commits the
    /// collected operations as one entry; an empty compound is discarded.
    ///
    /// After a cancel this only unwinds the depth.
    pub fn end_compound(&mut self) {
        if self.depth == 0 {
            #[cfg(feature = "tracing")]
            warn!("end_compound without begin_compound");
            return;
        }
        self.depth -= 1;
        if self.depth == 0
            && let Some(ops) = self.compound.take()
            && !ops.is_empty()
        {
            self.push_entry(Entry::Compound(ops));
        }
    }

    /// Undoes and discards everything collected by the open compound, and
    /// closes one level of nesting in place of `end_compound`.
    ///
    /// Cancelling a nested compound discards the enclosing one as well.
    pub fn cancel_compound<C>(&mut self, ctx: &mut C)
    where
        O: Operation<C>,
    {
        let Some(mut ops) = self.compound.take() else {
            #[cfg(feature = "tracing")]
            warn!("cancel_compound without an open compound");
            return;
        };
        for op in ops.iter_mut().rev() {
            op.undo(ctx);
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Drops every entry and any open compound.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.tail = 0;
        self.head = 0;
        self.future_head = 0;
        self.compound = None;
        self.depth = 0;
        self.modified = false;
    }
}
