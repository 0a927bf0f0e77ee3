use crate::jvm::Error;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_ARENA: AtomicU32 = AtomicU32::new(0);

/// Opaque label
///
/// Labels are handles into the [`Labels`] arena of the method being built, and are compared by
/// identity. Jumps may refer to a label before it is placed.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Label {
    arena: u32,
    index: usize,
}

impl fmt::Debug for Label {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("l{}", self.index))
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum LabelState {
    /// Not yet placed (but possibly already jumped to)
    Unbound,

    /// Placed exactly once
    Bound,
}

/// Generates labels and tracks which of them have been placed
///
/// Every arena has its own id, so labels from another method are rejected rather than aliasing
/// one of ours.
#[derive(Debug)]
pub struct Labels {
    id: u32,
    states: Vec<LabelState>,
}

impl Default for Labels {
    fn default() -> Labels {
        Labels::new()
    }
}

impl Labels {
    pub fn new() -> Labels {
        Labels {
            id: NEXT_ARENA.fetch_add(1, Ordering::Relaxed),
            states: vec![],
        }
    }

    /// Get a fresh unbound label
    pub fn fresh_label(&mut self) -> Label {
        let label = Label {
            arena: self.id,
            index: self.states.len(),
        };
        self.states.push(LabelState::Unbound);
        label
    }

    fn state_mut(&mut self, label: Label) -> Option<&mut LabelState> {
        if label.arena == self.id {
            self.states.get_mut(label.index)
        } else {
            None
        }
    }

    /// Mark a label as placed
    pub fn bind(&mut self, label: Label) -> Result<(), Error> {
        match self.state_mut(label) {
            None => Err(Error::ForeignLabel(label)),
            Some(LabelState::Bound) => Err(Error::DuplicateLabelBinding(label)),
            Some(state) => {
                *state = LabelState::Bound;
                log::trace!("Bound label {:?}", label);
                Ok(())
            }
        }
    }

    pub fn state(&self, label: Label) -> Option<LabelState> {
        if label.arena == self.id {
            self.states.get(label.index).copied()
        } else {
            None
        }
    }

    pub fn is_bound(&self, label: Label) -> bool {
        self.state(label) == Some(LabelState::Bound)
    }

    /// Number of labels generated so far
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
