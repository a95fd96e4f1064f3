use std::iter::Rev;
use std::ops::Deref;
use std::vec::Drain;

use crate::netflow_assert_simple;

/// An append-only log which is split into decision levels.
///
/// Entries pushed while at level `l` are handed back (most recent first) when synchronising to
/// a level below `l`.
#[derive(Clone, Debug)]
pub(crate) struct Trail<T> {
    current_level: usize,
    /// At index i is the position where the i-th decision level ends (exclusive) on the trail
    level_delimiter: Vec<usize>,
    entries: Vec<T>,
}

// Implemented by hand so that `T` does not have to be `Default`.
impl<T> Default for Trail<T> {
    fn default() -> Self {
        Trail {
            current_level: 0,
            level_delimiter: Vec::new(),
            entries: Vec::new(),
        }
    }
}

impl<T> Trail<T> {
    pub(crate) fn new_level(&mut self) {
        self.current_level += 1;
        self.level_delimiter.push(self.entries.len());
    }

    pub(crate) fn decision_level(&self) -> usize {
        self.current_level
    }

    /// Removes every entry pushed above `new_level`, yielding them in reverse push order.
    pub(crate) fn synchronise(&mut self, new_level: usize) -> Rev<Drain<'_, T>> {
        netflow_assert_simple!(new_level < self.current_level);

        let new_len = self.level_delimiter[new_level];

        self.current_level = new_level;
        self.level_delimiter.truncate(new_level);
        self.entries.drain(new_len..).rev()
    }

    pub(crate) fn push(&mut self, entry: T) {
        self.entries.push(entry)
    }
}

impl<T> Deref for Trail<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.entries
    }
}
