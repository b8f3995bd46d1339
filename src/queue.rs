//! Ordered working set for study sessions.
//!
//! The front entry is the one being shown. Entries can be popped or deferred
//! to a random slot near the end, which brings them back within a bounded
//! number of pops.

use std::collections::VecDeque;
use std::fmt;

use rand::Rng;

pub struct SessionQueue<T> {
    entries: VecDeque<T>,
    id: fn(&T) -> &str,
}

impl<T> SessionQueue<T> {
    pub fn new(id: fn(&T) -> &str) -> Self {
        Self {
            entries: VecDeque::new(),
            id,
        }
    }

    pub fn with_items(items: impl IntoIterator<Item = T>, id: fn(&T) -> &str) -> Self {
        Self {
            entries: items.into_iter().collect(),
            id,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current(&self) -> Option<&T> {
        self.entries.front()
    }

    pub fn current_mut(&mut self) -> Option<&mut T> {
        self.entries.front_mut()
    }

    pub fn current_id(&self) -> Option<&str> {
        self.entries.front().map(self.id)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.entries.iter().any(|e| (self.id)(e) == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn set_items(&mut self, items: impl IntoIterator<Item = T>) {
        self.entries = items.into_iter().collect();
    }

    pub fn push_back(&mut self, entry: T) {
        self.entries.push_back(entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        self.entries.retain(keep);
    }

    pub fn pop_current(&mut self) -> Option<T> {
        self.entries.pop_front()
    }

    /// Moves the front entry to a uniformly random position among the last
    /// `window` slots (the append slot included). A queue of one or zero
    /// entries is left as is.
    pub fn move_current_near_end<R: Rng + ?Sized>(&mut self, window: usize, rng: &mut R) {
        if self.entries.len() <= 1 {
            return;
        }
        let Some(entry) = self.entries.pop_front() else {
            return;
        };

        let remaining = self.entries.len();
        let span = window.max(1).min(remaining);
        let index = rng.gen_range(remaining - span..=remaining);
        self.entries.insert(index, entry);
    }

    pub fn into_vec(self) -> Vec<T> {
        self.entries.into()
    }
}

impl<T: fmt::Debug> fmt::Debug for SessionQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}
