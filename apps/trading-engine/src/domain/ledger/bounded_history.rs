//! Fixed-capacity FIFO history.

use std::collections::VecDeque;

/// Append-only history that evicts the oldest entries past `capacity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedHistory<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedHistory<T> {
    /// Empty history. A zero capacity is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::new(),
            capacity,
        }
    }

    /// Build from stored items (oldest first), keeping the newest `capacity`.
    #[must_use]
    pub fn from_vec(items: Vec<T>, capacity: usize) -> Self {
        let mut history = Self::new(capacity);
        history.extend(items);
        history
    }

    /// Append, evicting the oldest entry when full. Returns the evicted entry.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Append many, oldest first.
    pub fn extend(&mut self, items: impl IntoIterator<Item = T>) {
        for item in items {
            self.push(item);
        }
    }

    /// Newest entry.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    /// Mutable newest entry.
    pub fn last_mut(&mut self) -> Option<&mut T> {
        self.items.back_mut()
    }

    /// Entries oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.items.iter()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries oldest first, as a `Vec`.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.items.into()
    }
}

impl<T: Clone> BoundedHistory<T> {
    /// Entries oldest first, cloned.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}
