//! Fixed-capacity circular queue of event timestamps.

/// Circular FIFO of accepted event timestamps, oldest first.
///
/// The backing slice is allocated once and never resized. Live entry `i`
/// (counting from the oldest) sits at `(head + i) % capacity`.
///
/// This type is not synchronized; [`SlidingWindowLimiter`](super::SlidingWindowLimiter)
/// keeps it behind its lock.
#[derive(Debug)]
pub(crate) struct TimestampRing {
    /// Timestamp slots in nanoseconds
    slots: Box<[i64]>,
    /// Index of the oldest live entry
    head: usize,
    /// Number of live entries
    count: usize,
}

impl TimestampRing {
    /// Create an empty ring able to hold `capacity` timestamps.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![0; capacity].into_boxed_slice(),
            head: 0,
            count: 0,
        }
    }

    /// Physical size of the ring.
    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the ring holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Whether every slot holds a live entry.
    pub fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }

    /// Append `timestamp` as the newest entry.
    ///
    /// Returns `false` and records nothing when the ring is full.
    pub fn push(&mut self, timestamp: i64) -> bool {
        if self.is_full() {
            return false;
        }
        let tail = (self.head + self.count) % self.slots.len();
        self.slots[tail] = timestamp;
        self.count += 1;
        true
    }

    /// Drop entries from the front while they are `<= bound`.
    ///
    /// Stops at the first newer entry, so the cost is proportional to the
    /// number of entries removed. Returns that number.
    pub fn purge_through(&mut self, bound: i64) -> usize {
        let mut removed = 0;
        while self.count > 0 && self.slots[self.head] <= bound {
            self.head = (self.head + 1) % self.slots.len();
            self.count -= 1;
            removed += 1;
        }
        removed
    }

    /// Forget every live entry.
    pub fn clear(&mut self) {
        self.count = 0;
    }

    /// Oldest live timestamp, if any.
    pub fn oldest(&self) -> Option<i64> {
        (self.count > 0).then(|| self.slots[self.head])
    }

    /// Iterate live timestamps from oldest to newest.
    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        let capacity = self.slots.len();
        (0..self.count).map(move |i| self.slots[(self.head + i) % capacity])
    }
}
