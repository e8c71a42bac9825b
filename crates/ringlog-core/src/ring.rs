//! Fixed-capacity ring buffer with stable, wrap-aware handles.
//!
//! A [`Ring`] is a bounded FIFO of parsed lines. Pushing past capacity
//! overwrites the oldest entry. Unlike a plain circular `Vec`, positions are
//! referenced by [`Handle`] rather than raw index: a handle carries the
//! epoch (push sequence number) its slot held at creation time, so a caller
//! holding a handle to a slot that has since been overwritten by wrap gets
//! `None` back instead of silently reading stale or foreign data.

use serde::{Deserialize, Serialize};

/// A stable reference to a [`Ring`] slot.
///
/// Handles are never dangling: once the slot they point to is overwritten
/// by a subsequent wrap, every `Ring` method that accepts a handle treats it
/// as invalid and returns `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle {
    index: usize,
    epoch: u64,
}

/// Bounded circular store of parsed lines, the core history buffer.
///
/// `push` is O(1); `get`/`prev`/`next` are O(1). No allocation occurs after
/// construction.
pub struct Ring<T> {
    slots: Vec<Option<T>>,
    epochs: Vec<u64>,
    capacity: usize,
    head: usize,
    count: usize,
    total: u64,
}

impl<T> Ring<T> {
    /// Create a new ring with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0. A history of zero lines is not a useful
    /// ring; callers that want "no history" should not construct one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be > 0");
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            epochs: vec![0; capacity],
            capacity,
            head: 0,
            count: 0,
            total: 0,
        }
    }

    /// Push a value, overwriting the oldest slot if the ring is full.
    /// Returns a handle identifying the slot the value now occupies.
    pub fn push(&mut self, value: T) -> Handle {
        let idx = self.head;
        self.slots[idx] = Some(value);
        self.total += 1;
        self.epochs[idx] = self.total;
        self.head = (self.head + 1) % self.capacity;
        if self.count < self.capacity {
            self.count += 1;
        }
        Handle {
            index: idx,
            epoch: self.total,
        }
    }

    /// Handle of the most recently pushed slot.
    #[must_use]
    pub fn newest(&self) -> Option<Handle> {
        if self.count == 0 {
            return None;
        }
        let idx = (self.head + self.capacity - 1) % self.capacity;
        Some(Handle {
            index: idx,
            epoch: self.epochs[idx],
        })
    }

    /// Handle of the logically oldest occupied slot.
    #[must_use]
    pub fn oldest(&self) -> Option<Handle> {
        if self.count == 0 {
            return None;
        }
        let idx = if self.count < self.capacity {
            0
        } else {
            self.head
        };
        Some(Handle {
            index: idx,
            epoch: self.epochs[idx],
        })
    }

    /// The handle one slot older than `h`, or `None` at the oldest entry or
    /// if `h` has been invalidated by wrap.
    #[must_use]
    pub fn prev(&self, h: Handle) -> Option<Handle> {
        if !self.is_valid(h) {
            return None;
        }
        let idx = (h.index + self.capacity - 1) % self.capacity;
        let epoch = self.epochs[idx];
        if epoch == 0 || epoch >= h.epoch {
            return None;
        }
        let cand = Handle { index: idx, epoch };
        self.is_valid(cand).then_some(cand)
    }

    /// The handle one slot newer than `h`, or `None` at the newest entry or
    /// if `h` has been invalidated by wrap.
    #[must_use]
    pub fn next(&self, h: Handle) -> Option<Handle> {
        if !self.is_valid(h) {
            return None;
        }
        let idx = (h.index + 1) % self.capacity;
        let epoch = self.epochs[idx];
        if epoch == 0 || epoch <= h.epoch {
            return None;
        }
        let cand = Handle { index: idx, epoch };
        self.is_valid(cand).then_some(cand)
    }

    /// The value at `h`, or `None` if the slot has since been overwritten.
    #[must_use]
    pub fn get(&self, h: Handle) -> Option<&T> {
        if self.is_valid(h) {
            self.slots[h.index].as_ref()
        } else {
            None
        }
    }

    /// Mutable access to the value at `h`, or `None` if since overwritten.
    ///
    /// Used by the filter pass, which attaches marks to the line in place.
    pub fn get_mut(&mut self, h: Handle) -> Option<&mut T> {
        if self.is_valid(h) {
            self.slots[h.index].as_mut()
        } else {
            None
        }
    }

    fn is_valid(&self, h: Handle) -> bool {
        h.index < self.capacity
            && h.epoch != 0
            && self.epochs[h.index] == h.epoch
            && h.epoch > self.total.saturating_sub(self.capacity as u64)
    }

    /// Whether two handles refer to the same logical slot at the same epoch.
    #[must_use]
    pub fn same(a: Handle, b: Handle) -> bool {
        a == b
    }

    /// Whether two handles reference the same underlying slot, regardless
    /// of epoch. Used to detect that a fresh push landed in the slot an
    /// older (now-stale) handle used to occupy.
    #[must_use]
    pub fn same_slot(a: Handle, b: Handle) -> bool {
        a.index == b.index
    }

    /// Monotone count of pushes ever performed (never decreases except on
    /// `clear`).
    #[must_use]
    pub fn lines_total(&self) -> u64 {
        self.total
    }

    /// Current number of occupied slots (`<= capacity`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every value and reset counters.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        for epoch in &mut self.epochs {
            *epoch = 0;
        }
        self.head = 0;
        self.count = 0;
        self.total = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ring_is_empty() {
        let r: Ring<i32> = Ring::new(4);
        assert!(r.is_empty());
        assert_eq!(r.len(), 0);
        assert_eq!(r.newest(), None);
        assert_eq!(r.oldest(), None);
    }

    #[test]
    #[should_panic(expected = "ring capacity must be > 0")]
    fn zero_capacity_panics() {
        let _r: Ring<i32> = Ring::new(0);
    }

    #[test]
    fn push_before_wrap_keeps_all() {
        let mut r = Ring::new(5);
        for i in 0..3 {
            r.push(i);
        }
        assert_eq!(r.len(), 3);
        assert_eq!(r.get(r.oldest().unwrap()), Some(&0));
        assert_eq!(r.get(r.newest().unwrap()), Some(&2));
    }

    #[test]
    fn push_wraps_and_keeps_last_capacity() {
        let mut r = Ring::new(3);
        for i in 0..100 {
            r.push(i);
        }
        assert_eq!(r.len(), 3);
        assert_eq!(r.get(r.oldest().unwrap()), Some(&97));
        assert_eq!(r.get(r.newest().unwrap()), Some(&99));
    }

    #[test]
    fn walk_oldest_to_newest() {
        let mut r = Ring::new(4);
        for i in 0..4 {
            r.push(i);
        }
        let mut h = r.oldest();
        let mut seen = Vec::new();
        while let Some(cur) = h {
            seen.push(*r.get(cur).unwrap());
            h = r.next(cur);
        }
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn walk_newest_to_oldest() {
        let mut r = Ring::new(4);
        for i in 0..4 {
            r.push(i);
        }
        let mut h = r.newest();
        let mut seen = Vec::new();
        while let Some(cur) = h {
            seen.push(*r.get(cur).unwrap());
            h = r.prev(cur);
        }
        assert_eq!(seen, vec![3, 2, 1, 0]);
    }

    #[test]
    fn stale_handle_returns_none_after_wrap() {
        let mut r = Ring::new(2);
        let h0 = r.push(10);
        r.push(20);
        r.push(30); // evicts slot that h0 pointed to
        assert_eq!(r.get(h0), None);
        assert_eq!(r.prev(h0), None);
        assert_eq!(r.next(h0), None);
    }

    #[test]
    fn lines_total_is_monotone_across_wraps() {
        let mut r = Ring::new(3);
        for i in 0..10 {
            r.push(i);
        }
        assert_eq!(r.lines_total(), 10);
        assert_eq!(r.len(), 3);
    }

    #[test]
    fn clear_resets_everything() {
        let mut r = Ring::new(3);
        r.push(1);
        r.push(2);
        r.clear();
        assert!(r.is_empty());
        assert_eq!(r.lines_total(), 0);
        assert_eq!(r.newest(), None);
        r.push(42);
        assert_eq!(r.get(r.newest().unwrap()), Some(&42));
    }

    #[test]
    fn next_at_newest_is_none() {
        let mut r = Ring::new(3);
        r.push(1);
        r.push(2);
        assert_eq!(r.next(r.newest().unwrap()), None);
    }

    #[test]
    fn prev_at_oldest_is_none() {
        let mut r = Ring::new(3);
        r.push(1);
        r.push(2);
        assert_eq!(r.prev(r.oldest().unwrap()), None);
    }

    #[test]
    fn capacity_one_always_holds_latest() {
        let mut r = Ring::new(1);
        r.push(1);
        r.push(2);
        r.push(3);
        assert_eq!(r.len(), 1);
        assert_eq!(r.get(r.newest().unwrap()), Some(&3));
    }

    // Property from spec §8.1: for any sequence of L pushes, the ring holds
    // min(L, C) values, being the last min(L, C) pushed, in order.
    #[test]
    fn bounded_capacity_property() {
        for capacity in [1usize, 2, 3, 7, 16] {
            for total_pushes in [0usize, 1, capacity, capacity + 1, capacity * 5 + 3] {
                let mut r = Ring::new(capacity);
                for i in 0..total_pushes {
                    r.push(i as i64);
                }
                let expected_len = total_pushes.min(capacity);
                assert_eq!(r.len(), expected_len);

                let mut seen = Vec::new();
                let mut h = r.oldest();
                while let Some(cur) = h {
                    seen.push(*r.get(cur).unwrap());
                    h = r.next(cur);
                }
                let expected: Vec<i64> = ((total_pushes.saturating_sub(expected_len))
                    ..total_pushes)
                    .map(|i| i as i64)
                    .collect();
                assert_eq!(seen, expected, "capacity={capacity} pushes={total_pushes}");
            }
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Spec §8.1, generalized over arbitrary capacity and push counts:
            /// after any sequence of pushes the ring holds exactly
            /// `min(len, capacity)` values, being the last that many pushed,
            /// oldest to newest.
            #[test]
            fn bounded_capacity_holds_for_any_sequence(
                capacity in 1usize..32,
                values in proptest::collection::vec(any::<i64>(), 0..200),
            ) {
                let mut r = Ring::new(capacity);
                for &v in &values {
                    r.push(v);
                }
                let expected_len = values.len().min(capacity);
                prop_assert_eq!(r.len(), expected_len);

                let mut seen = Vec::new();
                let mut h = r.oldest();
                while let Some(cur) = h {
                    seen.push(*r.get(cur).unwrap());
                    h = r.next(cur);
                }
                let expected = &values[values.len() - expected_len..];
                prop_assert_eq!(&seen, expected);
            }

            /// A handle is never returned valid once its slot has been
            /// overwritten by wrap: `get` on a stale handle is always `None`.
            #[test]
            fn stale_handles_never_resurface(
                capacity in 1usize..16,
                extra_pushes in 1usize..64,
            ) {
                let mut r = Ring::new(capacity);
                let h0 = r.push(0i64);
                for i in 1..=extra_pushes {
                    r.push(i as i64);
                }
                if extra_pushes >= capacity {
                    prop_assert_eq!(r.get(h0), None);
                } else {
                    prop_assert_eq!(r.get(h0), Some(&0));
                }
            }
        }
    }
}
