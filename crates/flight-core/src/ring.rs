// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! C3: bounded, indexable shared ring buffer with per-slot flags.
//!
//! The teacher's `core::rt::indexring::IndexRing` is a lock-free SPSC ring
//! sized to a power of two, built for a single producer/consumer pair. This
//! component needs arbitrary-index `peek(i)` and a flag byte per slot, which
//! a lock-free SPSC structure doesn't give cheaply, so it is generalized here
//! to a mutex-guarded `VecDeque`: same bounded-capacity/append-order contract,
//! capacity need not be a power of two, and any number of callers may peek.
use parking_lot::Mutex;
use std::collections::VecDeque;

struct Slot<T> {
    item: T,
    flags: u8,
}

struct RingInner<T> {
    slots: VecDeque<Slot<T>>,
    capacity: usize,
}

/// Bounded, indexable history of shared handles (or any `Clone` item), each
/// carrying an 8-bit flag byte.
pub struct RingBuffer<T> {
    inner: Mutex<RingInner<T>>,
}

impl<T: Clone> RingBuffer<T> {
    /// Creates a ring of bounded capacity `r`.
    pub fn new(r: usize) -> Self {
        Self {
            inner: Mutex::new(RingInner {
                slots: VecDeque::with_capacity(r),
                capacity: r,
            }),
        }
    }

    /// Bounded capacity `R`.
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Number of items currently held, in append order.
    pub fn len(&self) -> usize {
        self.inner.lock().slots.len()
    }

    /// Whether the ring currently holds no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends `item` with flags initialized to zero. Returns `false` if full.
    pub fn append(&self, item: T) -> bool {
        let mut inner = self.inner.lock();
        if inner.slots.len() == inner.capacity {
            return false;
        }
        inner.slots.push_back(Slot { item, flags: 0 });
        true
    }

    /// Returns a clone of the item at logical index `i` (0 = oldest still
    /// held). `None` if `i` is out of range.
    pub fn peek(&self, i: usize) -> Option<T> {
        let inner = self.inner.lock();
        inner.slots.get(i).map(|s| s.item.clone())
    }

    /// Returns the flag byte at logical index `i`. `None` if out of range.
    pub fn peek_flags(&self, i: usize) -> Option<u8> {
        let inner = self.inner.lock();
        inner.slots.get(i).map(|s| s.flags)
    }

    /// Sets the flag byte at logical index `i`. Returns `false` if out of range.
    pub fn set_flags(&self, i: usize, flags: u8) -> bool {
        let mut inner = self.inner.lock();
        match inner.slots.get_mut(i) {
            Some(slot) => {
                slot.flags = flags;
                true
            }
            None => false,
        }
    }

    /// Removes and returns the oldest held item (index 0). `None` if empty.
    pub fn pop(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        inner.slots.pop_front().map(|s| s.item)
    }

    /// Drops all held items immediately.
    pub fn reset(&self) {
        self.inner.lock().slots.clear();
    }

    /// Truncates the ring to its first `n` elements, releasing everything
    /// from index `n` onward.
    pub fn reset_elements_from(&self, n: usize) {
        self.inner.lock().slots.truncate(n);
    }
}
