// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! C2: bounded reference queue, including the ISR-safe send variant.
//!
//! A slot table (mutex-protected) plus an underlying queue of plain indices
//! stands in for the source's `ReferenceQueueBase<T>` wrapping
//! `outpost::rtos::Queue<size_t>`: the index queue never copies `T` itself,
//! only a `usize` slot number, so large payloads (shared handles) are moved
//! exactly once into the slot table and refcount-retained until received.
//! `crossbeam::channel` is the stand-in for the "RTOS queue of integer
//! indices" collaborator (§6).
use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

struct Slots<T> {
    last_index: usize,
    items: Vec<Option<T>>,
}

/// Bounded FIFO that transfers ownership of `T` between producers and
/// consumers, preserving value semantics (for shared handles, copy = retain).
pub struct ReferenceQueue<T> {
    slots: Mutex<Slots<T>>,
    index_tx: Sender<usize>,
    index_rx: Receiver<usize>,
    count: AtomicUsize,
    capacity: usize,
}

impl<T> ReferenceQueue<T> {
    /// Creates a queue of bounded capacity `q`.
    pub fn new(q: usize) -> Self {
        let (index_tx, index_rx) = channel::bounded(q);
        Self {
            slots: Mutex::new(Slots {
                last_index: 0,
                items: (0..q).map(|_| None).collect(),
            }),
            index_tx,
            index_rx,
            count: AtomicUsize::new(0),
            capacity: q,
        }
    }

    /// Bounded capacity `Q`.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items currently queued and awaiting `receive`.
    pub fn number_of_items(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Whether the queue currently holds no items.
    pub fn is_empty(&self) -> bool {
        self.number_of_items() == 0
    }

    /// Whether the queue is at capacity.
    pub fn is_full(&self) -> bool {
        self.number_of_items() == self.capacity
    }

    /// Non-blocking send from ordinary task context. Returns `false` if full.
    pub fn send(&self, item: T) -> bool {
        self.send_inner(item)
    }

    /// ISR-safe send variant. Never blocks and performs the same slot-table
    /// scan as [`send`](Self::send); the "woke a higher-priority task" output
    /// parameter from the source contract is always `false` on this
    /// `std`-backed port, which has no RTOS scheduler to wake.
    pub fn send_from_isr(&self, item: T) -> (bool, bool) {
        (self.send_inner(item), false)
    }

    fn send_inner(&self, item: T) -> bool {
        if self.capacity == 0 {
            return false;
        }
        let mut slots = self.slots.lock();
        let n = slots.items.len();
        let start = slots.last_index;
        let mut found = None;
        for step in 0..n {
            let idx = (start + step) % n;
            if slots.items[idx].is_none() {
                found = Some(idx);
                break;
            }
        }
        let Some(idx) = found else {
            return false;
        };
        slots.items[idx] = Some(item);
        slots.last_index = (idx + 1) % n;
        drop(slots);

        if self.index_tx.try_send(idx).is_ok() {
            self.count.fetch_add(1, Ordering::AcqRel);
            true
        } else {
            // Roll back: the underlying index queue refused the push.
            let mut slots = self.slots.lock();
            slots.items[idx] = None;
            false
        }
    }

    /// Receives an item, blocking up to `timeout`. `None` means block
    /// indefinitely; `Some(Duration::ZERO)` polls without blocking.
    pub fn receive(&self, timeout: Option<Duration>) -> Option<T> {
        let idx = match timeout {
            None => self.index_rx.recv().ok()?,
            Some(d) if d.is_zero() => match self.index_rx.try_recv() {
                Ok(idx) => idx,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return None,
            },
            Some(d) => self.index_rx.recv_timeout(d).ok()?,
        };
        let mut slots = self.slots.lock();
        let item = slots.items[idx].take();
        drop(slots);
        if item.is_some() {
            self.count.fetch_sub(1, Ordering::AcqRel);
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn send_and_receive_is_fifo_per_producer() {
        let q: ReferenceQueue<i32> = ReferenceQueue::new(4);
        assert!(q.send(1));
        assert!(q.send(2));
        assert!(q.send(3));
        assert_eq!(q.receive(Some(Duration::ZERO)), Some(1));
        assert_eq!(q.receive(Some(Duration::ZERO)), Some(2));
        assert_eq!(q.receive(Some(Duration::ZERO)), Some(3));
    }

    #[test]
    fn send_on_full_queue_returns_false_without_mutation() {
        let q: ReferenceQueue<i32> = ReferenceQueue::new(2);
        assert!(q.send(1));
        assert!(q.send(2));
        assert!(!q.send(3));
        assert_eq!(q.number_of_items(), 2);
        assert!(q.is_full());
    }

    #[test]
    fn used_returns_to_zero_after_matched_send_receive() {
        let q: ReferenceQueue<i32> = ReferenceQueue::new(4);
        for i in 0..4 {
            assert!(q.send(i));
        }
        for _ in 0..4 {
            assert!(q.receive(Some(Duration::ZERO)).is_some());
        }
        assert!(q.is_empty());
        assert_eq!(q.number_of_items(), 0);
    }

    #[test]
    fn receive_on_empty_queue_polls_without_blocking() {
        let q: ReferenceQueue<i32> = ReferenceQueue::new(2);
        assert_eq!(q.receive(Some(Duration::ZERO)), None);
    }

    #[test]
    fn preserves_refcount_of_shared_items() {
        let q: ReferenceQueue<Arc<i32>> = ReferenceQueue::new(2);
        let item = Arc::new(42);
        assert_eq!(Arc::strong_count(&item), 1);
        q.send(item.clone());
        assert_eq!(Arc::strong_count(&item), 2, "queue retains its own share");
        let received = q.receive(Some(Duration::ZERO)).unwrap();
        assert_eq!(*received, 42);
        assert_eq!(Arc::strong_count(&item), 2);
    }

    #[test]
    fn send_from_isr_never_blocks_and_reports_no_wake() {
        let q: ReferenceQueue<i32> = ReferenceQueue::new(1);
        let (sent, woke) = q.send_from_isr(7);
        assert!(sent);
        assert!(!woke);
        let (sent2, _) = q.send_from_isr(8);
        assert!(!sent2, "queue is full");
    }

    #[test]
    fn round_robin_scan_spreads_across_slots() {
        let q: ReferenceQueue<i32> = ReferenceQueue::new(3);
        assert!(q.send(1));
        assert_eq!(q.receive(Some(Duration::ZERO)), Some(1));
        // slot 0 is free again, but last_index now points past it; the next
        // send should land in slot 1, not slot 0, mirroring the source's
        // round-robin scan starting at mLastIndex rather than slot 0.
        assert!(q.send(2));
        assert!(q.send(3));
        assert!(q.send(4));
        assert!(!q.send(5));
    }
}
