// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! C4: filtered, fan-out software bus.
//!
//! Grounded on the teacher's `engine::router`: the worker lifecycle
//! (`stop_flag`/`handle`/`Drop`) and the dedicated-thread-with-metrics shape
//! are carried over directly, generalized from a single transport route to
//! N registered channels dispatched by a shared admission/subscription
//! filter pair. Per-channel mailboxes reuse [`crate::registry::Registry`]'s
//! sibling idiom (`engine::demux::TopicRegistry`) for the channel list, and
//! [`crate::ring::RingBuffer`] for each channel's bounded history.
use crate::heartbeat::{Heartbeat, HeartbeatLimiter};
use crate::queue::ReferenceQueue;
use crate::ring::RingBuffer;
use crate::rtos::Clock;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Integer identifier the admission and subscription filters screen on.
pub type MessageId = u32;

/// Pair of (id, payload) routed by the bus (SPEC §3 `Message<Id>`).
#[derive(Debug, Clone)]
pub struct Message {
    pub id: MessageId,
    pub payload: crate::pool::Handle,
}

impl Message {
    pub fn new(id: MessageId, payload: crate::pool::Handle) -> Self {
        Self { id, payload }
    }
}

/// Predicate applied to every message before it is admitted onto the bus.
pub trait AdmissionFilter: Send + Sync {
    fn accepts(&self, id: MessageId) -> bool;
}

/// Half-open `[min, max]` inclusive range filter, the typical admission
/// policy.
pub struct RangeFilter {
    pub min: MessageId,
    pub max: MessageId,
}

impl AdmissionFilter for RangeFilter {
    fn accepts(&self, id: MessageId) -> bool {
        id >= self.min && id <= self.max
    }
}

/// Per-channel subscription filter: a set of individually named ids
/// (`BusSubscription<Id>` entries), matching if any names the message's id.
pub struct SubscriptionFilter {
    ids: Vec<MessageId>,
}

impl SubscriptionFilter {
    pub fn new(ids: Vec<MessageId>) -> Self {
        Self { ids }
    }

    /// A filter matching every id, for subscribers that want everything.
    pub fn accept_all() -> Self {
        Self { ids: Vec::new() }
    }

    fn accepts(&self, id: MessageId) -> bool {
        self.ids.is_empty() || self.ids.contains(&id)
    }
}

/// Result of a publisher-side `send_message` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Success,
    InvalidMessage,
    QueueFull,
}

/// One registered subscriber: a filter plus its own bounded mailbox. Shared
/// (`Arc`) between the bus's channel list and the subscriber's own handle,
/// so the worker dispatching to it and the subscriber draining it never
/// contend on anything but the mailbox itself.
pub struct Channel {
    filter: SubscriptionFilter,
    mailbox: RingBuffer<Message>,
    lost: AtomicU64,
}

impl Channel {
    fn new(filter: SubscriptionFilter, capacity: usize) -> Self {
        Self {
            filter,
            mailbox: RingBuffer::new(capacity),
            lost: AtomicU64::new(0),
        }
    }

    /// Attempts to forward `msg` into this channel's mailbox. Returns
    /// whether the filter matched at all (mailbox-full is absorbed into the
    /// `lost` counter, not surfaced to the caller — SPEC §4.4's failure
    /// semantics: a single slow subscriber cannot back-pressure the bus).
    fn offer(&self, msg: &Message) -> bool {
        if !self.filter.accepts(msg.id) {
            return false;
        }
        if !self.mailbox.append(msg.clone()) {
            self.lost.fetch_add(1, Ordering::Relaxed);
        }
        true
    }

    /// Number of messages dropped because this channel's mailbox was full.
    pub fn lost(&self) -> u64 {
        self.lost.load(Ordering::Relaxed)
    }

    /// Pops the oldest undelivered message, if any (`{success,
    /// noMessageAvailable}` collapsed into `Option`, idiomatically).
    pub fn receive_message(&self) -> Option<Message> {
        self.mailbox.pop()
    }
}

/// Cumulative dispatch counters (SPEC §4.4).
#[derive(Debug, Default)]
pub struct BusCounters {
    pub accepted: AtomicU64,
    pub declined: AtomicU64,
    pub forwarded: AtomicU64,
    pub handled: AtomicU64,
    pub failed_send: AtomicU64,
}

impl BusCounters {
    fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> BusCountersSnapshot {
        BusCountersSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            declined: self.declined.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            handled: self.handled.load(Ordering::Relaxed),
            failed_send: self.failed_send.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time read of [`BusCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusCountersSnapshot {
    pub accepted: u64,
    pub declined: u64,
    pub forwarded: u64,
    pub handled: u64,
    pub failed_send: u64,
}

struct Shared {
    admission_filter: Box<dyn AdmissionFilter>,
    queue: ReferenceQueue<Message>,
    channels: Mutex<Vec<Arc<Channel>>>,
    counters: BusCounters,
}

/// The software bus itself: owns the ingress queue, the registered-channel
/// list, and (once started) the dedicated dispatch thread.
pub struct SoftwareBus {
    shared: Arc<Shared>,
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SoftwareBus {
    /// Builds the bus and immediately spawns its worker thread, mirroring
    /// the teacher's `Router::start_with_notifier`. `idle_wait` bounds how
    /// long the worker blocks on an empty queue before looping back to
    /// re-check the shutdown flag and emit a heartbeat; `on_heartbeat` is
    /// the injection point for the watchdog topic the heartbeat publishes
    /// to, which is out of scope for the core itself (SPEC §1).
    pub fn start<C, F>(
        admission_filter: Box<dyn AdmissionFilter>,
        queue_capacity: usize,
        idle_wait: Duration,
        heartbeat_interval: Duration,
        heartbeat_source: u8,
        heartbeat_tolerance: Duration,
        clock: C,
        on_heartbeat: F,
    ) -> Self
    where
        C: Clock + 'static,
        F: Fn(Heartbeat) + Send + 'static,
    {
        let shared = Arc::new(Shared {
            admission_filter,
            queue: ReferenceQueue::new(queue_capacity),
            channels: Mutex::new(Vec::new()),
            counters: BusCounters::new(),
        });
        let stop_flag = Arc::new(AtomicBool::new(false));

        let worker_shared = shared.clone();
        let worker_stop_flag = stop_flag.clone();
        let handle = std::thread::spawn(move || {
            let mut limiter = HeartbeatLimiter::new(clock, heartbeat_interval, heartbeat_source);
            while !worker_stop_flag.load(Ordering::Relaxed) {
                if let Some(msg) = worker_shared.queue.receive(Some(idle_wait)) {
                    dispatch(&worker_shared, &msg);
                }
                if let Some(hb) = limiter.send(heartbeat_tolerance) {
                    on_heartbeat(hb);
                }
            }
        });

        Self {
            shared,
            stop_flag,
            handle: Some(handle),
        }
    }

    /// Publisher-side entry point (SPEC §4.4 `sendMessage`).
    pub fn send_message(&self, msg: Message) -> SendOutcome {
        if !self.shared.admission_filter.accepts(msg.id) {
            self.shared.counters.declined.fetch_add(1, Ordering::Relaxed);
            return SendOutcome::InvalidMessage;
        }
        self.shared.counters.accepted.fetch_add(1, Ordering::Relaxed);
        if self.shared.queue.send(msg) {
            SendOutcome::Success
        } else {
            self.shared.counters.failed_send.fetch_add(1, Ordering::Relaxed);
            SendOutcome::QueueFull
        }
    }

    /// Registers a new subscriber, returning its channel handle for
    /// `receive_message` polling. Channel dispatch begins on the very next
    /// worker iteration (registration takes the same mutex the worker locks
    /// to traverse the channel list — SPEC §4.4's "unregistered →
    /// registered" state machine).
    pub fn register_channel(&self, filter: SubscriptionFilter, mailbox_capacity: usize) -> Arc<Channel> {
        let channel = Arc::new(Channel::new(filter, mailbox_capacity));
        self.shared.channels.lock().push(channel.clone());
        channel
    }

    /// De-registers a previously registered channel. `false` if it was
    /// already removed (or never registered on this bus).
    pub fn unregister_channel(&self, channel: &Arc<Channel>) -> bool {
        let mut channels = self.shared.channels.lock();
        let before = channels.len();
        channels.retain(|c| !Arc::ptr_eq(c, channel));
        channels.len() != before
    }

    pub fn counters(&self) -> BusCountersSnapshot {
        self.shared.counters.snapshot()
    }

    /// Signals the worker to exit and waits for it to stop.
    pub fn stop(mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SoftwareBus {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn dispatch(shared: &Shared, msg: &Message) {
    shared.counters.handled.fetch_add(1, Ordering::Relaxed);
    let mut reached_any = false;
    for channel in shared.channels.lock().iter() {
        if channel.offer(msg) {
            reached_any = true;
        }
    }
    if reached_any {
        shared.counters.forwarded.fetch_add(1, Ordering::Relaxed);
    }
}
