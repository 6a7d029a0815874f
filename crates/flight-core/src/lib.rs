// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # flight-core — onboard data-flow middleware
//!
//! The four tightly coupled subsystems that carry the real engineering of a
//! portable flight-software middleware stack, built above a bare RTOS
//! (threads, timers, queues, mutexes): a zero-copy shared-buffer pool, a
//! bounded reference queue/ring buffer pair over shared buffers, a filtered
//! software bus, and a fixed-point data-aggregation/compression pipeline.
//!
//! ## Data flow
//!
//! ```text
//! +--------+     +------------------+     +---------------------+
//! | [pool] | --> | aggregator (C5)  | --> | processor (C6)       |
//! |  (C1)  |     | fills DataBlocks |     | wavelet + NLS encode |
//! +--------+     +------------------+     +----------+-----------+
//!      |                                             |
//!      v                                             v
//! +--------+     +------------------+     +---------------------+
//! | queue  | <-- | bus (C4)         | <-- | reference queue (C2)|
//! |  (C3)  |     | admission/fan-out|     | / ring buffer (C3)  |
//! +--------+     +------------------+     +---------------------+
//! ```
//!
//! Long-running threads (the bus worker, the processor worker) are each
//! consulted by [`heartbeat::HeartbeatLimiter`] (C7) to rate-limit liveness
//! signals destined for a watchdog topic outside this crate.
//!
//! ## RTOS portability
//!
//! Nothing in this crate calls `std::thread`/`Instant::now()` directly for
//! anything that needs to be deterministic in tests; see [`rtos`] for the
//! facade that lets the same code compile against a host `std` build or
//! (with the right port swapped in) an embedded RTOS target.

/// C5: per-parameter fixpoint sample aggregator.
pub mod aggregator;
/// C4: filtered, fan-out software bus.
pub mod bus;
/// Named defaults for the composition root.
pub mod config;
/// C5/C6: the fixed-size data carrier moved between the aggregator, the
/// processor thread, and the wire.
pub mod datablock;
/// Crate-wide error taxonomy.
pub mod error;
/// 16.16 signed fixed-point numeric type.
pub mod fixpoint;
/// C7: heartbeat rate limiter.
pub mod heartbeat;
/// Compile-time configurable logging system.
pub mod logging;
/// Near-lossless (NLS) bitstream codec for wavelet coefficients.
pub mod nls;
/// C1: buffer pool, shared handle, and nested child views.
pub mod pool;
/// C6: data processor thread — wavelet transform + NLS encode pipeline.
pub mod processor;
/// C2: bounded reference queue, including the ISR-safe send variant.
pub mod queue;
/// Generic lookup registry, the composition root's substitute for the
/// source's self-registering intrusive lists.
pub mod registry;
/// C3: bounded, indexable shared ring buffer with per-slot flags.
pub mod ring;
/// RTOS facade (`Clock`, `SystemClock`, `FakeClock`).
pub mod rtos;
/// Integer Haar lifting transform applied before NLS encoding.
pub mod wavelet;

pub use aggregator::{DataAggregator, OneTimeSender, Sender};
pub use bus::{AdmissionFilter, Channel, Message, RangeFilter, SendOutcome, SoftwareBus, SubscriptionFilter};
pub use datablock::{BlockState, Blocksize, DataBlock, Payload, SamplingRate};
pub use error::{Error, FailureHandler, Result};
pub use fixpoint::Fixpoint;
pub use heartbeat::{Heartbeat, HeartbeatLimiter, TimeoutType};
pub use pool::{Handle, Pool};
pub use processor::{DataProcessor, ProcessOutcome};
pub use queue::ReferenceQueue;
pub use registry::Registry;
pub use ring::RingBuffer;
pub use rtos::{Clock, FakeClock, SystemClock};
