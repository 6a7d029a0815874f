// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! C7: heartbeat rate limiter.
//!
//! Ported from `outpost::support::HeartbeatLimiter` (heartbeat_limiter.cpp):
//! the emit condition below is the source's boolean expression verbatim,
//! translated term for term rather than re-derived. The source seeds its
//! outstanding deadline at `SpacecraftElapsedTime::startOfEpoch()` so the
//! very first `send` always fires; since `Instant` has no meaningful epoch
//! value to construct ahead of time, that is modeled here as `None`.
use crate::rtos::Clock;
use std::time::{Duration, Instant};

/// Whether a heartbeat's deadline is measured relative to emission or as an
/// absolute instant. `HeartbeatLimiter` always emits the latter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutType {
    Relative,
    Absolute,
}

/// A liveness signal destined for the watchdog topic (§6): source tag,
/// deadline kind, and the instant by which the next signal is due.
#[derive(Debug, Clone, Copy)]
pub struct Heartbeat {
    pub source: u8,
    pub timeout_type: TimeoutType,
    pub deadline: Instant,
}

/// Rate-limits heartbeat emission to at most once per `heartbeat_interval`,
/// except when the caller's execution timeout has shrunk enough that the
/// outstanding deadline is no longer a safe bound.
pub struct HeartbeatLimiter<C: Clock> {
    clock: C,
    heartbeat_interval: Duration,
    source: u8,
    deadline: Option<Instant>,
}

impl<C: Clock> HeartbeatLimiter<C> {
    pub fn new(clock: C, heartbeat_interval: Duration, source: u8) -> Self {
        Self {
            clock,
            heartbeat_interval,
            source,
            deadline: None,
        }
    }

    /// Emits a heartbeat iff the interval since the last one has elapsed, or
    /// the new deadline (`heartbeat_interval + execution_timeout`) would fall
    /// significantly short of the outstanding one. Returns the emitted
    /// record, if any, for the caller to route onto the heartbeat topic.
    pub fn send(&mut self, execution_timeout: Duration) -> Option<Heartbeat> {
        let current_time = self.clock.now();
        let timeout = self.heartbeat_interval + execution_timeout;

        let should_emit = match self.deadline {
            None => true,
            Some(deadline) => {
                deadline <= current_time + execution_timeout || deadline > current_time + timeout
            }
        };

        if !should_emit {
            return None;
        }

        let deadline = self.clock.now() + timeout;
        self.deadline = Some(deadline);
        Some(Heartbeat {
            source: self.source,
            timeout_type: TimeoutType::Absolute,
            deadline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtos::FakeClock;
    use std::sync::Arc;

    #[test]
    fn first_send_always_emits() {
        let mut limiter =
            HeartbeatLimiter::new(Arc::new(FakeClock::new()), Duration::from_millis(500), 3);
        let hb = limiter.send(Duration::from_millis(50)).unwrap();
        assert_eq!(hb.source, 3);
        assert_eq!(hb.timeout_type, TimeoutType::Absolute);
    }

    #[test]
    fn send_within_interval_is_suppressed() {
        let clock = Arc::new(FakeClock::new());
        let mut limiter = HeartbeatLimiter::new(clock.clone(), Duration::from_millis(500), 1);
        assert!(limiter.send(Duration::ZERO).is_some());
        clock.advance(Duration::from_millis(10));
        assert!(
            limiter.send(Duration::ZERO).is_none(),
            "well within the interval, no new heartbeat is due"
        );
    }

    #[test]
    fn send_after_interval_elapsed_emits_again() {
        let clock = Arc::new(FakeClock::new());
        let mut limiter = HeartbeatLimiter::new(clock.clone(), Duration::from_millis(100), 1);
        let first = limiter.send(Duration::ZERO).unwrap();
        clock.advance(Duration::from_millis(150));
        let second = limiter.send(Duration::ZERO).unwrap();
        assert!(second.deadline > first.deadline);
    }

    #[test]
    fn shrinking_execution_timeout_forces_early_emission() {
        // First call with a long execution timeout pushes the deadline far
        // out; a subsequent call with a much shorter timeout must re-emit
        // rather than honor the stale, now-too-generous deadline.
        let clock = Arc::new(FakeClock::new());
        let mut limiter = HeartbeatLimiter::new(clock.clone(), Duration::from_millis(100), 1);
        limiter.send(Duration::from_secs(10)).unwrap();
        clock.advance(Duration::from_millis(1));
        let second = limiter.send(Duration::ZERO);
        assert!(
            second.is_some(),
            "a drastically shorter execution timeout must trigger re-emission"
        );
    }
}
