// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Named defaults for the composition root.
//!
//! The core has no persisted configuration (no env vars, no config files — see
//! SPEC §6): every capacity is either a const generic or a constructor
//! argument. These constants exist only so call sites share one source for the
//! handful of defaults that would otherwise be magic numbers scattered across
//! `main()`-equivalents.
use std::time::Duration;

/// Default interval between heartbeat emissions, absent an execution timeout.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(500);

/// Default number of allocation retries the data processor thread attempts
/// before giving up on an output frame (§4.6 step 5).
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Default delay between allocation retry attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Default idle-wait the processor thread blocks on its input queue for
/// before looping back to emit a heartbeat.
pub const DEFAULT_IDLE_WAIT: Duration = Duration::from_millis(100);

/// Tolerance added atop the raw idle wait when the run loop stamps its
/// heartbeat deadline (`idleWait + tolerance`, §4.6).
pub const DEFAULT_HEARTBEAT_TOLERANCE: Duration = Duration::from_millis(50);
