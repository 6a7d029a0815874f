// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate-wide error taxonomy.
//!
//! Every fallible operation in the core returns one of these kinds rather than an
//! exception type; most call sites collapse the result further into a `bool` or a
//! dedicated result enum at the contract boundary (see each module's `Contract`
//! section), but `Error` is the canonical representation used for anything that
//! reaches a `FailureHandler`.

use std::fmt;

/// Error kinds produced by the core. See SPEC §7 for the taxonomy this mirrors.
#[derive(Debug)]
pub enum Error {
    /// `allocate()` found no free frame in the pool.
    PoolExhausted,
    /// A bounded queue/mailbox `send` was refused because it is full.
    QueueFull,
    /// The bus admission filter declined a published message.
    AdmissionRejected,
    /// A channel's mailbox overflowed during dispatch.
    MailboxFull,
    /// A message or block was malformed (e.g. an unset/invalid handle).
    InvalidMessage(String),
    /// A blocking operation returned without data before its timeout elapsed.
    TimeoutElapsed,
    /// Unrecoverable condition: init-time resource allocation failed, a worker
    /// thread returned unexpectedly, or the underlying RTOS reported an error
    /// with no defined recovery. Routed to a [`FailureHandler`].
    Fatal(String),
    /// Wraps an I/O error from a logging output backend.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::PoolExhausted => write!(f, "pool exhausted: no free frame available"),
            Error::QueueFull => write!(f, "queue full"),
            Error::AdmissionRejected => write!(f, "message rejected by admission filter"),
            Error::MailboxFull => write!(f, "channel mailbox full"),
            Error::InvalidMessage(msg) => write!(f, "invalid message: {}", msg),
            Error::TimeoutElapsed => write!(f, "timeout elapsed"),
            Error::Fatal(msg) => write!(f, "fatal: {}", msg),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// Convenient alias for results using the crate's `Error` type.
pub type Result<T> = core::result::Result<T, Error>;

/// Sink for [`Error::Fatal`] conditions raised by long-running components.
///
/// Injected at construction rather than referenced as a global singleton (see
/// SPEC_FULL.md §9, "global singletons"). The default implementation logs and
/// lets the caller's loop exit; it does not abort the process, since a library
/// should not decide that for its host application.
pub trait FailureHandler: Send + Sync {
    /// Called exactly once per fatal condition, from the thread that detected it.
    fn on_fatal(&self, err: &Error);
}

/// Failure handler that logs at error level and otherwise does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingFailureHandler;

impl FailureHandler for LoggingFailureHandler {
    fn on_fatal(&self, err: &Error) {
        crate::error!("fatal error: {err}");
    }
}
