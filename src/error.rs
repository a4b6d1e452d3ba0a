//! Error types used by the netvisor runtime.
//!
//! This module defines three error enums:
//!
//! - [`RuntimeError`]: fatal conditions that terminate the super-server.
//! - [`ServiceError`]: per-dispatch failures; reported and recovered from.
//! - [`ParseError`]: per-line rejection reasons from the config parser.
//!
//! [`RuntimeError`] and [`ServiceError`] provide `as_label()` for short
//! stable identifiers in logs.

use std::io;

use thiserror::Error;

/// # Fatal errors raised by the super-server runtime.
///
/// Reap collection is the only operation whose failure is fatal: an
/// unreapable child indicates a broken process-bookkeeping invariant
/// the runtime cannot safely continue past.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Collecting a terminated worker's exit status failed.
    #[error("failed to collect terminated worker {pid}: {source}")]
    ReapFailed {
        /// Process id of the child whose status could not be collected.
        pid: u32,
        /// Underlying wait error.
        #[source]
        source: io::Error,
    },

    /// Every reap sender is gone; worker terminations can no longer be observed.
    #[error("reap channel closed; worker terminations can no longer be observed")]
    ReapChannelClosed,
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::ReapFailed { .. } => "runtime_reap_failed",
            RuntimeError::ReapChannelClosed => "runtime_reap_channel_closed",
        }
    }
}

/// # Per-dispatch failures.
///
/// None of these abort the loop: a failed provision leaves the service
/// permanently unreachable, a failed accept or spawn aborts only that
/// single dispatch.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ServiceError {
    /// socket/bind/listen failed while provisioning a listener.
    #[error("socket provisioning failed: {source}")]
    Provision {
        #[source]
        source: io::Error,
    },

    /// Handing the connection descriptor over to the worker failed.
    #[error("connection handoff failed: {source}")]
    Handoff {
        #[source]
        source: io::Error,
    },

    /// Spawning the worker executable failed (includes exec failure,
    /// which the spawn call reports back to the parent).
    #[error("failed to spawn worker `{executable}`: {source}")]
    Spawn {
        /// Path of the worker binary that could not be started.
        executable: String,
        #[source]
        source: io::Error,
    },
}

impl ServiceError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::Provision { .. } => "service_provision_failed",
            ServiceError::Handoff { .. } => "service_handoff_failed",
            ServiceError::Spawn { .. } => "service_spawn_failed",
        }
    }
}

/// # Reasons a config line produces no service descriptor.
///
/// A rejected line is reported with its line number and skipped; loading
/// continues with the next line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The line does not have exactly five whitespace-separated fields.
    #[error("expected 5 fields, found {found}")]
    FieldCount { found: usize },

    /// A field exceeds its byte limit.
    #[error("{field} exceeds {limit} bytes")]
    FieldTooLong { field: &'static str, limit: usize },

    /// The transport token is neither TCP nor UDP.
    #[error("unknown transport `{token}` (expected TCP or UDP)")]
    Transport { token: String },

    /// The port is not a decimal integer in 1-65535.
    #[error("invalid port `{token}` (expected 1-65535)")]
    Port { token: String },

    /// The concurrency token is neither WAIT nor NOWAIT.
    #[error("unknown concurrency mode `{token}` (expected WAIT or NOWAIT)")]
    Mode { token: String },
}
