//! # Runtime events emitted by the super-server.
//!
//! [`EventKind`] classifies events across four categories:
//! - **Provisioning**: per-service socket setup results
//! - **Dispatch lifecycle**: readiness, worker spawn, WAIT suspension, reap
//! - **Shutdown**: signal observation and listener closure
//! - **Subscriber plumbing**: overflow/panic reports from the fan-out
//!
//! [`Event`] carries optional metadata (service name, pid, port, raw fd,
//! reason). Every event has a globally unique, monotonically increasing
//! sequence number for ordering.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Provisioning ===
    /// A service's listening socket was bound (and, for stream transport,
    /// marked listening).
    ///
    /// Sets: `service`, `port`, `fd`.
    ServiceProvisioned,

    /// socket/bind/listen failed; the service is permanently unreachable
    /// for this process lifetime.
    ///
    /// Sets: `service`, `reason`.
    ProvisionFailed,

    // === Dispatch lifecycle ===
    /// A service's listen descriptor was marked ready and is being handled.
    ///
    /// Sets: `service`.
    Dispatching,

    /// A worker process was spawned for a ready service.
    ///
    /// Sets: `service`, `pid`.
    WorkerSpawned,

    /// A WAIT service recorded its outstanding worker and left the
    /// readiness set until reaped.
    ///
    /// Sets: `service`, `pid`.
    ServiceSuspended,

    /// Accepting a stream connection failed; only this dispatch aborted.
    ///
    /// Sets: `service`, `reason`.
    AcceptFailed,

    /// Spawning the worker failed; only this dispatch aborted.
    ///
    /// Sets: `service`, `reason`.
    SpawnFailed,

    /// The readiness wait failed for a reason other than child exit;
    /// the loop continues.
    ///
    /// Sets: `reason`, optionally `service`.
    WaitFailed,

    /// A terminated child was collected. `service` is set when the pid
    /// matched a WAIT service's outstanding worker (which is eligible
    /// again); absent for untracked NOWAIT workers, the common case.
    ///
    /// Sets: `pid`, optionally `service`.
    WorkerReaped,

    // === Shutdown ===
    /// A termination signal (interrupt, terminate, quit) was observed.
    ShutdownRequested,

    /// Every provisioned listen descriptor has been closed.
    ListenersClosed,

    // === Subscriber plumbing ===
    /// A subscriber's queue was full; the event was dropped for that
    /// subscriber only.
    ///
    /// Sets: `service` (subscriber name), `reason`.
    SubscriberOverflow,

    /// A subscriber panicked while processing an event.
    ///
    /// Sets: `service` (subscriber name), `reason`.
    SubscriberPanicked,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Service (or subscriber) name, if applicable.
    pub service: Option<Arc<str>>,
    /// Worker process id, if applicable.
    pub pid: Option<u32>,
    /// Listening port, if applicable.
    pub port: Option<u16>,
    /// Raw descriptor value of the provisioned socket, if applicable.
    pub fd: Option<i32>,
    /// Human-readable reason (errors, overflow details).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp
    /// and next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            service: None,
            pid: None,
            port: None,
            fd: None,
            reason: None,
        }
    }

    /// Attaches a service (or subscriber) name.
    #[inline]
    pub fn with_service(mut self, service: impl Into<Arc<str>>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Attaches a worker process id.
    #[inline]
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Attaches a listening port.
    #[inline]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Attaches a raw descriptor value.
    #[inline]
    pub fn with_fd(mut self, fd: i32) -> Self {
        self.fd = Some(fd);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow report.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str) -> Self {
        Event::now(EventKind::SubscriberOverflow)
            .with_service(subscriber)
            .with_reason("queue full")
    }

    /// Creates a subscriber panic report.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::now(EventKind::SubscriberPanicked)
            .with_service(subscriber)
            .with_reason(info)
    }

    /// True for operator-visible failures (always printed, never gated
    /// by verbose mode).
    pub fn is_failure(&self) -> bool {
        matches!(
            self.kind,
            EventKind::ProvisionFailed
                | EventKind::AcceptFailed
                | EventKind::SpawnFailed
                | EventKind::WaitFailed
                | EventKind::SubscriberOverflow
                | EventKind::SubscriberPanicked
        )
    }

    /// True for reports generated by the subscriber fan-out itself;
    /// these are never re-reported on overflow or panic.
    #[inline]
    pub fn is_subscriber_report(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::now(EventKind::Dispatching);
        let b = Event::now(EventKind::Dispatching);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_builders_set_fields() {
        let ev = Event::now(EventKind::WorkerSpawned)
            .with_service("echoservice")
            .with_pid(42)
            .with_port(9007);
        assert_eq!(ev.service.as_deref(), Some("echoservice"));
        assert_eq!(ev.pid, Some(42));
        assert_eq!(ev.port, Some(9007));
        assert!(!ev.is_failure());
    }

    #[test]
    fn test_failure_classification() {
        assert!(Event::now(EventKind::SpawnFailed).is_failure());
        assert!(Event::now(EventKind::WaitFailed).is_failure());
        assert!(!Event::now(EventKind::WorkerReaped).is_failure());
        assert!(Event::subscriber_overflow("console").is_subscriber_report());
    }
}
