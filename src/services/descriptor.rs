//! # Service descriptors.
//!
//! [`ServiceDescriptor`] is the static record describing one configured
//! network service and its dispatch policy. Descriptors are constructed
//! once from configuration, their sockets provisioned once, and never
//! destroyed except at process shutdown.
//!
//! ## Mutation rules
//! - The dispatcher sets [`WorkerState::Running`] when a WAIT worker starts.
//! - Reap reconciliation resets it to [`WorkerState::Idle`].
//! - NOWAIT services never leave `Idle`; their workers are untracked.
//! - A provisioned listener is never reassigned; it is dropped (closed)
//!   only when the loop exits.

use std::path::{Path, PathBuf};

use crate::core::provision::Listener;

/// Transport protocol of a service's listening socket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transport {
    /// TCP; connections are accepted before dispatch.
    Stream,
    /// UDP; the listening socket itself is the worker's connection handle.
    Datagram,
}

impl Transport {
    /// Returns the config-file token for this transport.
    pub fn as_token(&self) -> &'static str {
        match self {
            Transport::Stream => "TCP",
            Transport::Datagram => "UDP",
        }
    }
}

/// Concurrency policy of a service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConcurrencyMode {
    /// One worker at a time; the service leaves the readiness set until
    /// its worker is reaped.
    Wait,
    /// A fresh worker per event; any number may run concurrently.
    Nowait,
}

impl ConcurrencyMode {
    /// Returns the config-file token for this mode.
    pub fn as_token(&self) -> &'static str {
        match self {
            ConcurrencyMode::Wait => "WAIT",
            ConcurrencyMode::Nowait => "NOWAIT",
        }
    }
}

/// Worker bookkeeping for a service.
///
/// An explicit tagged state rather than a pid sentinel: `Running` exists
/// only for WAIT services while their single worker is outstanding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    /// No tracked worker; the service is eligible for dispatch.
    Idle,
    /// A WAIT worker with this process id is outstanding.
    Running(u32),
}

impl WorkerState {
    /// True when no tracked worker is outstanding.
    #[inline]
    pub fn is_idle(&self) -> bool {
        matches!(self, WorkerState::Idle)
    }
}

/// One parsed config line; the pre-provision form of a descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Filesystem path of the worker binary.
    pub executable: PathBuf,
    /// Service identifier; also argv\[0\] of the worker.
    pub name: String,
    /// Listening transport.
    pub transport: Transport,
    /// Listening port, 1-65535.
    pub port: u16,
    /// Dispatch concurrency policy.
    pub mode: ConcurrencyMode,
}

/// The static record for one configured service.
#[derive(Debug)]
pub struct ServiceDescriptor {
    executable: PathBuf,
    name: String,
    transport: Transport,
    port: u16,
    mode: ConcurrencyMode,
    listener: Option<Listener>,
    worker: WorkerState,
}

impl ServiceDescriptor {
    /// Creates an unprovisioned descriptor from a parsed config line.
    pub fn from_config(config: ServiceConfig) -> Self {
        Self {
            executable: config.executable,
            name: config.name,
            transport: config.transport,
            port: config.port,
            mode: config.mode,
            listener: None,
            worker: WorkerState::Idle,
        }
    }

    /// Service identifier; used as argv\[0\] for the worker.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the worker binary.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Listening transport.
    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Listening port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Dispatch concurrency policy.
    pub fn mode(&self) -> ConcurrencyMode {
        self.mode
    }

    /// The provisioned listener, if provisioning succeeded.
    pub fn listener(&self) -> Option<&Listener> {
        self.listener.as_ref()
    }

    /// Current worker bookkeeping.
    pub fn worker(&self) -> WorkerState {
        self.worker
    }

    /// Attaches the provisioned listener. Called once at startup; a
    /// listener is never reassigned afterwards.
    pub(crate) fn attach_listener(&mut self, listener: Listener) {
        debug_assert!(self.listener.is_none(), "listener reassigned");
        self.listener = Some(listener);
    }

    /// Drops (closes) the listener at process shutdown.
    pub(crate) fn close_listener(&mut self) {
        self.listener = None;
    }

    /// Records the outstanding WAIT worker.
    pub(crate) fn set_running(&mut self, pid: u32) {
        self.worker = WorkerState::Running(pid);
    }

    /// Clears the outstanding worker; the service becomes eligible on the
    /// next readiness build.
    pub(crate) fn set_idle(&mut self) {
        self.worker = WorkerState::Idle;
    }

    /// True when this service may appear in the next readiness set:
    /// provisioned and without an outstanding tracked worker.
    pub fn is_eligible(&self) -> bool {
        self.listener.is_some() && self.worker.is_idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServiceConfig {
        ServiceConfig {
            executable: PathBuf::from("/bin/echo"),
            name: "echoservice".to_string(),
            transport: Transport::Stream,
            port: 9007,
            mode: ConcurrencyMode::Nowait,
        }
    }

    #[test]
    fn test_new_descriptor_is_idle_and_unprovisioned() {
        let svc = ServiceDescriptor::from_config(config());
        assert_eq!(svc.worker(), WorkerState::Idle);
        assert!(svc.listener().is_none());
        assert!(!svc.is_eligible());
    }

    #[test]
    fn test_running_worker_suspends_eligibility_bookkeeping() {
        let mut svc = ServiceDescriptor::from_config(config());
        svc.set_running(42);
        assert_eq!(svc.worker(), WorkerState::Running(42));
        assert!(!svc.is_eligible());
        svc.set_idle();
        assert!(svc.worker().is_idle());
    }

    #[test]
    fn test_tokens_round_trip() {
        assert_eq!(Transport::Stream.as_token(), "TCP");
        assert_eq!(Transport::Datagram.as_token(), "UDP");
        assert_eq!(ConcurrencyMode::Wait.as_token(), "WAIT");
        assert_eq!(ConcurrencyMode::Nowait.as_token(), "NOWAIT");
    }
}
