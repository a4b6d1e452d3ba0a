//! # Worker dispatch.
//!
//! Turns a ready service into a running worker process. The worker's
//! stdin and stdout are the network connection: an accepted stream for
//! TCP services, a blocking clone of the shared listening socket for UDP
//! services. stderr is inherited so worker diagnostics stay on the
//! operator console.
//!
//! ## Rules
//! - Sockets handed to workers are always blocking.
//! - For a WAIT service, a successful spawn suspends the service until
//!   the worker is reaped.
//! - A failed spawn is reported and the service stays eligible; the
//!   triggering connection (if any) is dropped.

use std::os::fd::OwnedFd;
use std::os::unix::process::CommandExt;
use std::process::{Command as StdCommand, Stdio};

use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::core::provision::Listener;
use crate::core::reaper::{self, ReapNotice};
use crate::error::ServiceError;
use crate::events::{Bus, Event, EventKind};
use crate::services::{ConcurrencyMode, ServiceDescriptor};

/// The connection handle for one dispatch.
pub enum Connection {
    /// An accepted TCP connection, owned by the dispatch.
    Stream(TcpStream),
    /// The service's own UDP socket carries the traffic; nothing to pass.
    Datagram,
}

/// Spawns workers and registers them with the reaper.
pub struct Dispatcher {
    bus: Bus,
    reap_tx: mpsc::Sender<ReapNotice>,
}

impl Dispatcher {
    pub fn new(bus: Bus, reap_tx: mpsc::Sender<ReapNotice>) -> Self {
        Self { bus, reap_tx }
    }

    /// Launches a worker for one ready service.
    pub fn dispatch(&self, svc: &mut ServiceDescriptor, conn: Connection) {
        let spawned = match conn {
            Connection::Stream(stream) => self.spawn_stream_worker(svc, stream),
            Connection::Datagram => self.spawn_datagram_worker(svc),
        };

        match spawned {
            Ok(pid) => {
                self.bus.publish(
                    Event::now(EventKind::WorkerSpawned)
                        .with_service(svc.name())
                        .with_pid(pid),
                );
                if svc.mode() == ConcurrencyMode::Wait {
                    svc.set_running(pid);
                    self.bus.publish(
                        Event::now(EventKind::ServiceSuspended)
                            .with_service(svc.name())
                            .with_pid(pid),
                    );
                }
            }
            Err(err) => {
                self.bus.publish(
                    Event::now(EventKind::SpawnFailed)
                        .with_service(svc.name())
                        .with_reason(err.to_string()),
                );
            }
        }
    }

    fn spawn_stream_worker(
        &self,
        svc: &ServiceDescriptor,
        stream: TcpStream,
    ) -> Result<u32, ServiceError> {
        let stream = stream
            .into_std()
            .map_err(|source| ServiceError::Handoff { source })?;
        // the worker expects ordinary blocking stdio
        stream
            .set_nonblocking(false)
            .map_err(|source| ServiceError::Handoff { source })?;
        let stdout = stream
            .try_clone()
            .map_err(|source| ServiceError::Handoff { source })?;
        self.spawn_worker(svc, OwnedFd::from(stream), OwnedFd::from(stdout))
    }

    fn spawn_datagram_worker(&self, svc: &ServiceDescriptor) -> Result<u32, ServiceError> {
        let Some(Listener::Datagram(endpoint)) = svc.listener() else {
            return Err(ServiceError::Handoff {
                source: std::io::Error::new(
                    std::io::ErrorKind::NotConnected,
                    "service has no datagram listener",
                ),
            });
        };
        let stdin = endpoint
            .worker_socket()
            .map_err(|source| ServiceError::Handoff { source })?;
        let stdout = endpoint
            .worker_socket()
            .map_err(|source| ServiceError::Handoff { source })?;
        self.spawn_worker(svc, OwnedFd::from(stdin), OwnedFd::from(stdout))
    }

    fn spawn_worker(
        &self,
        svc: &ServiceDescriptor,
        stdin_fd: OwnedFd,
        stdout_fd: OwnedFd,
    ) -> Result<u32, ServiceError> {
        let mut cmd = StdCommand::new(svc.executable());
        cmd.arg0(svc.name())
            .stdin(Stdio::from(stdin_fd))
            .stdout(Stdio::from(stdout_fd))
            .stderr(Stdio::inherit());

        let child = Command::from(cmd)
            .spawn()
            .map_err(|source| ServiceError::Spawn {
                executable: svc.executable().display().to_string(),
                source,
            })?;

        // id() is always Some before the child has been awaited
        let pid = child.id().unwrap_or_default();
        reaper::watch(child, pid, self.reap_tx.clone());
        Ok(pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::provision::provision_one;
    use crate::services::{ServiceConfig, Transport, WorkerState};

    fn udp_service(mode: ConcurrencyMode) -> ServiceDescriptor {
        let mut svc = ServiceDescriptor::from_config(ServiceConfig {
            executable: "/bin/true".into(),
            name: "trueservice".to_string(),
            transport: Transport::Datagram,
            port: 0,
            mode,
        });
        svc.attach_listener(provision_one(Transport::Datagram, 0, 10).unwrap());
        svc
    }

    #[tokio::test]
    async fn test_wait_dispatch_suspends_then_reap_rearms() {
        let bus = Bus::new(16);
        let (tx, mut rx) = mpsc::channel(8);
        let dispatcher = Dispatcher::new(bus, tx);

        let mut services = vec![udp_service(ConcurrencyMode::Wait)];
        dispatcher.dispatch(&mut services[0], Connection::Datagram);

        let WorkerState::Running(pid) = services[0].worker() else {
            panic!("expected a suspended worker");
        };
        assert!(!services[0].is_eligible());

        let notice = rx.recv().await.unwrap();
        assert_eq!(notice.pid, pid);
        assert!(notice.outcome.unwrap().success());

        let rearmed = reaper::reconcile(&mut services, notice.pid);
        assert_eq!(rearmed.as_deref(), Some("trueservice"));
        assert!(services[0].is_eligible());
    }

    #[tokio::test]
    async fn test_nowait_dispatch_leaves_service_eligible() {
        let bus = Bus::new(16);
        let (tx, mut rx) = mpsc::channel(8);
        let dispatcher = Dispatcher::new(bus, tx);

        let mut svc = udp_service(ConcurrencyMode::Nowait);
        dispatcher.dispatch(&mut svc, Connection::Datagram);

        assert_eq!(svc.worker(), WorkerState::Idle);
        assert!(svc.is_eligible());
        assert!(rx.recv().await.unwrap().outcome.is_ok());
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported_not_fatal() {
        let bus = Bus::new(16);
        let mut events = bus.subscribe();
        let (tx, _rx) = mpsc::channel(8);
        let dispatcher = Dispatcher::new(bus, tx);

        let mut svc = ServiceDescriptor::from_config(ServiceConfig {
            executable: "/nonexistent/worker".into(),
            name: "broken".to_string(),
            transport: Transport::Datagram,
            port: 0,
            mode: ConcurrencyMode::Wait,
        });
        svc.attach_listener(provision_one(Transport::Datagram, 0, 10).unwrap());

        dispatcher.dispatch(&mut svc, Connection::Datagram);
        assert_eq!(svc.worker(), WorkerState::Idle);

        let report = events.recv().await.unwrap();
        assert_eq!(report.kind, EventKind::SpawnFailed);
        assert_eq!(report.service.as_deref(), Some("broken"));
    }
}
