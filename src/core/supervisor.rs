//! # Supervisor: the single-process dispatch loop.
//!
//! The [`Supervisor`] owns the event bus, a [`SubscriberSet`], and global
//! runtime configuration. It provisions listeners, multiplexes readiness
//! across all eligible services, dispatches worker processes, and
//! reconciles worker exits, all from one loop with exclusive access to
//! the service table.
//!
//! ## Key responsibilities
//! - subscribe to the [`Bus`] and **fan-out** events via [`SubscriberSet`]
//! - provision one listening socket per configured service
//! - wait on readiness across every eligible listener at once
//! - dispatch workers (accept + spawn for TCP; spawn for UDP)
//! - apply reap notices to WAIT services, re-arming them
//! - handle OS termination signals (SIGINT/SIGTERM/SIGQUIT/Ctrl-C)
//!
//! ## High-level architecture
//! ```text
//! Inputs to run():
//!   Vec<ServiceDescriptor>  ──►  Supervisor::run(services)
//!
//! Preparation:
//!   - subscriber_listener(): Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!   - provision_all(): one bound socket per service
//!   - reap channel: worker watcher tasks ─► mpsc ─► loop
//!   - signal listener: on signal ─► publish(ShutdownRequested) + cancel
//!
//! Loop (priority order per iteration):
//!   1. shutdown requested       → close listeners, exit
//!   2. reap notice              → reconcile table, re-arm WAIT service
//!   3. listener readiness       → dispatch one worker, iterate again
//!
//! Suspension:
//!   A WAIT service with an outstanding worker is excluded from the
//!   readiness build; the kernel queues its traffic meanwhile.
//! ```

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::dispatch::{Connection, Dispatcher};
use crate::core::provision::{self, Listener};
use crate::core::readiness;
use crate::core::reaper::{self, ReapNotice};
use crate::core::shutdown;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::services::ServiceDescriptor;
use crate::subscribers::{Subscribe, SubscriberSet};

/// What woke the loop this iteration.
enum Wake {
    Shutdown,
    Reaped(Option<ReapNotice>),
    Ready(ReadyEvent),
}

/// A readiness outcome for one service index.
enum ReadyEvent {
    Stream {
        index: usize,
        accepted: io::Result<(TcpStream, SocketAddr)>,
    },
    Datagram {
        index: usize,
        readiness: io::Result<()>,
    },
}

/// Coordinates provisioning, readiness, dispatch, reaping and shutdown.
pub struct Supervisor {
    /// Global runtime configuration.
    pub cfg: Config,
    /// Event bus shared with the dispatcher and watchers.
    pub bus: Bus,
    /// Fan-out set for subscribers.
    pub subs: Arc<SubscriberSet>,
}

impl Supervisor {
    /// Creates a new supervisor with the given config and subscribers.
    pub fn new(cfg: Config, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(subscribers, bus.clone()));
        Self { cfg, bus, subs }
    }

    /// A clone of the event bus, for external subscribers and tests.
    pub fn bus(&self) -> Bus {
        self.bus.clone()
    }

    /// Runs the dispatch loop over the given services until a termination
    /// signal arrives or reap collection breaks down.
    pub async fn run(&self, mut services: Vec<ServiceDescriptor>) -> Result<(), RuntimeError> {
        self.subscriber_listener();
        provision::provision_all(&mut services, self.cfg.backlog_clamped(), &self.bus);

        let token = CancellationToken::new();
        self.spawn_signal_listener(&token);

        let (reap_tx, mut reap_rx) = mpsc::channel(self.cfg.reap_capacity_clamped());
        let dispatcher = Dispatcher::new(self.bus.clone(), reap_tx);

        loop {
            match self.wait_for_wake(&services, &mut reap_rx, &token).await {
                Wake::Shutdown => {
                    self.close_listeners(&mut services);
                    return Ok(());
                }
                Wake::Reaped(None) => {
                    return Err(RuntimeError::ReapChannelClosed);
                }
                Wake::Reaped(Some(notice)) => {
                    let status = notice
                        .outcome
                        .map_err(|source| RuntimeError::ReapFailed {
                            pid: notice.pid,
                            source,
                        })?;
                    let rearmed = reaper::reconcile(&mut services, notice.pid);
                    let mut event = Event::now(EventKind::WorkerReaped)
                        .with_pid(notice.pid)
                        .with_reason(status.to_string());
                    if let Some(name) = rearmed {
                        event = event.with_service(name);
                    }
                    self.bus.publish(event);
                }
                Wake::Ready(event) => {
                    self.handle_ready(&mut services, &dispatcher, event);
                }
            }
        }
    }

    /// Dispatches one readiness outcome.
    ///
    /// The `Dispatching` trace is published only when the wake actually
    /// produced something to dispatch; failed accepts and readiness
    /// errors are reported without it.
    fn handle_ready(
        &self,
        services: &mut [ServiceDescriptor],
        dispatcher: &Dispatcher,
        event: ReadyEvent,
    ) {
        match event {
            ReadyEvent::Stream { index, accepted } => {
                let svc = &mut services[index];
                match accepted {
                    Ok((stream, _peer)) => {
                        self.bus
                            .publish(Event::now(EventKind::Dispatching).with_service(svc.name()));
                        dispatcher.dispatch(svc, Connection::Stream(stream));
                    }
                    Err(err) => {
                        self.bus.publish(
                            Event::now(EventKind::AcceptFailed)
                                .with_service(svc.name())
                                .with_reason(err.to_string()),
                        );
                    }
                }
            }
            ReadyEvent::Datagram { index, readiness } => {
                let svc = &mut services[index];
                match readiness {
                    Ok(()) => {
                        self.bus
                            .publish(Event::now(EventKind::Dispatching).with_service(svc.name()));
                        dispatcher.dispatch(svc, Connection::Datagram);
                    }
                    Err(err) => {
                        self.bus.publish(
                            Event::now(EventKind::WaitFailed)
                                .with_service(svc.name())
                                .with_reason(err.to_string()),
                        );
                    }
                }
            }
        }
    }

    /// Subscribes to the bus and forwards events to the subscriber set.
    fn subscriber_listener(&self) {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        tokio::spawn(async move {
            while let Ok(ev) = rx.recv().await {
                set.emit(&ev);
            }
        });
    }

    /// Spawns the signal listener that reports and cancels on termination.
    fn spawn_signal_listener(&self, token: &CancellationToken) {
        let bus = self.bus.clone();
        let token = token.clone();
        tokio::spawn(async move {
            if shutdown::wait_for_shutdown_signal().await.is_ok() {
                bus.publish(Event::now(EventKind::ShutdownRequested));
            }
            token.cancel();
        });
    }

    /// Blocks until shutdown, a reap notice, or listener readiness.
    ///
    /// Priority is fixed: child termination and shutdown always win over
    /// new traffic, so a reaped WAIT service re-arms before the next
    /// readiness build.
    async fn wait_for_wake(
        &self,
        services: &[ServiceDescriptor],
        reap_rx: &mut mpsc::Receiver<ReapNotice>,
        token: &CancellationToken,
    ) -> Wake {
        // reconcile cached datagram readiness with the actual queues
        for svc in services {
            if let Some(Listener::Datagram(endpoint)) = svc.listener() {
                endpoint.resync();
            }
        }

        let mut ready_set: FuturesUnordered<Pin<Box<dyn Future<Output = ReadyEvent> + Send + '_>>> =
            FuturesUnordered::new();
        for index in readiness::eligible_indices(services) {
            match services[index].listener() {
                Some(Listener::Stream(listener)) => {
                    ready_set.push(Box::pin(async move {
                        ReadyEvent::Stream {
                            index,
                            accepted: listener.accept().await,
                        }
                    }));
                }
                Some(Listener::Datagram(endpoint)) => {
                    ready_set.push(Box::pin(async move {
                        ReadyEvent::Datagram {
                            index,
                            readiness: endpoint.wait_readable().await,
                        }
                    }));
                }
                None => {}
            }
        }

        // an empty ready set yields None once and the branch goes dormant,
        // leaving shutdown and reaping as the only wake sources
        tokio::select! {
            biased;
            _ = token.cancelled() => Wake::Shutdown,
            notice = reap_rx.recv() => Wake::Reaped(notice),
            Some(event) = ready_set.next() => Wake::Ready(event),
        }
    }

    /// Drops every provisioned listener and reports the closure.
    fn close_listeners(&self, services: &mut [ServiceDescriptor]) {
        for svc in services.iter_mut() {
            svc.close_listener();
        }
        self.bus.publish(Event::now(EventKind::ListenersClosed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::provision::provision_one;
    use crate::services::{ConcurrencyMode, ServiceConfig, Transport};

    fn descriptor(name: &str, transport: Transport) -> ServiceDescriptor {
        ServiceDescriptor::from_config(ServiceConfig {
            executable: "/bin/true".into(),
            name: name.to_string(),
            transport,
            port: 0,
            mode: ConcurrencyMode::Nowait,
        })
    }

    fn harness() -> (Supervisor, Dispatcher, tokio::sync::broadcast::Receiver<Event>) {
        let sup = Supervisor::new(Config::default(), vec![]);
        let rx = sup.bus.subscribe();
        let (tx, _reap_rx) = mpsc::channel(4);
        let dispatcher = Dispatcher::new(sup.bus.clone(), tx);
        (sup, dispatcher, rx)
    }

    #[tokio::test]
    async fn test_failed_accept_reports_without_dispatch_trace() {
        let (sup, dispatcher, mut rx) = harness();
        let mut services = vec![descriptor("streamy", Transport::Stream)];

        sup.handle_ready(
            &mut services,
            &dispatcher,
            ReadyEvent::Stream {
                index: 0,
                accepted: Err(io::Error::from_raw_os_error(libc::EMFILE)),
            },
        );

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, EventKind::AcceptFailed);
        assert_eq!(event.service.as_deref(), Some("streamy"));
    }

    #[tokio::test]
    async fn test_failed_datagram_wait_names_the_service() {
        let (sup, dispatcher, mut rx) = harness();
        let mut services = vec![descriptor("grammy", Transport::Datagram)];

        sup.handle_ready(
            &mut services,
            &dispatcher,
            ReadyEvent::Datagram {
                index: 0,
                readiness: Err(io::Error::from_raw_os_error(libc::EBADF)),
            },
        );

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, EventKind::WaitFailed);
        assert_eq!(event.service.as_deref(), Some("grammy"));
        assert!(event.reason.is_some());
    }

    #[tokio::test]
    async fn test_successful_dispatch_traces_before_spawn() {
        let (sup, dispatcher, mut rx) = harness();
        let mut services = vec![descriptor("grammy", Transport::Datagram)];
        services[0].attach_listener(provision_one(Transport::Datagram, 0, 10).unwrap());

        sup.handle_ready(
            &mut services,
            &dispatcher,
            ReadyEvent::Datagram {
                index: 0,
                readiness: Ok(()),
            },
        );

        let first = rx.recv().await.unwrap();
        assert_eq!(first.kind, EventKind::Dispatching);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.kind, EventKind::WorkerSpawned);
    }
}
