//! # Console subscriber.
//!
//! [`ConsoleWriter`] prints events in a human-readable single-line format.
//! Failures always go to stderr; lifecycle traces go to stdout only in
//! verbose mode, with no effect on dispatch behavior.
//!
//! ## Output format
//! ```text
//! [provisioned] service=echoservice port=9007 fd=5
//! [dispatching] service=echoservice
//! [spawned] service=echoservice pid=4242
//! [suspended] service=worker pid=4243
//! [reaped] pid=4243 service=worker
//! [reaped] pid=4242 service=-
//! [shutdown-requested]
//! [listeners-closed]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Prints failures to stderr and, in verbose mode, lifecycle traces to
/// stdout.
pub struct ConsoleWriter {
    verbose: bool,
}

impl ConsoleWriter {
    /// Creates a console writer; `verbose` enables lifecycle tracing.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn service_of(event: &Event) -> &str {
        event.service.as_deref().unwrap_or("-")
    }
}

#[async_trait]
impl Subscribe for ConsoleWriter {
    async fn on_event(&self, event: &Event) {
        if event.is_failure() {
            let reason = event.reason.as_deref().unwrap_or("unknown");
            match event.kind {
                EventKind::ProvisionFailed => {
                    eprintln!("[provision-failed] service={} reason={reason}", Self::service_of(event));
                }
                EventKind::AcceptFailed => {
                    eprintln!("[accept-failed] service={} reason={reason}", Self::service_of(event));
                }
                EventKind::SpawnFailed => {
                    eprintln!("[spawn-failed] service={} reason={reason}", Self::service_of(event));
                }
                EventKind::WaitFailed => {
                    eprintln!("[wait-failed] reason={reason}");
                }
                EventKind::SubscriberOverflow => {
                    eprintln!("[subscriber-overflow] subscriber={} reason={reason}", Self::service_of(event));
                }
                EventKind::SubscriberPanicked => {
                    eprintln!("[subscriber-panicked] subscriber={} reason={reason}", Self::service_of(event));
                }
                _ => {}
            }
            return;
        }

        if !self.verbose {
            return;
        }

        match event.kind {
            EventKind::ServiceProvisioned => {
                println!(
                    "[provisioned] service={} port={} fd={}",
                    Self::service_of(event),
                    event.port.unwrap_or(0),
                    event.fd.unwrap_or(-1),
                );
            }
            EventKind::Dispatching => {
                println!("[dispatching] service={}", Self::service_of(event));
            }
            EventKind::WorkerSpawned => {
                println!(
                    "[spawned] service={} pid={}",
                    Self::service_of(event),
                    event.pid.unwrap_or(0),
                );
            }
            EventKind::ServiceSuspended => {
                println!(
                    "[suspended] service={} pid={}",
                    Self::service_of(event),
                    event.pid.unwrap_or(0),
                );
            }
            EventKind::WorkerReaped => {
                println!(
                    "[reaped] pid={} service={}",
                    event.pid.unwrap_or(0),
                    Self::service_of(event),
                );
            }
            EventKind::ShutdownRequested => {
                println!("[shutdown-requested]");
            }
            EventKind::ListenersClosed => {
                println!("[listeners-closed]");
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "console"
    }
}
