//! # netvisor
//!
//! **netvisor** is a single-process network super-server: it reads a static
//! table of service descriptors, opens one listening socket per service, and
//! multiplexes readiness across all of them in a single dispatch loop. On
//! readiness it hands the connection to an external worker executable,
//! either spawning a fresh worker per event (`NOWAIT`) or serializing
//! dispatch until the previous worker exits (`WAIT`).
//!
//! ## Architecture
//! ```text
//!  initd.conf.txt ──► parser ──► ServiceDescriptor table (static, max 10)
//!                                       │
//!                                       ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Supervisor (dispatch loop, single-threaded)                    │
//! │  - provisions one listening socket per service (once)           │
//! │  - each iteration: readiness set → select → dispatch            │
//! │  - reap channel: worker exits reconcile WAIT bookkeeping        │
//! │  - termination signals close every listener and exit            │
//! └──────┬──────────────────────┬───────────────────────┬───────────┘
//!        ▼                      ▼                       ▼
//!   worker process        worker process          worker process
//!   (stdin/stdout =       (one at a time          (untracked, any
//!    the connection)       for WAIT services)      number for NOWAIT)
//!        │                      │                       │
//!        └── exit ──► watcher task ──► ReapNotice ──► Supervisor
//!
//!  Every lifecycle step publishes an Event on the Bus; subscribers
//!  (e.g. ConsoleWriter) consume them via the SubscriberSet fan-out.
//! ```
//!
//! ## Concurrency model
//! The descriptor table is owned exclusively by the dispatch loop; child
//! terminations are funneled through an mpsc channel rather than mutated
//! from signal context, so worker-state observations are atomic by
//! construction. The loop is the only place that blocks, and it always
//! observes a reap before re-classifying readiness.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use netvisor::{Config, ConsoleWriter, ServiceDescriptor, Subscribe, Supervisor};
//! use netvisor::services::parser;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::default();
//!     let loaded = parser::load_services(&cfg.config_path, cfg.max_services_clamped())?;
//!     let services: Vec<ServiceDescriptor> = loaded
//!         .services
//!         .into_iter()
//!         .map(ServiceDescriptor::from_config)
//!         .collect();
//!
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(ConsoleWriter::new(true))];
//!     let sup = Supervisor::new(cfg, subs);
//!     sup.run(services).await?;
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;

pub mod events;
pub mod services;
pub mod subscribers;

// ---- Public re-exports ----

pub use config::Config;
pub use crate::core::Supervisor;
pub use error::{ParseError, RuntimeError, ServiceError};
pub use events::{Bus, Event, EventKind};
pub use services::parser::{load_services, LoadOutcome};
pub use services::{ConcurrencyMode, ServiceConfig, ServiceDescriptor, Transport, WorkerState};
pub use subscribers::{ConsoleWriter, Subscribe, SubscriberSet};
