//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the supervisor loop,
//! the dispatcher, reap reconciliation and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`]: event classification and payload metadata
//! - [`Bus`]: thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Supervisor`, `Dispatcher`, provisioning, `SubscriberSet`
//!   workers (overflow/panic).
//! - **Consumer**: `Supervisor::subscriber_listener()` (fans out to the
//!   `SubscriberSet`).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
