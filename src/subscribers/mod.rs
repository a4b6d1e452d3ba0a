//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`]
//! fan-out, and the built-in [`ConsoleWriter`].
//!
//! ## Event flow
//! ```text
//! loop / dispatcher ── publish(Event) ──► Bus ──► Supervisor listener
//!                                                      │
//!                                                SubscriberSet::emit()
//!                                              ┌───────┼────────┐
//!                                              ▼       ▼        ▼
//!                                        ConsoleWriter custom  ...
//! ```
//!
//! Subscribers run on dedicated worker tasks fed by bounded queues; a
//! slow or panicking subscriber never blocks the dispatch loop or its
//! peers.

mod console;
mod subscribe;
mod subscriber_set;

pub use console::ConsoleWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
