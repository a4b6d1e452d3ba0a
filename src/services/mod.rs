//! Service table: descriptors and the config-line parser.
//!
//! ## Contents
//! - [`ServiceDescriptor`], [`ServiceConfig`]: the static record for one
//!   configured service and its pre-provision form
//! - [`Transport`], [`ConcurrencyMode`], [`WorkerState`]: dispatch policy
//!   and bookkeeping enums
//! - [`parser`]: config-file line parsing and the bounded loader

mod descriptor;
pub mod parser;

pub use descriptor::{ConcurrencyMode, ServiceConfig, ServiceDescriptor, Transport, WorkerState};
