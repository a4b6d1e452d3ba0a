//! Runtime core: provisioning, readiness, dispatch and reaping.
//!
//! The only public API from this module is [`Supervisor`], which owns the
//! dispatch loop. Internal modules:
//! - [`provision`]: turns descriptors into bound, listening sockets;
//! - [`readiness`]: computes the set of listeners eligible for the wait;
//! - [`dispatch`]: accepts (stream only) and spawns the worker process;
//! - [`reaper`]: per-child watcher tasks and WAIT-state reconciliation;
//! - [`shutdown`]: termination signal handling;
//! - [`supervisor`]: the loop tying the above together.

mod dispatch;
pub(crate) mod provision;
mod readiness;
mod reaper;
mod shutdown;
mod supervisor;

pub use supervisor::Supervisor;
