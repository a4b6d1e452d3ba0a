//! # Child reaping.
//!
//! Every spawned worker gets a watcher task that awaits its exit and
//! funnels a [`ReapNotice`] into a single channel owned by the dispatch
//! loop. Reaping never touches the service table directly: the loop
//! receives the notice and calls [`reconcile`] while it holds exclusive
//! access to the descriptors. Signal handlers are not involved.

use std::io;
use std::process::ExitStatus;

use tokio::process::Child;
use tokio::sync::mpsc;

use crate::services::{ConcurrencyMode, ServiceDescriptor, WorkerState};

/// Exit notification for one worker process.
pub struct ReapNotice {
    pub pid: u32,
    pub outcome: io::Result<ExitStatus>,
}

/// Spawns the watcher task for one worker.
pub fn watch(mut child: Child, pid: u32, tx: mpsc::Sender<ReapNotice>) {
    tokio::spawn(async move {
        let outcome = child.wait().await;
        let _ = tx.send(ReapNotice { pid, outcome }).await;
    });
}

/// Applies a worker exit to the service table.
///
/// When the exiting pid belongs to a suspended WAIT service, that service
/// is returned to idle and its name is returned so the caller can report
/// the re-arm. NOWAIT workers are never recorded in the table, so their
/// exits reconcile to `None`.
pub fn reconcile(services: &mut [ServiceDescriptor], pid: u32) -> Option<String> {
    for svc in services.iter_mut() {
        if svc.mode() == ConcurrencyMode::Wait && svc.worker() == WorkerState::Running(pid) {
            svc.set_idle();
            return Some(svc.name().to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{ServiceConfig, Transport, WorkerState};

    fn descriptor(name: &str, mode: ConcurrencyMode) -> ServiceDescriptor {
        ServiceDescriptor::from_config(ServiceConfig {
            executable: "/bin/true".into(),
            name: name.to_string(),
            transport: Transport::Stream,
            port: 0,
            mode,
        })
    }

    #[test]
    fn test_reconcile_rearms_matching_wait_service() {
        let mut services = vec![
            descriptor("a", ConcurrencyMode::Wait),
            descriptor("b", ConcurrencyMode::Wait),
        ];
        services[1].set_running(4242);

        let rearmed = reconcile(&mut services, 4242);
        assert_eq!(rearmed.as_deref(), Some("b"));
        assert_eq!(services[1].worker(), WorkerState::Idle);
    }

    #[test]
    fn test_reconcile_ignores_unknown_pid() {
        let mut services = vec![descriptor("a", ConcurrencyMode::Wait)];
        services[0].set_running(4242);

        assert_eq!(reconcile(&mut services, 9999), None);
        assert_eq!(services[0].worker(), WorkerState::Running(4242));
    }

    #[test]
    fn test_reconcile_is_none_for_nowait_workers() {
        let mut services = vec![descriptor("a", ConcurrencyMode::Nowait)];
        assert_eq!(reconcile(&mut services, 4242), None);
    }
}
