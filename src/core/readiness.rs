//! # Eligibility filter for the wait step.
//!
//! A service participates in the readiness wait only when it holds a
//! provisioned listener and has no suspended worker. A WAIT service with
//! a running worker is excluded so the kernel queues traffic until the
//! worker exits and the service is re-armed.

use crate::services::ServiceDescriptor;

/// Indices of services eligible for readiness monitoring.
pub fn eligible_indices(services: &[ServiceDescriptor]) -> Vec<usize> {
    services
        .iter()
        .enumerate()
        .filter(|(_, svc)| svc.is_eligible())
        .map(|(index, _)| index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::provision::provision_one;
    use crate::services::{ConcurrencyMode, ServiceConfig, Transport};

    fn descriptor(name: &str, mode: ConcurrencyMode) -> ServiceDescriptor {
        ServiceDescriptor::from_config(ServiceConfig {
            executable: "/bin/true".into(),
            name: name.to_string(),
            transport: Transport::Stream,
            port: 0,
            mode,
        })
    }

    #[tokio::test]
    async fn test_unprovisioned_services_are_skipped() {
        let services = vec![descriptor("a", ConcurrencyMode::Wait)];
        assert!(eligible_indices(&services).is_empty());
    }

    #[tokio::test]
    async fn test_suspended_service_is_excluded_until_idle() {
        let mut services = vec![
            descriptor("a", ConcurrencyMode::Wait),
            descriptor("b", ConcurrencyMode::Wait),
        ];
        for svc in services.iter_mut() {
            svc.attach_listener(provision_one(Transport::Stream, 0, 10).unwrap());
        }
        assert_eq!(eligible_indices(&services), vec![0, 1]);

        services[0].set_running(4242);
        assert_eq!(eligible_indices(&services), vec![1]);

        services[0].set_idle();
        assert_eq!(eligible_indices(&services), vec![0, 1]);
    }
}
