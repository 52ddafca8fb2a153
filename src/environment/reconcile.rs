use std::collections::BTreeMap;

use crate::docker::ObservedContainer;
use crate::environment::service::{ContainerPhase, Service};

/// Merge project containers back into the service map.
///
/// The logical name is the container name without its leading `/` and the
/// `<prefix>_` part. Unknown names get a blank service. Stopped containers
/// are adopted too so that purge can remove them. Returns how many
/// containers were adopted. Never starts or stops anything.
pub fn wrap_containers_as_services(
    services: &mut BTreeMap<String, Service>,
    containers: &[ObservedContainer],
    prefix: &str,
) -> usize {
    let name_prefix = format!("{}_", prefix);
    let mut adopted = 0;

    for container in containers {
        let Some(name) = container.names.iter().find_map(|n| {
            n.trim_start_matches('/')
                .strip_prefix(&name_prefix)
                .filter(|rest| !rest.is_empty())
        }) else {
            continue;
        };

        let service = services
            .entry(name.to_string())
            .or_insert_with(|| Service::blank(name));
        service.id = Some(container.id.clone());
        service.phase = if container.running {
            ContainerPhase::Running
        } else {
            ContainerPhase::Stopped
        };

        if let Some(pinned) = service.pinned_port {
            service.port = pinned;
        } else if let Some(port) = container
            .ports
            .iter()
            .filter(|p| p.ip.as_deref().is_some_and(|ip| !ip.is_empty()))
            .find_map(|p| p.public_port.filter(|&port| port != 0))
        {
            service.port = port;
        }

        tracing::debug!(
            service = %name,
            container = %container.id,
            port = service.port,
            running = container.running,
            "adopted container"
        );
        adopted += 1;
    }

    adopted
}
