use std::collections::BTreeMap;
use std::net::TcpListener;

use crate::environment::Service;

#[derive(Debug, PartialEq, Eq)]
pub struct PortConflict {
    pub service: String,
    pub port: u16,
}

impl std::fmt::Display for PortConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Port {} required by '{}' is already in use",
            self.port, self.service
        )
    }
}

pub fn check_port_available(port: u16) -> bool {
    TcpListener::bind(("127.0.0.1", port)).is_ok()
}

/// Ports that must be free before startup: the proxy port and the host
/// port of every container that is about to be created. Services adopted
/// while running already hold their ports and are skipped.
pub fn check_startup_ports(services: &BTreeMap<String, Service>, proxy_port: u16) -> Vec<PortConflict> {
    let mut wanted: Vec<(String, u16)> = vec![("proxy".to_string(), proxy_port)];
    for service in services.values() {
        if service.is_running() {
            continue;
        }
        let Some(spec) = &service.spec else {
            continue;
        };
        for pm in &spec.port_maps {
            wanted.push((service.name.clone(), pm.host_port));
        }
    }

    wanted
        .into_iter()
        .filter(|(_, port)| *port != 0 && !check_port_available(*port))
        .map(|(service, port)| PortConflict { service, port })
        .collect()
}

pub fn format_port_conflicts(conflicts: &[PortConflict]) -> String {
    let mut msg = String::from("Port conflicts detected:\n");
    for c in conflicts {
        msg.push_str(&format!("  - {}\n", c));
    }
    msg.push_str("\nStop the processes holding these ports or change them in nhost/config.toml.");
    msg
}
