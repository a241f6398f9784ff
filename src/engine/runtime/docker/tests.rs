//! Unit tests for translating engine responses into runtime views.

use std::collections::HashMap;

use bollard::models::{
    ContainerInspectResponse, ContainerState, ContainerSummary as EngineSummary,
    EndpointSettings, HostConfig, MountPoint, NetworkSettings, PortBinding,
};
use rstest::{fixture, rstest};

use super::*;

fn binding(host_port: &str) -> PortBinding {
    PortBinding {
        host_ip: Some(String::from("0.0.0.0")),
        host_port: Some(String::from(host_port)),
    }
}

#[fixture]
fn running_response() -> ContainerInspectResponse {
    let port_bindings = HashMap::from([
        (String::from("80/tcp"), Some(vec![binding("8080")])),
        (String::from("5432/tcp"), Some(vec![binding("5432")])),
        (String::from("9000/tcp"), None),
        (String::from("53/udp"), Some(vec![binding("")])),
    ]);
    let networks = HashMap::from([(
        String::from("bridge"),
        EndpointSettings {
            ip_address: Some(String::from("172.17.0.4")),
            ..EndpointSettings::default()
        },
    )]);

    ContainerInspectResponse {
        state: Some(ContainerState {
            running: Some(true),
            started_at: Some(String::from("2026-10-16T08:00:00Z")),
            ..ContainerState::default()
        }),
        host_config: Some(HostConfig {
            port_bindings: Some(port_bindings),
            ..HostConfig::default()
        }),
        network_settings: Some(NetworkSettings {
            networks: Some(networks),
            ..NetworkSettings::default()
        }),
        mounts: Some(vec![MountPoint {
            source: Some(String::from("/home/alice/src")),
            destination: Some(String::from("/home/me/src")),
            mode: Some(String::from("ro")),
            ..MountPoint::default()
        }]),
        ..ContainerInspectResponse::default()
    }
}

#[rstest]
fn configured_ports_are_sorted_and_skip_unbound_entries(
    running_response: ContainerInspectResponse,
) {
    let ports = configured_ports(&running_response);

    assert_eq!(
        ports,
        vec![
            PortPublish {
                host_port: 5432,
                container_port: String::from("5432/tcp"),
            },
            PortPublish {
                host_port: 8080,
                container_port: String::from("80/tcp"),
            },
        ]
    );
}

#[rstest]
fn configured_ports_are_empty_without_host_config() {
    assert!(configured_ports(&ContainerInspectResponse::default()).is_empty());
}

#[rstest]
fn details_collect_state_network_and_mounts(running_response: ContainerInspectResponse) {
    let details = details_from_inspect("dev-1a2b3c4d", &running_response);

    assert_eq!(details.name, "dev-1a2b3c4d");
    assert!(details.running);
    assert_eq!(details.started_at.as_deref(), Some("2026-10-16T08:00:00Z"));
    assert_eq!(details.ip_address.as_deref(), Some("172.17.0.4"));
    assert_eq!(details.ports.len(), 2);
    assert_eq!(
        details.mounts,
        vec![MountSummary {
            source: String::from("/home/alice/src"),
            destination: String::from("/home/me/src"),
            mode: String::from("ro"),
        }]
    );
}

#[rstest]
fn details_of_a_bare_response_are_stopped() {
    let details = details_from_inspect("dev-main", &ContainerInspectResponse::default());
    assert!(!details.running);
    assert!(details.ip_address.is_none());
    assert!(details.mounts.is_empty());
}

fn summary(name: &str, status: &str) -> EngineSummary {
    EngineSummary {
        names: Some(vec![format!("/{name}")]),
        status: Some(String::from(status)),
        ..EngineSummary::default()
    }
}

#[rstest]
fn summaries_keep_only_prefixed_names_in_order() {
    let containers = vec![
        summary("dev-main", "Exited (0) 2 days ago"),
        summary("postgres", "Up 3 hours"),
        summary("dev-1a2b3c4d", "Up 5 minutes"),
        EngineSummary::default(),
    ];

    let matched = summaries_with_prefix(containers, "dev-");

    assert_eq!(
        matched,
        vec![
            ContainerSummary {
                name: String::from("dev-1a2b3c4d"),
                running: true,
                status: String::from("Up 5 minutes"),
            },
            ContainerSummary {
                name: String::from("dev-main"),
                running: false,
                status: String::from("Exited (0) 2 days ago"),
            },
        ]
    );
}
