//! Host port negotiation.
//!
//! A requested host port is only published when nothing else holds it right
//! now. The check binds the port and releases it immediately, so another
//! process can still grab it before the engine does; a clash at that point
//! surfaces as a create or start failure.

use std::net::{Ipv4Addr, TcpListener};

use tracing::warn;

use crate::engine::PortPublish;

/// Answers whether a host port is free.
pub trait PortChecker {
    /// Whether `port` can currently be bound on all interfaces.
    fn is_free(&self, port: u16) -> bool;
}

/// Checks ports by binding `0.0.0.0:<port>` over TCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpPortChecker;

impl PortChecker for TcpPortChecker {
    fn is_free(&self, port: u16) -> bool {
        TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).is_ok()
    }
}

/// Why a configured port entry was not published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Another process holds the host port.
    InUse(u16),
    /// The entry is not `HOST:CONTAINER` with a valid host port.
    Invalid,
}

/// The decision for one configured port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortMapping {
    /// Publish the port.
    Publish(PortPublish),
    /// Leave the entry out of a new container.
    Skip {
        /// The descriptor entry as written.
        entry: String,
        /// Why it was left out.
        reason: SkipReason,
    },
    /// Drop the binding from an existing container.
    Unpublish(PortPublish),
}

impl PortMapping {
    /// The port to publish, if this mapping publishes one.
    #[must_use]
    pub const fn published(&self) -> Option<&PortPublish> {
        match self {
            Self::Publish(port) => Some(port),
            Self::Skip { .. } | Self::Unpublish(_) => None,
        }
    }
}

/// Parse a `HOST:CONTAINER` descriptor entry.
///
/// # Errors
///
/// Returns [`SkipReason::Invalid`] when the host port is not a non-zero
/// `u16` or the container side is empty.
pub fn parse_port_entry(entry: &str) -> Result<PortPublish, SkipReason> {
    let (host, container) = entry.split_once(':').ok_or(SkipReason::Invalid)?;
    let host_port = host
        .trim()
        .parse::<u16>()
        .ok()
        .filter(|port| *port != 0)
        .ok_or(SkipReason::Invalid)?;
    let container_port = container.trim();
    if container_port.is_empty() {
        return Err(SkipReason::Invalid);
    }
    Ok(PortPublish {
        host_port,
        container_port: container_port.to_owned(),
    })
}

/// Decide which descriptor ports a new container publishes.
#[must_use]
pub fn negotiate_create<P: PortChecker>(entries: &[String], checker: &P) -> Vec<PortMapping> {
    entries
        .iter()
        .map(|entry| match parse_port_entry(entry) {
            Ok(port) if checker.is_free(port.host_port) => PortMapping::Publish(port),
            Ok(port) => {
                warn!(
                    "Port {} is already in use on the host; not publishing {entry}.",
                    port.host_port
                );
                PortMapping::Skip {
                    entry: entry.clone(),
                    reason: SkipReason::InUse(port.host_port),
                }
            }
            Err(reason) => {
                warn!("Port entry '{entry}' is not HOST:CONTAINER. Ignored.");
                PortMapping::Skip {
                    entry: entry.clone(),
                    reason,
                }
            }
        })
        .collect()
}

/// Decide which bindings of an existing container must be dropped before
/// it can start.
#[must_use]
pub fn negotiate_start_existing<P: PortChecker>(
    configured: &[PortPublish],
    checker: &P,
) -> Vec<PortMapping> {
    configured
        .iter()
        .map(|port| {
            if checker.is_free(port.host_port) {
                PortMapping::Publish(port.clone())
            } else {
                warn!(
                    "Port {} is already in use on the host; unpublishing it.",
                    port.host_port
                );
                PortMapping::Unpublish(port.clone())
            }
        })
        .collect()
}

/// Ports to publish from a set of decisions.
#[must_use]
pub fn published_ports(mappings: &[PortMapping]) -> Vec<PortPublish> {
    mappings
        .iter()
        .filter_map(PortMapping::published)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rstest::rstest;

    use super::*;

    struct ScriptedPorts {
        busy: HashSet<u16>,
    }

    impl ScriptedPorts {
        fn busy(ports: &[u16]) -> Self {
            Self {
                busy: ports.iter().copied().collect(),
            }
        }
    }

    impl PortChecker for ScriptedPorts {
        fn is_free(&self, port: u16) -> bool {
            !self.busy.contains(&port)
        }
    }

    fn publish(host_port: u16, container_port: &str) -> PortPublish {
        PortPublish {
            host_port,
            container_port: String::from(container_port),
        }
    }

    #[rstest]
    #[case("8080:80", Ok(publish(8080, "80")))]
    #[case(" 5353 : 53/udp ", Ok(publish(5353, "53/udp")))]
    #[case("8080", Err(SkipReason::Invalid))]
    #[case("http:80", Err(SkipReason::Invalid))]
    #[case("70000:80", Err(SkipReason::Invalid))]
    #[case("0:80", Err(SkipReason::Invalid))]
    #[case("8080:", Err(SkipReason::Invalid))]
    fn entries_parse_as_host_and_container(
        #[case] entry: &str,
        #[case] expected: Result<PortPublish, SkipReason>,
    ) {
        assert_eq!(parse_port_entry(entry), expected);
    }

    #[rstest]
    fn create_publishes_free_ports_and_skips_busy_ones() {
        let entries = vec![
            String::from("8080:80"),
            String::from("5432:5432"),
            String::from("nonsense"),
        ];

        let mappings = negotiate_create(&entries, &ScriptedPorts::busy(&[5432]));

        assert_eq!(
            mappings,
            vec![
                PortMapping::Publish(publish(8080, "80")),
                PortMapping::Skip {
                    entry: String::from("5432:5432"),
                    reason: SkipReason::InUse(5432),
                },
                PortMapping::Skip {
                    entry: String::from("nonsense"),
                    reason: SkipReason::Invalid,
                },
            ]
        );
        assert_eq!(published_ports(&mappings), vec![publish(8080, "80")]);
    }

    #[rstest]
    fn create_skips_a_port_held_by_a_real_listener() {
        let listener =
            TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0)).expect("ephemeral bind should succeed");
        let port = listener
            .local_addr()
            .expect("bound listener has an address")
            .port();

        let mappings = negotiate_create(&[format!("{port}:80")], &TcpPortChecker);

        assert_eq!(
            mappings,
            vec![PortMapping::Skip {
                entry: format!("{port}:80"),
                reason: SkipReason::InUse(port),
            }]
        );
        drop(listener);
    }

    #[rstest]
    fn create_publishes_a_released_port() {
        let port = {
            let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0))
                .expect("ephemeral bind should succeed");
            listener
                .local_addr()
                .expect("bound listener has an address")
                .port()
        };

        let mappings = negotiate_create(&[format!("{port}:80")], &TcpPortChecker);

        assert_eq!(mappings, vec![PortMapping::Publish(publish(port, "80"))]);
    }

    #[rstest]
    fn duplicate_entries_are_each_decided() {
        let entries = vec![String::from("8080:80"), String::from("8080:80")];
        let mappings = negotiate_create(&entries, &ScriptedPorts::busy(&[]));
        assert_eq!(mappings.len(), 2);
    }

    #[rstest]
    fn start_existing_unpublishes_busy_bindings() {
        let configured = vec![publish(8080, "80/tcp"), publish(3000, "3000/tcp")];

        let mappings = negotiate_start_existing(&configured, &ScriptedPorts::busy(&[3000]));

        assert_eq!(
            mappings,
            vec![
                PortMapping::Publish(publish(8080, "80/tcp")),
                PortMapping::Unpublish(publish(3000, "3000/tcp")),
            ]
        );
    }
}
