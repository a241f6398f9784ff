//! [`ContainerRuntime`] over the Docker Engine API.
//!
//! The adapter owns a Tokio runtime and blocks on each Engine API call, so
//! callers stay synchronous.

use bollard::Docker;
use bollard::models::{ContainerInspectResponse, ContainerSummary as EngineSummary};
use tracing::debug;

use super::{ContainerDetails, ContainerRuntime, ContainerSummary, LogsRequest, MountSummary};
use crate::engine::connection::{
    BuildRequest, CreateContainerRequest, EngineConnector, ExecRequest, PortPublish, PruneScope,
    PruneSummary, SocketResolver,
};
use crate::error::{ContainerError, DevctrError, Result};

/// A connected Docker-compatible engine.
pub struct DockerRuntime {
    docker: Docker,
    runtime: tokio::runtime::Runtime,
}

impl DockerRuntime {
    /// Resolve the engine socket, connect, and verify the engine answers.
    ///
    /// # Errors
    ///
    /// Returns connection or health-check errors when the engine is not
    /// reachable.
    pub fn connect<E: mockable::Env>(config_socket: Option<&str>, env: &E) -> Result<Self> {
        let runtime = EngineConnector::create_runtime()?;
        let resolver = SocketResolver::new(env);
        let docker =
            EngineConnector::connect_with_fallback_and_verify(&runtime, config_socket, &resolver)?;
        Ok(Self { docker, runtime })
    }

    fn inspect_response(&self, name: &str) -> Result<Option<ContainerInspectResponse>> {
        match self
            .runtime
            .block_on(EngineConnector::inspect_container_async(&self.docker, name))
        {
            Ok(response) => Ok(Some(response)),
            Err(error) if error.is_not_found() => Ok(None),
            Err(error) => Err(error),
        }
    }
}

impl ContainerRuntime for DockerRuntime {
    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.inspect_response(name)?.is_some())
    }

    fn running(&self, name: &str) -> Result<bool> {
        Ok(self
            .inspect_response(name)?
            .is_some_and(|response| is_running(&response)))
    }

    fn create(&self, request: &CreateContainerRequest) -> Result<()> {
        let id = self
            .runtime
            .block_on(EngineConnector::create_container_async(&self.docker, request))?;
        debug!(container = request.name(), id = %id, "container created");
        self.start(request.name())
    }

    fn start(&self, name: &str) -> Result<()> {
        self.runtime
            .block_on(EngineConnector::start_container_async(&self.docker, name))
    }

    fn stop(&self, name: &str, timeout_secs: u64) -> Result<()> {
        self.runtime.block_on(EngineConnector::stop_container_async(
            &self.docker,
            name,
            timeout_secs,
        ))
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.runtime.block_on(EngineConnector::remove_container_async(
            &self.docker,
            name,
            false,
        ))
    }

    fn exec(&self, request: &ExecRequest) -> Result<i64> {
        let result = self
            .runtime
            .block_on(EngineConnector::exec_async(&self.docker, request))?;
        debug!(
            container = request.container(),
            exec_id = result.exec_id(),
            exit_code = result.exit_code(),
            "exec finished"
        );
        Ok(result.exit_code())
    }

    fn inspect_ports(&self, name: &str) -> Result<Vec<PortPublish>> {
        let response = self
            .runtime
            .block_on(EngineConnector::inspect_container_async(&self.docker, name))?;
        Ok(configured_ports(&response))
    }

    fn update_remove_publish(&self, name: &str, port: &PortPublish) -> Result<()> {
        Err(DevctrError::from(ContainerError::UpdateFailed {
            container_id: String::from(name),
            message: format!(
                "the engine cannot unpublish host port {} from an existing container; \
                 run `dev delete` to recreate it",
                port.host_port
            ),
        }))
    }

    fn inspect(&self, name: &str) -> Result<ContainerDetails> {
        let response = self
            .runtime
            .block_on(EngineConnector::inspect_container_async(&self.docker, name))?;
        Ok(details_from_inspect(name, &response))
    }

    fn image_created(&self, image: &str) -> Result<Option<String>> {
        match self
            .runtime
            .block_on(EngineConnector::inspect_image_async(&self.docker, image))
        {
            Ok(inspect) => Ok(Some(inspect.created.unwrap_or_default())),
            Err(error) if error.is_not_found() => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn list(&self, prefix: &str) -> Result<Vec<ContainerSummary>> {
        let containers = self
            .runtime
            .block_on(EngineConnector::list_containers_async(&self.docker))?;
        Ok(summaries_with_prefix(containers, prefix))
    }

    fn logs(&self, name: &str, request: &LogsRequest) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        self.runtime.block_on(EngineConnector::stream_logs_async(
            &self.docker,
            name,
            request.follow,
            request.tail,
            &mut stdout,
        ))
    }

    fn prune(&self, scope: PruneScope) -> Result<PruneSummary> {
        self.runtime
            .block_on(EngineConnector::prune_async(&self.docker, scope))
    }

    fn build(&self, request: &BuildRequest) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        self.runtime.block_on(EngineConnector::build_image_async(
            &self.docker,
            request,
            &mut stdout,
        ))
    }
}

fn is_running(response: &ContainerInspectResponse) -> bool {
    response
        .state
        .as_ref()
        .and_then(|state| state.running)
        .unwrap_or(false)
}

/// Host port bindings from the container's host configuration, by host port.
pub(super) fn configured_ports(response: &ContainerInspectResponse) -> Vec<PortPublish> {
    let Some(bindings) = response
        .host_config
        .as_ref()
        .and_then(|host| host.port_bindings.as_ref())
    else {
        return Vec::new();
    };

    let mut ports: Vec<PortPublish> = bindings
        .iter()
        .flat_map(|(container_port, published)| {
            published
                .iter()
                .flatten()
                .filter_map(|binding| binding.host_port.as_deref()?.parse::<u16>().ok())
                .map(|host_port| PortPublish {
                    host_port,
                    container_port: container_port.clone(),
                })
        })
        .collect();
    ports.sort_by(|left, right| {
        (left.host_port, &left.container_port).cmp(&(right.host_port, &right.container_port))
    });
    ports
}

pub(super) fn details_from_inspect(
    name: &str,
    response: &ContainerInspectResponse,
) -> ContainerDetails {
    let ip_address = response
        .network_settings
        .as_ref()
        .and_then(|settings| settings.networks.as_ref())
        .and_then(|networks| {
            let mut addresses: Vec<&String> = networks
                .values()
                .filter_map(|endpoint| endpoint.ip_address.as_ref())
                .filter(|address| !address.is_empty())
                .collect();
            addresses.sort();
            addresses.first().map(|address| (*address).clone())
        });

    let mounts = response
        .mounts
        .iter()
        .flatten()
        .map(|mount| MountSummary {
            source: mount.source.clone().unwrap_or_default(),
            destination: mount.destination.clone().unwrap_or_default(),
            mode: mount.mode.clone().unwrap_or_default(),
        })
        .collect();

    ContainerDetails {
        name: String::from(name),
        running: is_running(response),
        started_at: response
            .state
            .as_ref()
            .and_then(|state| state.started_at.clone()),
        ip_address,
        ports: configured_ports(response),
        mounts,
    }
}

/// Engine names carry a leading `/`; containers without a name are skipped.
pub(super) fn summaries_with_prefix(
    containers: Vec<EngineSummary>,
    prefix: &str,
) -> Vec<ContainerSummary> {
    let mut matched: Vec<ContainerSummary> = containers
        .into_iter()
        .filter_map(|container| {
            let name = container
                .names
                .as_ref()?
                .iter()
                .map(|name| name.trim_start_matches('/'))
                .find(|name| name.starts_with(prefix))?
                .to_owned();
            let status = container.status.unwrap_or_default();
            Some(ContainerSummary {
                name,
                running: status.starts_with("Up"),
                status,
            })
        })
        .collect();
    matched.sort_by(|left, right| left.name.cmp(&right.name));
    matched
}

#[cfg(test)]
mod tests;
