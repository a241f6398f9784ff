//! Development container creation.
//!
//! This module translates a session's mounts, published ports, environment,
//! and host options into a `Bollard` container-create payload. The container
//! keeps a terminal and open stdin so its default shell stays alive between
//! attached sessions.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use bollard::Docker;
use bollard::models::{ContainerCreateBody, ContainerCreateResponse, HostConfig, PortBinding};
use bollard::query_parameters::{CreateContainerOptions, CreateContainerOptionsBuilder};

use super::EngineConnector;
use super::error_classification::classify_create_error;
use crate::config::ContainerConfig;
use crate::error::{ConfigError, DevctrError};

const DEFAULT_PROTOCOL: &str = "tcp";
const ALL_INTERFACES: &str = "0.0.0.0";

/// Boxed future type returned by [`ContainerCreator`] implementors.
pub type CreateContainerFuture<'a> = Pin<
    Box<dyn Future<Output = Result<ContainerCreateResponse, bollard::errors::Error>> + Send + 'a>,
>;

/// Behaviour required to create a container via a backing engine client.
pub trait ContainerCreator {
    /// Create a container from `Bollard` options and body payload.
    fn create_container(
        &self,
        options: Option<CreateContainerOptions>,
        config: ContainerCreateBody,
    ) -> CreateContainerFuture<'_>;
}

impl ContainerCreator for Docker {
    fn create_container(
        &self,
        options: Option<CreateContainerOptions>,
        config: ContainerCreateBody,
    ) -> CreateContainerFuture<'_> {
        Box::pin(async move { Self::create_container(self, options, config).await })
    }
}

/// Host-level options applied at create time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HostOptions {
    /// Network mode, e.g. `bridge` or `host`.
    pub network: String,

    /// Linux capabilities to add.
    pub cap_add: Vec<String>,

    /// Engine security options such as `seccomp=unconfined`.
    pub security_opt: Vec<String>,
}

impl HostOptions {
    /// Build host options from the `[container]` configuration table.
    #[must_use]
    pub fn from_container_config(container: &ContainerConfig) -> Self {
        Self {
            network: container.network.clone(),
            cap_add: container.cap_add.clone(),
            security_opt: container.security_opt.clone(),
        }
    }
}

/// A host port published to a container port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortPublish {
    /// Host port bound on all interfaces.
    pub host_port: u16,

    /// Container port, optionally with a `/protocol` suffix.
    pub container_port: String,
}

impl PortPublish {
    /// Engine port key, e.g. `80/tcp`.
    #[must_use]
    pub fn port_key(&self) -> String {
        if self.container_port.contains('/') {
            self.container_port.clone()
        } else {
            format!("{}/{DEFAULT_PROTOCOL}", self.container_port)
        }
    }
}

/// Container-creation request parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateContainerRequest {
    image: String,
    name: String,
    binds: Vec<String>,
    ports: Vec<PortPublish>,
    env: Vec<String>,
    working_dir: Option<String>,
    host: HostOptions,
}

impl CreateContainerRequest {
    /// Create a request for the named container.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRequired` when `image` or `name` is empty
    /// or whitespace-only.
    pub fn new(image: impl Into<String>, name: impl Into<String>) -> Result<Self, DevctrError> {
        let image_value = image.into();
        let name_value = name.into();

        Ok(Self {
            image: String::from(validate_required("image", &image_value)?),
            name: String::from(validate_required("name", &name_value)?),
            binds: Vec::new(),
            ports: Vec::new(),
            env: Vec::new(),
            working_dir: None,
            host: HostOptions::default(),
        })
    }

    /// Attach bind mounts in `host:container[:options]` form.
    #[must_use]
    pub fn with_binds(mut self, binds: Vec<String>) -> Self {
        self.binds = binds;
        self
    }

    /// Attach published ports.
    #[must_use]
    pub fn with_ports(mut self, ports: Vec<PortPublish>) -> Self {
        self.ports = ports;
        self
    }

    /// Attach environment entries in `KEY=value` form.
    #[must_use]
    pub fn with_env(mut self, env: Vec<String>) -> Self {
        self.env = env;
        self
    }

    /// Set the container's initial working directory.
    #[must_use]
    pub fn with_working_dir(mut self, working_dir: Option<String>) -> Self {
        self.working_dir = working_dir.filter(|dir| !dir.trim().is_empty());
        self
    }

    /// Apply host-level options.
    #[must_use]
    pub fn with_host_options(mut self, host: HostOptions) -> Self {
        self.host = host;
        self
    }

    /// Return the configured image.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Return the container name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the bind mounts.
    #[must_use]
    pub fn binds(&self) -> &[String] {
        &self.binds
    }

    /// Return the published ports.
    #[must_use]
    pub fn ports(&self) -> &[PortPublish] {
        &self.ports
    }

    /// Return the environment list.
    #[must_use]
    pub fn env(&self) -> &[String] {
        &self.env
    }

    /// Return the working directory, if any.
    #[must_use]
    pub fn working_dir(&self) -> Option<&str> {
        self.working_dir.as_deref()
    }

    /// Return the host options.
    #[must_use]
    pub const fn host(&self) -> &HostOptions {
        &self.host
    }
}

impl EngineConnector {
    /// Create a container using a provided client abstraction.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::AlreadyExists` when the name is taken and
    /// `ContainerError::CreateFailed` for any other rejection.
    pub async fn create_container_async<C: ContainerCreator>(
        creator: &C,
        request: &CreateContainerRequest,
    ) -> Result<String, DevctrError> {
        let options = build_create_options(request.name());
        let config = build_create_body(request);

        let response = creator
            .create_container(Some(options), config)
            .await
            .map_err(|error| DevctrError::from(classify_create_error(&error, request.name())))?;

        Ok(response.id)
    }
}

fn validate_required<'a>(field: &str, value: &'a str) -> Result<&'a str, DevctrError> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(DevctrError::from(ConfigError::MissingRequired {
            field: String::from(field),
        }));
    }

    Ok(trimmed)
}

fn build_create_options(name: &str) -> CreateContainerOptions {
    CreateContainerOptionsBuilder::new().name(name).build()
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}

fn build_create_body(request: &CreateContainerRequest) -> ContainerCreateBody {
    ContainerCreateBody {
        image: Some(String::from(request.image())),
        env: non_empty(request.env()),
        working_dir: request.working_dir().map(String::from),
        tty: Some(true),
        open_stdin: Some(true),
        host_config: Some(build_host_config(request)),
        ..ContainerCreateBody::default()
    }
}

fn build_host_config(request: &CreateContainerRequest) -> HostConfig {
    let host = request.host();
    HostConfig {
        binds: non_empty(request.binds()),
        port_bindings: build_port_bindings(request.ports()),
        network_mode: Some(host.network.clone()).filter(|mode| !mode.trim().is_empty()),
        cap_add: non_empty(&host.cap_add),
        security_opt: non_empty(&host.security_opt),
        ..HostConfig::default()
    }
}

fn build_port_bindings(ports: &[PortPublish]) -> Option<HashMap<String, Option<Vec<PortBinding>>>> {
    if ports.is_empty() {
        return None;
    }

    let mut bindings: HashMap<String, Option<Vec<PortBinding>>> = HashMap::new();
    for port in ports {
        let binding = PortBinding {
            host_ip: Some(String::from(ALL_INTERFACES)),
            host_port: Some(port.host_port.to_string()),
        };
        bindings
            .entry(port.port_key())
            .or_insert_with(|| Some(Vec::new()))
            .get_or_insert_with(Vec::new)
            .push(binding);
    }
    Some(bindings)
}
