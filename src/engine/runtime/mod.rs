//! The synchronous container runtime seam used by the session controller.
//!
//! [`ContainerRuntime`] is the only way the rest of the crate talks to a
//! container engine. [`DockerRuntime`] implements it over the Docker Engine
//! API; tests substitute mocks or in-memory fakes.

mod docker;

pub use docker::DockerRuntime;

use super::connection::{
    BuildRequest, CreateContainerRequest, ExecRequest, PortPublish, PruneScope, PruneSummary,
};
use crate::error::Result;

/// A bind mount as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSummary {
    /// Host-side source path.
    pub source: String,
    /// Container-side destination path.
    pub destination: String,
    /// Mount mode such as `ro` or `rw`; empty when the engine omits it.
    pub mode: String,
}

/// Runtime details of one container, as shown by `dev status`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerDetails {
    /// Container name.
    pub name: String,
    /// Whether the container is running.
    pub running: bool,
    /// Start time reported by the engine.
    pub started_at: Option<String>,
    /// First network address found on any attached network.
    pub ip_address: Option<String>,
    /// Configured host port bindings.
    pub ports: Vec<PortPublish>,
    /// Mounts attached to the container.
    pub mounts: Vec<MountSummary>,
}

/// A container matched by name prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    /// Container name without the engine's leading `/`.
    pub name: String,
    /// Whether the container is running.
    pub running: bool,
    /// Human-readable status such as `Up 2 hours`.
    pub status: String,
}

/// Options for streaming container logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogsRequest {
    /// Keep streaming new output.
    pub follow: bool,
    /// Number of trailing lines to print first.
    pub tail: u32,
}

/// Blocking container engine operations.
///
/// Lookups of unknown containers report `ContainerError::NotFound`, except
/// [`ContainerRuntime::exists`] and [`ContainerRuntime::running`], which
/// answer `false`.
#[cfg_attr(test, mockall::automock)]
pub trait ContainerRuntime {
    /// Whether a container with this name exists.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine cannot answer.
    fn exists(&self, name: &str) -> Result<bool>;

    /// Whether a container with this name exists and is running.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine cannot answer.
    fn running(&self, name: &str) -> Result<bool>;

    /// Create the container described by `request` and start it.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::AlreadyExists` on a name clash, and a create
    /// or start failure otherwise.
    fn create(&self, request: &CreateContainerRequest) -> Result<()>;

    /// Start an existing container.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::StartFailed` or `ContainerError::NotFound`.
    fn start(&self, name: &str) -> Result<()>;

    /// Stop a running container, giving it `timeout_secs` to exit.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::StopFailed` or `ContainerError::NotFound`.
    fn stop(&self, name: &str, timeout_secs: u64) -> Result<()>;

    /// Remove a stopped container.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::RemoveFailed` or `ContainerError::NotFound`.
    fn remove(&self, name: &str) -> Result<()>;

    /// Run a command and return its exit code.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::ExecFailed` when the command cannot be run.
    fn exec(&self, request: &ExecRequest) -> Result<i64>;

    /// Host port bindings configured on the container.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::InspectFailed` or `ContainerError::NotFound`.
    fn inspect_ports(&self, name: &str) -> Result<Vec<PortPublish>>;

    /// Drop one published port from an existing container.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::UpdateFailed` when the engine cannot apply
    /// the change.
    fn update_remove_publish(&self, name: &str, port: &PortPublish) -> Result<()>;

    /// Details of one container.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::InspectFailed` or `ContainerError::NotFound`.
    fn inspect(&self, name: &str) -> Result<ContainerDetails>;

    /// Creation time of a local image, or `None` when it is not present.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::InspectFailed` when the engine cannot answer.
    fn image_created(&self, image: &str) -> Result<Option<String>>;

    /// Containers, running or not, whose names start with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::ListFailed` when the engine cannot answer.
    fn list(&self, prefix: &str) -> Result<Vec<ContainerSummary>>;

    /// Stream container logs to standard output.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::LogsFailed` or `ContainerError::NotFound`.
    fn logs(&self, name: &str, request: &LogsRequest) -> Result<()>;

    /// Remove unused engine resources, not only development containers.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::PruneFailed` when the engine refuses.
    fn prune(&self, scope: PruneScope) -> Result<PruneSummary>;

    /// Build and tag an image, streaming build output to standard output.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::BuildFailed` when the build does not finish.
    fn build(&self, request: &BuildRequest) -> Result<()>;
}
