//! Container engine connection and management.
//!
//! The engine endpoint is resolved through a priority-based fallback chain:
//!
//! 1. CLI argument (`--engine-socket`)
//! 2. Config file (`engine_socket` in TOML)
//! 3. `DEVCTR_ENGINE_SOCKET` environment variable
//! 4. `DOCKER_HOST` environment variable
//! 5. `CONTAINER_HOST` environment variable
//! 6. `PODMAN_HOST` environment variable
//! 7. Platform default (`/var/run/docker.sock` on Unix)
//!
//! `connection` holds the async Engine API calls behind small client
//! traits; [`ContainerRuntime`] wraps them into the blocking interface the
//! session controller uses.

mod connection;
mod runtime;

pub use connection::{
    BuildRequest, BuildStream, ContainerCreator, ContainerExecClient, ContainerLifecycleClient,
    CreateContainerFuture, CreateContainerRequest, CreateExecFuture, EngineConnector,
    EngineFuture, EngineMaintenanceClient, ExecMode, ExecRequest, ExecResult, HostOptions,
    InspectExecFuture, LogStream, PortPublish, PruneScope, PruneSummary, ResizeExecFuture,
    SocketResolver, StartExecFuture, local_stdio_is_terminal,
};
pub use runtime::{
    ContainerDetails, ContainerRuntime, ContainerSummary, DockerRuntime, LogsRequest,
    MountSummary,
};

#[cfg(test)]
pub use runtime::MockContainerRuntime;
