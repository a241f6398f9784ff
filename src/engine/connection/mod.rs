//! Socket resolution and container engine connection.
//!
//! This module resolves the container engine endpoint from configuration,
//! environment variables, or the platform default, and connects to it using
//! the Bollard library. The submodules add the individual Engine API calls
//! behind small client traits so they can be exercised without a daemon.

mod create_container;
mod error_classification;
mod exec;
mod health_check;
mod lifecycle;
mod maintenance;

use bollard::Docker;

pub use create_container::{
    ContainerCreator, CreateContainerFuture, CreateContainerRequest, HostOptions, PortPublish,
};
pub use exec::{
    ContainerExecClient, CreateExecFuture, ExecMode, ExecRequest, ExecResult, InspectExecFuture,
    ResizeExecFuture, StartExecFuture, local_stdio_is_terminal,
};
pub use lifecycle::{ContainerLifecycleClient, EngineFuture, LogStream};
pub use maintenance::{
    BuildRequest, BuildStream, EngineMaintenanceClient, PruneScope, PruneSummary,
};

use self::error_classification::classify_connection_error;
use crate::error::{ContainerError, DevctrError};

/// Environment variable names checked in fallback order after configuration sources.
const FALLBACK_ENV_VARS: &[&str] = &["DOCKER_HOST", "CONTAINER_HOST", "PODMAN_HOST"];

/// Connection timeout in seconds for Engine API requests.
const CONNECTION_TIMEOUT_SECS: u64 = 120;

/// Timeout in seconds for health check operations.
pub(super) const HEALTH_CHECK_TIMEOUT_SECS: u64 = 10;

/// Default socket path for Unix platforms.
#[cfg(unix)]
const DEFAULT_SOCKET: &str = "unix:///var/run/docker.sock";

/// Default socket path for Windows platforms.
#[cfg(windows)]
const DEFAULT_SOCKET: &str = "npipe:////./pipe/docker_engine";

/// Resolves container engine socket endpoints from environment variables.
///
/// # Type Parameters
///
/// * `E` - An environment provider implementing the `mockable::Env` trait,
///   allowing for testable environment variable access.
///
/// # Example
///
/// ```ignore
/// use mockable::DefaultEnv;
/// use devctr::engine::SocketResolver;
///
/// let env = DefaultEnv::new();
/// let resolver = SocketResolver::new(&env);
/// let socket = resolver.resolve_from_env();
/// ```
pub struct SocketResolver<'a, E: mockable::Env> {
    env: &'a E,
}

impl<'a, E: mockable::Env> SocketResolver<'a, E> {
    /// Creates a new socket resolver with the given environment provider.
    #[must_use]
    pub const fn new(env: &'a E) -> Self {
        Self { env }
    }

    /// Resolves the socket endpoint from `DOCKER_HOST`, `CONTAINER_HOST`,
    /// then `PODMAN_HOST`, skipping empty values.
    #[must_use]
    pub fn resolve_from_env(&self) -> Option<String> {
        FALLBACK_ENV_VARS
            .iter()
            .filter_map(|var_name| self.env.string(var_name))
            .find(|value| !value.is_empty())
    }

    /// Returns the platform default socket path.
    #[must_use]
    pub const fn default_socket() -> &'static str {
        DEFAULT_SOCKET
    }
}

/// Classifies socket endpoint types for connection handling.
enum SocketType {
    /// Unix socket or Windows named pipe with explicit scheme.
    Socket,
    /// HTTP, HTTPS, or TCP endpoint (TCP is rewritten to HTTP).
    Http,
    /// Bare path without scheme prefix.
    BarePath,
}

impl SocketType {
    fn classify(socket: &str) -> Self {
        if socket.starts_with("unix://") || socket.starts_with("npipe://") {
            Self::Socket
        } else if ["tcp://", "http://", "https://"]
            .iter()
            .any(|scheme| socket.starts_with(scheme))
        {
            Self::Http
        } else {
            Self::BarePath
        }
    }
}

/// Connects to Docker-compatible container engines and drives Engine API calls.
pub struct EngineConnector;

impl EngineConnector {
    /// Connect to the container engine at the specified socket.
    ///
    /// Accepts `unix://`, `npipe://`, `tcp://`, `http://` and `https://`
    /// endpoints. Bare paths starting with `\\` or `//` are treated as named
    /// pipes; any other bare path is a Unix socket.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::SocketNotFound`, `PermissionDenied`, or
    /// `ConnectionFailed` when the client cannot be constructed.
    pub fn connect(socket: &str) -> Result<Docker, DevctrError> {
        let (endpoint, connected) = match SocketType::classify(socket) {
            SocketType::Socket => (socket.to_owned(), Self::connect_socket(socket)),
            SocketType::Http => {
                // Bollard only understands http(s) schemes for TCP endpoints.
                let http_socket = socket.replacen("tcp://", "http://", 1);
                let connected = Docker::connect_with_http(
                    &http_socket,
                    CONNECTION_TIMEOUT_SECS,
                    bollard::API_DEFAULT_VERSION,
                );
                (http_socket, connected)
            }
            SocketType::BarePath => {
                let socket_uri = Self::normalize_bare_path(socket);
                let connected = Self::connect_socket(&socket_uri);
                (socket_uri, connected)
            }
        };

        connected.map_err(|error| DevctrError::from(classify_connection_error(&error, &endpoint)))
    }

    fn connect_socket(socket_uri: &str) -> Result<Docker, bollard::errors::Error> {
        Docker::connect_with_socket(
            socket_uri,
            CONNECTION_TIMEOUT_SECS,
            bollard::API_DEFAULT_VERSION,
        )
    }

    fn normalize_bare_path(path: &str) -> String {
        if path.starts_with("\\\\") || path.starts_with("//") {
            format!("npipe://{path}")
        } else {
            format!("unix://{path}")
        }
    }

    /// Connect using the resolved socket from configuration and environment.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::connect`].
    pub fn connect_with_fallback<E: mockable::Env>(
        config_socket: Option<&str>,
        resolver: &SocketResolver<'_, E>,
    ) -> Result<Docker, DevctrError> {
        let socket = Self::resolve_socket(config_socket, resolver);
        Self::connect(&socket)
    }

    /// Resolves the socket endpoint without establishing a connection.
    ///
    /// Resolution order:
    /// 1. `config_socket` (from `--engine-socket`, the config file, or
    ///    `DEVCTR_ENGINE_SOCKET`)
    /// 2. `DOCKER_HOST`, `CONTAINER_HOST`, `PODMAN_HOST`
    /// 3. Platform default socket
    #[must_use]
    pub fn resolve_socket<E: mockable::Env>(
        config_socket: Option<&str>,
        resolver: &SocketResolver<'_, E>,
    ) -> String {
        config_socket
            .map(str::trim)
            .filter(|socket| !socket.is_empty())
            .map(String::from)
            .or_else(|| resolver.resolve_from_env())
            .unwrap_or_else(|| SocketResolver::<E>::default_socket().to_owned())
    }

    /// Create a Tokio runtime for blocking on Engine API calls.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::RuntimeCreationFailed` when the runtime
    /// cannot be built.
    pub fn create_runtime() -> Result<tokio::runtime::Runtime, DevctrError> {
        tokio::runtime::Runtime::new().map_err(|error| {
            DevctrError::from(ContainerError::RuntimeCreationFailed {
                message: error.to_string(),
            })
        })
    }
}
