//! Semantic error types for devctr.
//!
//! Library code returns [`DevctrError`]; the binary converts it to an
//! `eyre::Report` at the boundary. The split follows what callers act on:
//! configuration problems, and engine calls that did not go through.
//!
//! Conditions a session can survive (a dropped mount, an occupied port, a
//! failed initialization script) never surface here; they are logged as
//! warnings where they happen. Everything in this module aborts the operation
//! that produced it.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Configuration could not be loaded or holds an unusable value.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration file, or the built-in defaults, did not parse.
    #[error("failed to parse configuration file: {message}")]
    ParseError {
        /// Parser output.
        message: String,
    },

    /// A value the command needs was not supplied by any layer.
    #[error("missing required configuration: {field}")]
    MissingRequired {
        /// Field or argument name.
        field: String,
    },

    /// A supplied value was rejected.
    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// Field or argument name.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Layer merging in `ortho_config` failed.
    #[error("configuration loading failed: {0}")]
    OrthoConfig(Arc<ortho_config::OrthoError>),
}

/// An Engine API call failed.
///
/// Variants carrying a container name use whatever the caller passed, which
/// for devctr is always the derived container name rather than an ID.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// The engine client could not be constructed for the endpoint.
    #[error("failed to connect to container engine: {message}")]
    ConnectionFailed {
        /// Client error text.
        message: String,
    },

    /// The Unix socket does not exist.
    #[error("container engine socket not found: {path}")]
    SocketNotFound {
        /// Socket path.
        path: PathBuf,
    },

    /// The socket exists but this user may not open it.
    #[error("permission denied accessing container socket: {path}")]
    PermissionDenied {
        /// Socket path.
        path: PathBuf,
    },

    /// The Tokio runtime backing engine calls could not be created.
    #[error("failed to create async runtime: {message}")]
    RuntimeCreationFailed {
        /// Runtime builder error text.
        message: String,
    },

    /// The engine rejected a create request.
    #[error("failed to create container '{name}': {message}")]
    CreateFailed {
        /// The requested container name.
        name: String,
        /// Engine error text.
        message: String,
    },

    /// The engine already holds a container with the requested name.
    #[error("container '{name}' already exists")]
    AlreadyExists {
        /// The conflicting container name.
        name: String,
    },

    /// The engine does not know the named container or image.
    #[error("container '{name}' not found")]
    NotFound {
        /// The name that was looked up.
        name: String,
    },

    /// The container would not start.
    #[error("failed to start container '{container_id}': {message}")]
    StartFailed {
        /// Container name.
        container_id: String,
        /// Engine error text.
        message: String,
    },

    /// The container would not stop.
    #[error("failed to stop container '{container_id}': {message}")]
    StopFailed {
        /// Container name.
        container_id: String,
        /// Engine error text.
        message: String,
    },

    /// The container could not be removed.
    #[error("failed to remove container '{container_id}': {message}")]
    RemoveFailed {
        /// Container name.
        container_id: String,
        /// Engine error text.
        message: String,
    },

    /// A container or image inspect failed for a reason other than absence.
    #[error("failed to inspect '{target}': {message}")]
    InspectFailed {
        /// Container name or image reference.
        target: String,
        /// Engine error text.
        message: String,
    },

    /// An existing container's configuration could not be changed.
    #[error("failed to update container '{container_id}': {message}")]
    UpdateFailed {
        /// Container name.
        container_id: String,
        /// Engine error text.
        message: String,
    },

    /// Listing containers failed.
    #[error("failed to list containers: {message}")]
    ListFailed {
        /// Engine error text.
        message: String,
    },

    /// Pruning one kind of unused engine resource failed.
    #[error("failed to prune unused {resource}: {message}")]
    PruneFailed {
        /// Resource kind such as `images`.
        resource: String,
        /// Engine error text.
        message: String,
    },

    /// An image build failed or its context could not be packed.
    #[error("failed to build image '{image}': {message}")]
    BuildFailed {
        /// Image tag being built.
        image: String,
        /// Engine, build, or I/O error text.
        message: String,
    },

    /// Logs could not be read or written out.
    #[error("failed to read logs for container '{container_id}': {message}")]
    LogsFailed {
        /// Container name.
        container_id: String,
        /// Engine or I/O error text.
        message: String,
    },

    /// An exec session could not be created, started, streamed, or inspected.
    #[error("failed to execute command in container '{container_id}': {message}")]
    ExecFailed {
        /// Container name.
        container_id: String,
        /// Which step failed and why.
        message: String,
    },

    /// The engine answered the ping with an error.
    #[error("container engine health check failed: {message}")]
    HealthCheckFailed {
        /// Engine error text.
        message: String,
    },

    /// The engine did not answer the ping in time.
    #[error("container engine health check timed out after {seconds} seconds")]
    HealthCheckTimeout {
        /// Seconds waited.
        seconds: u64,
    },
}

/// Any devctr failure.
#[derive(Debug, Error)]
pub enum DevctrError {
    /// See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// See [`ContainerError`].
    #[error(transparent)]
    Container(#[from] ContainerError),
}

impl DevctrError {
    /// Returns whether the error reports a name clash on container creation.
    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::Container(ContainerError::AlreadyExists { .. }))
    }

    /// Returns whether the error reports an unknown container.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Container(ContainerError::NotFound { .. }))
    }
}

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, DevctrError>;
