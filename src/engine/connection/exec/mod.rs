//! Command execution inside running containers.
//!
//! Interactive shells and `dev exec` run attached: output is streamed back,
//! local stdin is forwarded when asked for, and a TTY session puts the local
//! terminal in raw mode and keeps the remote size in step with it.
//! The initialization script runs detached and only its exit code matters.
//! Both modes finish by polling the exec session for its exit code.

mod attached;
mod terminal;

use std::future::Future;
use std::pin::Pin;

use bollard::exec::{
    CreateExecOptions, CreateExecResults, ResizeExecOptions, StartExecOptions, StartExecResults,
};
use bollard::models::ExecInspectResponse;
use bollard::{Docker, errors::Error as BollardError};

use self::attached::{run_attached_session_async, wait_for_exit_code_async};
use self::terminal::{LocalTerminal, SystemTerminal};
pub use self::terminal::local_stdio_is_terminal;
use super::EngineConnector;
use crate::error::{ConfigError, ContainerError, DevctrError};

const EXEC_INSPECT_POLL_INTERVAL_MS: u64 = 100;

/// Boxed future type returned by [`ContainerExecClient::create_exec`].
pub type CreateExecFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CreateExecResults, BollardError>> + Send + 'a>>;

/// Boxed future type returned by [`ContainerExecClient::start_exec`].
pub type StartExecFuture<'a> =
    Pin<Box<dyn Future<Output = Result<StartExecResults, BollardError>> + Send + 'a>>;

/// Boxed future type returned by [`ContainerExecClient::inspect_exec`].
pub type InspectExecFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ExecInspectResponse, BollardError>> + Send + 'a>>;

/// Boxed future type returned by [`ContainerExecClient::resize_exec`].
pub type ResizeExecFuture<'a> = Pin<Box<dyn Future<Output = Result<(), BollardError>> + Send + 'a>>;

/// Engine calls needed to run and inspect exec sessions.
pub trait ContainerExecClient {
    /// Create an exec session in a running container.
    fn create_exec(
        &self,
        container_id: &str,
        options: CreateExecOptions<String>,
    ) -> CreateExecFuture<'_>;

    /// Start a previously created exec session.
    fn start_exec(&self, exec_id: &str, options: Option<StartExecOptions>) -> StartExecFuture<'_>;

    /// Inspect an exec session for running status and exit code.
    fn inspect_exec(&self, exec_id: &str) -> InspectExecFuture<'_>;

    /// Resize a running exec pseudo-terminal.
    fn resize_exec(&self, exec_id: &str, options: ResizeExecOptions) -> ResizeExecFuture<'_>;
}

impl ContainerExecClient for Docker {
    fn create_exec(
        &self,
        container_id: &str,
        options: CreateExecOptions<String>,
    ) -> CreateExecFuture<'_> {
        let container_id_owned = String::from(container_id);
        Box::pin(async move { Self::create_exec(self, &container_id_owned, options).await })
    }

    fn start_exec(&self, exec_id: &str, options: Option<StartExecOptions>) -> StartExecFuture<'_> {
        let exec_id_owned = String::from(exec_id);
        Box::pin(async move { Self::start_exec(self, &exec_id_owned, options).await })
    }

    fn inspect_exec(&self, exec_id: &str) -> InspectExecFuture<'_> {
        let exec_id_owned = String::from(exec_id);
        Box::pin(async move { Self::inspect_exec(self, &exec_id_owned).await })
    }

    fn resize_exec(&self, exec_id: &str, options: ResizeExecOptions) -> ResizeExecFuture<'_> {
        let exec_id_owned = String::from(exec_id);
        Box::pin(async move { Self::resize_exec(self, &exec_id_owned, options).await })
    }
}

/// Execution mode for container commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// Attach local terminal streams to the exec process.
    Attached,
    /// Start without stream attachment and wait for exit.
    Detached,
}

impl ExecMode {
    const fn is_attached(self) -> bool {
        matches!(self, Self::Attached)
    }
}

/// A command to run in a running container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    container: String,
    command: Vec<String>,
    working_dir: Option<String>,
    mode: ExecMode,
    tty: bool,
    stdin: bool,
}

impl ExecRequest {
    /// Create a new command execution request.
    ///
    /// Attached mode requests a pseudo-terminal and forwards stdin by
    /// default.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRequired` when `container` or `command`
    /// is empty, and `ConfigError::InvalidValue` when the executable is blank.
    pub fn new(
        container: impl Into<String>,
        command: Vec<String>,
        mode: ExecMode,
    ) -> Result<Self, DevctrError> {
        let container_value = container.into();
        let trimmed = container_value.trim();
        if trimmed.is_empty() {
            return Err(DevctrError::from(ConfigError::MissingRequired {
                field: String::from("container"),
            }));
        }

        Ok(Self {
            container: String::from(trimmed),
            command: validate_command(command)?,
            working_dir: None,
            mode,
            tty: mode.is_attached(),
            stdin: mode.is_attached(),
        })
    }

    /// Run the command from `working_dir` inside the container.
    #[must_use]
    pub fn with_working_dir(mut self, working_dir: impl Into<String>) -> Self {
        let dir = working_dir.into();
        self.working_dir = (!dir.trim().is_empty()).then_some(dir);
        self
    }

    /// Control pseudo-terminal allocation; detached mode never gets one.
    #[must_use]
    pub const fn with_tty(mut self, tty: bool) -> Self {
        self.tty = self.mode.is_attached() && tty;
        self
    }

    /// Control stdin forwarding; detached mode never forwards it.
    #[must_use]
    pub const fn with_stdin(mut self, stdin: bool) -> Self {
        self.stdin = self.mode.is_attached() && stdin;
        self
    }

    /// Target container name or identifier.
    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Command argv entries.
    #[must_use]
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Working directory, if one was requested.
    #[must_use]
    pub fn working_dir(&self) -> Option<&str> {
        self.working_dir.as_deref()
    }

    /// Execution mode.
    #[must_use]
    pub const fn mode(&self) -> ExecMode {
        self.mode
    }

    /// Whether a pseudo-terminal is allocated.
    #[must_use]
    pub const fn tty(&self) -> bool {
        self.tty
    }

    /// Whether local stdin is forwarded to the command.
    #[must_use]
    pub const fn stdin(&self) -> bool {
        self.stdin
    }
}

/// Outcome of a container command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    exec_id: String,
    exit_code: i64,
}

impl ExecResult {
    /// Daemon-assigned exec identifier.
    #[must_use]
    pub fn exec_id(&self) -> &str {
        &self.exec_id
    }

    /// Command exit code captured from exec inspect.
    #[must_use]
    pub const fn exit_code(&self) -> i64 {
        self.exit_code
    }
}

impl EngineConnector {
    /// Execute a command in a running container.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::ExecFailed` when the exec session cannot be
    /// created, started, streamed, or inspected.
    pub async fn exec_async<C: ContainerExecClient>(
        client: &C,
        request: &ExecRequest,
    ) -> Result<ExecResult, DevctrError> {
        Self::exec_async_with_terminal(client, request, &SystemTerminal).await
    }

    async fn exec_async_with_terminal<C: ContainerExecClient, T: LocalTerminal>(
        client: &C,
        request: &ExecRequest,
        terminal: &T,
    ) -> Result<ExecResult, DevctrError> {
        let container = request.container();
        let exec_id = client
            .create_exec(container, build_create_exec_options(request))
            .await
            .map_err(|error| exec_failed(container, format!("create exec failed: {error}")))?
            .id;

        let started = client
            .start_exec(&exec_id, Some(build_start_exec_options(request)))
            .await
            .map_err(|error| exec_failed(container, format!("start exec failed: {error}")))?;

        match (request.mode(), started) {
            (ExecMode::Attached, StartExecResults::Attached { output, input }) => {
                run_attached_session_async(client, request, &exec_id, output, input, terminal)
                    .await?;
            }
            (ExecMode::Detached, StartExecResults::Detached) => {}
            (ExecMode::Attached, StartExecResults::Detached) => {
                return Err(exec_failed(
                    container,
                    "daemon returned detached start result for attached mode",
                ));
            }
            (ExecMode::Detached, StartExecResults::Attached { .. }) => {
                return Err(exec_failed(
                    container,
                    "daemon returned attached start result for detached mode",
                ));
            }
        }

        let exit_code = wait_for_exit_code_async(client, container, &exec_id).await?;
        Ok(ExecResult { exec_id, exit_code })
    }
}

fn build_create_exec_options(request: &ExecRequest) -> CreateExecOptions<String> {
    let attached = request.mode().is_attached();
    CreateExecOptions::<String> {
        attach_stdin: Some(request.stdin()),
        attach_stdout: Some(attached),
        attach_stderr: Some(attached),
        tty: Some(request.tty()),
        cmd: Some(request.command().to_vec()),
        working_dir: request.working_dir().map(String::from),
        ..CreateExecOptions::default()
    }
}

const fn build_start_exec_options(request: &ExecRequest) -> StartExecOptions {
    StartExecOptions {
        detach: !request.mode().is_attached(),
        tty: request.tty(),
        output_capacity: None,
    }
}

fn validate_command(command: Vec<String>) -> Result<Vec<String>, DevctrError> {
    let Some(executable) = command.first() else {
        return Err(DevctrError::from(ConfigError::MissingRequired {
            field: String::from("command"),
        }));
    };

    if executable.trim().is_empty() {
        return Err(DevctrError::from(ConfigError::InvalidValue {
            field: String::from("command"),
            reason: String::from("command executable must not be empty"),
        }));
    }

    Ok(command)
}

fn exec_failed(container: &str, message: impl Into<String>) -> DevctrError {
    DevctrError::from(ContainerError::ExecFailed {
        container_id: String::from(container),
        message: message.into(),
    })
}
