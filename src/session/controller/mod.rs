//! The session state machine.
//!
//! Each invocation re-derives the container state from the engine and takes
//! one of three paths:
//!
//! - running: attach straight away;
//! - stopped: drop host ports that something else now holds, start the
//!   container, initialize it, then attach;
//! - absent: publish the free descriptor ports, create and start the
//!   container, initialize it, then attach.
//!
//! Leaving the shell leaves the container running.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{error, info, warn};

use super::identity::ContainerIdentity;
use super::init::InitScript;
use super::ports::{
    PortMapping, PortChecker, negotiate_create, negotiate_start_existing, parse_port_entry,
    published_ports,
};
use super::settings::SessionSettings;
use super::workdir::resolve_workdir;
use crate::descriptor::EnvironmentDescriptor;
use crate::engine::{
    ContainerRuntime, CreateContainerRequest, ExecMode, ExecRequest, PortPublish,
};
use crate::error::{ConfigError, DevctrError, Result};

/// Container state as seen at the start of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No container with the session's name exists.
    Absent,
    /// The container exists but is not running.
    Stopped,
    /// The container is running.
    Running,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Absent => "absent",
            Self::Stopped => "stopped",
            Self::Running => "running",
        })
    }
}

/// Which path brought the container to the running state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPath {
    /// It was already running.
    Attached,
    /// An existing container was started.
    Started,
    /// A new container was created and started.
    Created,
}

/// What the caller observed when the session was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Canonical host working directory.
    pub cwd: Utf8PathBuf,
    /// Whether local stdin and stdout are terminals.
    pub tty: bool,
}

impl Invocation {
    /// An invocation from the process's current directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when the directory cannot be
    /// read, resolved, or represented as UTF-8.
    pub fn from_current_dir(tty: bool) -> Result<Self> {
        let dir = std::env::current_dir().map_err(|error| invalid_cwd(&error.to_string()))?;
        let utf8 = Utf8PathBuf::from_path_buf(dir).map_err(|path| {
            invalid_cwd(&format!("{} is not valid UTF-8", path.display()))
        })?;
        Self::from_dir(&utf8, tty)
    }

    /// An invocation from `dir`, with symlinks and `..` resolved so every
    /// spelling of a directory maps to the same container.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when `dir` cannot be resolved.
    pub fn from_dir(dir: &Utf8Path, tty: bool) -> Result<Self> {
        let cwd = dir
            .canonicalize_utf8()
            .map_err(|error| invalid_cwd(&format!("{dir}: {error}")))?;
        Ok(Self { cwd, tty })
    }
}

fn invalid_cwd(reason: &str) -> DevctrError {
    DevctrError::from(ConfigError::InvalidValue {
        field: String::from("working directory"),
        reason: String::from(reason),
    })
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    /// Container that served the session.
    pub identity: ContainerIdentity,
    /// State found before anything was changed.
    pub initial_state: SessionState,
    /// Path taken to a running container.
    pub path: SessionPath,
    /// Working directory the shell started in.
    pub workdir: Utf8PathBuf,
    /// Port decisions made on the way; empty when already running.
    pub ports: Vec<PortMapping>,
    /// Exit code of the attached shell.
    pub exit_code: i64,
}

/// Drives one container from its current state to an attached shell.
pub struct SessionController<'a, R: ContainerRuntime, P: PortChecker> {
    runtime: &'a R,
    checker: &'a P,
    settings: &'a SessionSettings,
}

impl<'a, R: ContainerRuntime, P: PortChecker> SessionController<'a, R, P> {
    /// Create a controller over `runtime`.
    #[must_use]
    pub const fn new(runtime: &'a R, checker: &'a P, settings: &'a SessionSettings) -> Self {
        Self {
            runtime,
            checker,
            settings,
        }
    }

    /// The container identity for a working directory.
    #[must_use]
    pub fn identity_for(&self, cwd: &Utf8Path) -> ContainerIdentity {
        self.settings
            .naming
            .identity(cwd, &self.settings.install_dir)
    }

    /// Query the current state of the named container.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine cannot answer.
    pub fn state(&self, identity: &ContainerIdentity) -> Result<SessionState> {
        let name = identity.as_str();
        if !self.runtime.exists(name)? {
            return Ok(SessionState::Absent);
        }
        if self.runtime.running(name)? {
            Ok(SessionState::Running)
        } else {
            Ok(SessionState::Stopped)
        }
    }

    /// Run an interactive session for `invocation`.
    ///
    /// # Errors
    ///
    /// Returns an error when the state cannot be queried, the container
    /// cannot be created or started, or the shell cannot be attached.
    pub fn run(
        &self,
        invocation: &Invocation,
        descriptor: &EnvironmentDescriptor,
    ) -> Result<SessionReport> {
        let identity = self.identity_for(&invocation.cwd);
        let initial_state = self.state(&identity)?;
        info!(container = %identity, state = %initial_state, "resolved session");

        let workdir = resolve_workdir(&invocation.cwd, descriptor);
        let (path, ports) = self.resume(&identity, initial_state, descriptor, &workdir)?;
        let exit_code = self.attach(&identity, &workdir, invocation.tty)?;

        Ok(SessionReport {
            identity,
            initial_state,
            path,
            workdir,
            ports,
            exit_code,
        })
    }

    /// Bring the container from `state` to running.
    ///
    /// A newly created container gets `workdir` as its working directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the container cannot be created or started.
    pub fn resume(
        &self,
        identity: &ContainerIdentity,
        state: SessionState,
        descriptor: &EnvironmentDescriptor,
        workdir: &Utf8Path,
    ) -> Result<(SessionPath, Vec<PortMapping>)> {
        match state {
            SessionState::Running => Ok((SessionPath::Attached, Vec::new())),
            SessionState::Stopped => {
                let ports = self.start_existing(identity, descriptor)?;
                Ok((SessionPath::Started, ports))
            }
            SessionState::Absent => self.create_new(identity, descriptor, workdir),
        }
    }

    fn start_existing(
        &self,
        identity: &ContainerIdentity,
        descriptor: &EnvironmentDescriptor,
    ) -> Result<Vec<PortMapping>> {
        let name = identity.as_str();
        let configured = match self.runtime.inspect_ports(name) {
            Ok(ports) => ports,
            Err(inspect_error) => {
                warn!("Could not read port bindings of {name} ({inspect_error}); checking descriptor ports instead.");
                descriptor_ports(descriptor)
            }
        };

        let mappings = negotiate_start_existing(&configured, self.checker);
        for port in mappings.iter().filter_map(unpublished) {
            if let Err(update_error) = self.runtime.update_remove_publish(name, port) {
                warn!("{update_error}");
            }
        }

        info!("Starting existing container {name}.");
        if let Err(start_error) = self.runtime.start(name) {
            error!("Could not start {name}; `dev delete` removes it so the next session recreates it.");
            return Err(start_error);
        }
        self.initialize(identity);
        Ok(mappings)
    }

    fn create_new(
        &self,
        identity: &ContainerIdentity,
        descriptor: &EnvironmentDescriptor,
        workdir: &Utf8Path,
    ) -> Result<(SessionPath, Vec<PortMapping>)> {
        let mappings = negotiate_create(&descriptor.ports, self.checker);
        let request =
            self.create_request(identity, descriptor, workdir, published_ports(&mappings))?;

        info!("Creating container {identity} from {}.", self.settings.image);
        match self.runtime.create(&request) {
            Ok(()) => {
                self.initialize(identity);
                Ok((SessionPath::Created, mappings))
            }
            Err(create_error) if create_error.is_already_exists() => {
                info!("Container {identity} already exists; reusing it.");
                match self.state(identity)? {
                    SessionState::Running => Ok((SessionPath::Attached, Vec::new())),
                    SessionState::Stopped => {
                        let ports = self.start_existing(identity, descriptor)?;
                        Ok((SessionPath::Started, ports))
                    }
                    SessionState::Absent => Err(create_error),
                }
            }
            Err(create_error) => Err(create_error),
        }
    }

    fn create_request(
        &self,
        identity: &ContainerIdentity,
        descriptor: &EnvironmentDescriptor,
        workdir: &Utf8Path,
        ports: Vec<PortPublish>,
    ) -> Result<CreateContainerRequest> {
        let binds = descriptor
            .mounts
            .iter()
            .map(crate::descriptor::Mount::bind_spec)
            .collect();

        Ok(
            CreateContainerRequest::new(&self.settings.image, identity.as_str())?
                .with_binds(binds)
                .with_ports(ports)
                .with_env(descriptor.env_list())
                .with_working_dir(Some(workdir.to_string()))
                .with_host_options(self.settings.host.clone()),
        )
    }

    /// Run the initialization script; failures only warn.
    fn initialize(&self, identity: &ContainerIdentity) {
        let script = InitScript::new(
            &self.settings.container_home,
            &self.settings.install_mount_target(),
        );
        let outcome = ExecRequest::new(identity.as_str(), script.command(), ExecMode::Detached)
            .and_then(|request| self.runtime.exec(&request));

        match outcome {
            Ok(0) => {}
            Ok(code) => warn!("Container initialization exited with code {code}."),
            Err(init_error) => warn!("Container initialization failed: {init_error}"),
        }
    }

    fn attach(&self, identity: &ContainerIdentity, workdir: &Utf8Path, tty: bool) -> Result<i64> {
        let request = ExecRequest::new(
            identity.as_str(),
            vec![self.settings.shell.clone()],
            ExecMode::Attached,
        )?
        .with_working_dir(workdir.as_str())
        .with_tty(tty);

        self.runtime.exec(&request)
    }
}

fn descriptor_ports(descriptor: &EnvironmentDescriptor) -> Vec<PortPublish> {
    descriptor
        .ports
        .iter()
        .filter_map(|entry| parse_port_entry(entry).ok())
        .collect()
}

const fn unpublished(mapping: &PortMapping) -> Option<&PortPublish> {
    match mapping {
        PortMapping::Unpublish(port) => Some(port),
        PortMapping::Publish(_) | PortMapping::Skip { .. } => None,
    }
}
