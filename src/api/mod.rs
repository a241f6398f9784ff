//! Orchestration API for devctr commands.
//!
//! One function per command: [`shell`], [`exec`], [`stop`], [`delete`],
//! [`status`], [`logs`], [`cleanup`], [`prune`], [`build`], and [`rebuild`]. They take library-owned types rather
//! than clap types, so the CLI adapter and library embedders share them.
//!
//! Nothing here prints to stdout or calls `std::process::exit`. Notices go
//! through `tracing`; [`status`] returns a report for the caller to render.

mod exec;
mod lifecycle;
mod maintenance;
mod shell;
mod status;

pub use exec::{ExecCommand, exec};
pub use lifecycle::{CleanupCommand, StopCommand, cleanup, delete, stop};
pub use maintenance::{BuildCommand, PruneCommand, build, prune, rebuild};
pub use shell::shell;
pub use status::{ContainerStatus, ImageStatus, StatusReport, logs, status};

use camino::Utf8Path;

use crate::engine::{ContainerRuntime, ContainerSummary};
use crate::error::Result;
use crate::session::{ContainerIdentity, SessionController, SessionSettings};

/// Outcome of a devctr command.
///
/// Commands return either outright success, a command-specific exit code
/// that the CLI adapter maps to a process exit code, or a cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command completed successfully (exit code 0).
    Success,
    /// The command completed but the underlying process exited with a
    /// non-zero code.
    CommandExit {
        /// The exit code reported by the container engine.
        code: i64,
    },
    /// The user declined a confirmation prompt.
    Cancelled,
}

impl CommandOutcome {
    /// Map a process exit code to an outcome.
    #[must_use]
    pub const fn from_exit_code(code: i64) -> Self {
        if code == 0 {
            Self::Success
        } else {
            Self::CommandExit { code }
        }
    }
}

/// Asks the user to confirm a destructive operation.
pub trait Confirm {
    /// Whether the user agreed to `prompt`.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Everything a command needs besides its own arguments.
pub struct CommandContext<'a, R: ContainerRuntime, E: mockable::Env> {
    /// Container runtime.
    pub runtime: &'a R,
    /// Resolved session settings.
    pub settings: &'a SessionSettings,
    /// Environment used for descriptor expansion.
    pub env: &'a E,
    /// Canonical host working directory.
    pub cwd: &'a Utf8Path,
}

impl<R: ContainerRuntime, E: mockable::Env> CommandContext<'_, R, E> {
    /// The explicitly named container, or the one for the working directory.
    fn target(&self, name: Option<&str>) -> ContainerIdentity {
        match name.map(str::trim).filter(|name| !name.is_empty()) {
            Some(explicit) => ContainerIdentity::named(explicit),
            None => self
                .settings
                .naming
                .identity(self.cwd, &self.settings.install_dir),
        }
    }

    fn controller<'p, P: crate::session::PortChecker>(
        &'p self,
        checker: &'p P,
    ) -> SessionController<'p, R, P> {
        SessionController::new(self.runtime, checker, self.settings)
    }

    /// Every container carrying a devctr name, sentinel included.
    fn dev_containers(&self) -> Result<Vec<ContainerSummary>> {
        let naming = &self.settings.naming;
        let mut containers = self.runtime.list(&naming.list_prefix())?;
        if !naming.sentinel().starts_with(&naming.list_prefix()) {
            containers.extend(self.runtime.list(naming.sentinel())?);
        }
        containers.retain(|container| naming.owns(&container.name));
        Ok(containers)
    }
}
