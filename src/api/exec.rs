//! Container command execution orchestration.
//!
//! Terminal detection (whether stdin/stdout are TTYs) is the caller's
//! responsibility.

use tracing::{info, warn};

use super::{CommandContext, CommandOutcome};
use crate::engine::{ContainerRuntime, ExecMode, ExecRequest};
use crate::error::Result;
use crate::session::{PortChecker, SessionState, resolve_workdir};

/// A command to run in a development container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecCommand {
    /// Explicit container name; the working directory's container otherwise.
    pub name: Option<String>,
    /// Command argv.
    pub command: Vec<String>,
    /// Forward local stdin to the command.
    pub interactive: bool,
    /// Allocate a pseudo-terminal.
    pub tty: bool,
}

/// Run a command in a development container.
///
/// A stopped container is started first. An absent one is reported and
/// nothing runs. The command's exit code becomes the outcome.
///
/// # Errors
///
/// Returns an error when the container cannot be started or the command
/// cannot be executed.
pub fn exec<R: ContainerRuntime, E: mockable::Env, P: PortChecker>(
    ctx: &CommandContext<'_, R, E>,
    checker: &P,
    command: &ExecCommand,
) -> Result<CommandOutcome> {
    let identity = ctx.target(command.name.as_deref());
    let controller = ctx.controller(checker);
    let state = controller.state(&identity)?;

    let descriptor = ctx.settings.load_descriptor(ctx.env);
    let workdir = resolve_workdir(ctx.cwd, &descriptor);
    match state {
        SessionState::Absent => {
            warn!("Container {identity} does not exist; run `dev` to create it first.");
            return Ok(CommandOutcome::Success);
        }
        SessionState::Stopped => {
            info!("Container {identity} is not running; starting it.");
            controller.resume(&identity, state, &descriptor, &workdir)?;
        }
        SessionState::Running => {}
    }

    let request = ExecRequest::new(identity.as_str(), command.command.clone(), ExecMode::Attached)?
        .with_working_dir(workdir.as_str())
        .with_stdin(command.interactive)
        .with_tty(command.tty);

    ctx.runtime
        .exec(&request)
        .map(CommandOutcome::from_exit_code)
}
