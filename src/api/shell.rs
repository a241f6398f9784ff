//! Interactive session orchestration.

use tracing::{debug, info};

use super::{CommandContext, CommandOutcome};
use crate::engine::ContainerRuntime;
use crate::error::Result;
use crate::session::{Invocation, PortChecker};

/// Enter the development container for the working directory.
///
/// `tty` says whether local stdin and stdout are terminals. The shell's own
/// exit code is logged, not propagated: leaving the shell is success.
///
/// # Errors
///
/// Returns an error when the container cannot be created, started, or
/// attached to.
pub fn shell<R: ContainerRuntime, E: mockable::Env, P: PortChecker>(
    ctx: &CommandContext<'_, R, E>,
    checker: &P,
    tty: bool,
) -> Result<CommandOutcome> {
    let descriptor = ctx.settings.load_descriptor(ctx.env);
    let invocation = Invocation {
        cwd: ctx.cwd.to_owned(),
        tty,
    };

    let report = ctx.controller(checker).run(&invocation, &descriptor)?;
    debug!(?report, "session finished");
    info!(
        "Left {} (shell exited with {}); the container keeps running.",
        report.identity, report.exit_code
    );
    Ok(CommandOutcome::Success)
}
