//! Engine-wide housekeeping and image builds.

use tracing::info;

use super::lifecycle::delete;
use super::{CommandContext, CommandOutcome, Confirm};
use crate::engine::{BuildRequest, ContainerRuntime, PruneScope};
use crate::error::Result;

/// Which unused engine resources `prune` removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PruneCommand {
    /// Also remove unused networks and every unused image.
    pub all: bool,
    /// Also remove unused volumes.
    pub volumes: bool,
    /// Skip the confirmation prompt.
    pub assume_yes: bool,
}

/// Options for building the development image.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildCommand {
    /// Ignore cached layers.
    pub no_cache: bool,
}

/// Remove stopped containers and dangling images across the engine.
///
/// `all` and `volumes` widen the sweep beyond development containers, so
/// they ask first.
///
/// # Errors
///
/// Returns an error when the engine refuses a prune.
pub fn prune<R: ContainerRuntime, E: mockable::Env, C: Confirm>(
    ctx: &CommandContext<'_, R, E>,
    command: PruneCommand,
    confirm: &C,
) -> Result<CommandOutcome> {
    if (command.all || command.volumes) && !command.assume_yes {
        let prompt = if command.volumes {
            "This removes all stopped containers, unused networks, images, and volumes. Continue?"
        } else {
            "This removes all stopped containers, unused networks, and unused images. Continue?"
        };
        if !confirm.confirm(prompt) {
            info!("Prune operation cancelled.");
            return Ok(CommandOutcome::Cancelled);
        }
    }

    info!("Cleaning up unused engine resources.");
    let summary = ctx.runtime.prune(PruneScope {
        all: command.all,
        volumes: command.volumes,
    })?;
    info!(
        "Removed {} container(s), {} image(s), {} network(s), {} volume(s); reclaimed {} bytes.",
        summary.containers,
        summary.images,
        summary.networks,
        summary.volumes,
        summary.space_reclaimed
    );
    Ok(CommandOutcome::Success)
}

/// Build the development image from the install directory.
///
/// # Errors
///
/// Returns an error when the build context cannot be packed or the build
/// fails.
pub fn build<R: ContainerRuntime, E: mockable::Env>(
    ctx: &CommandContext<'_, R, E>,
    command: &BuildCommand,
) -> Result<CommandOutcome> {
    let request = BuildRequest::new(&ctx.settings.install_dir, &ctx.settings.image)?
        .with_no_cache(command.no_cache);
    info!("Building {} from {}.", request.tag(), request.context_dir());
    ctx.runtime.build(&request)?;
    info!("Build complete; run `dev` to enter the environment.");
    Ok(CommandOutcome::Success)
}

/// Delete the container, then build the image again.
///
/// The next `dev` recreates the container from the fresh image.
///
/// # Errors
///
/// Returns an error when the container cannot be removed or the build
/// fails.
pub fn rebuild<R: ContainerRuntime, E: mockable::Env>(
    ctx: &CommandContext<'_, R, E>,
    name: Option<&str>,
    command: &BuildCommand,
) -> Result<CommandOutcome> {
    delete(ctx, name)?;
    build(ctx, command)
}
