//! Stopping and removing development containers.

use tracing::info;

use super::{CommandContext, CommandOutcome, Confirm};
use crate::engine::{ContainerRuntime, ContainerSummary};
use crate::error::Result;

/// Which containers `stop` acts on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StopCommand {
    /// Explicit container name; the working directory's container otherwise.
    pub name: Option<String>,
    /// Stop every running development container instead.
    pub all: bool,
    /// Skip the confirmation prompt for `all`.
    pub assume_yes: bool,
}

/// Which containers `cleanup` removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CleanupCommand {
    /// Also stop and remove running containers.
    pub all: bool,
    /// Skip the confirmation prompt.
    pub assume_yes: bool,
}

/// Stop one container, or every running one with `all`.
///
/// # Errors
///
/// Returns an error when the engine cannot list or stop a container.
pub fn stop<R: ContainerRuntime, E: mockable::Env, C: Confirm>(
    ctx: &CommandContext<'_, R, E>,
    command: &StopCommand,
    confirm: &C,
) -> Result<CommandOutcome> {
    let timeout = ctx.settings.stop_timeout_secs;

    if !command.all {
        let identity = ctx.target(command.name.as_deref());
        if ctx.runtime.running(identity.as_str())? {
            info!("Stopping container {identity}.");
            ctx.runtime.stop(identity.as_str(), timeout)?;
        } else {
            info!("Container {identity} is not running.");
        }
        return Ok(CommandOutcome::Success);
    }

    let running: Vec<ContainerSummary> = ctx
        .dev_containers()?
        .into_iter()
        .filter(|container| container.running)
        .collect();
    if running.is_empty() {
        info!("No running development containers found.");
        return Ok(CommandOutcome::Success);
    }

    let prompt = format!(
        "Stop {} running development container(s): {}?",
        running.len(),
        names(&running)
    );
    if !command.assume_yes && !confirm.confirm(&prompt) {
        info!("Operation cancelled.");
        return Ok(CommandOutcome::Cancelled);
    }

    for container in &running {
        info!("Stopping {}.", container.name);
        ctx.runtime.stop(&container.name, timeout)?;
    }
    info!("All development containers stopped.");
    Ok(CommandOutcome::Success)
}

/// Stop the container if it is running, then remove it.
///
/// A missing container is reported, not treated as an error.
///
/// # Errors
///
/// Returns an error when the engine cannot stop or remove the container.
pub fn delete<R: ContainerRuntime, E: mockable::Env>(
    ctx: &CommandContext<'_, R, E>,
    name: Option<&str>,
) -> Result<CommandOutcome> {
    let identity = ctx.target(name);
    if !ctx.runtime.exists(identity.as_str())? {
        info!("Container {identity} does not exist.");
        return Ok(CommandOutcome::Success);
    }

    if ctx.runtime.running(identity.as_str())? {
        info!("Stopping container {identity}.");
        ctx.runtime
            .stop(identity.as_str(), ctx.settings.stop_timeout_secs)?;
    }
    info!("Removing container {identity}.");
    ctx.runtime.remove(identity.as_str())?;
    Ok(CommandOutcome::Success)
}

/// Remove stopped development containers; `all` includes running ones.
///
/// Only containers carrying the development name prefix are touched.
///
/// # Errors
///
/// Returns an error when the engine cannot list, stop, or remove a
/// container.
pub fn cleanup<R: ContainerRuntime, E: mockable::Env, C: Confirm>(
    ctx: &CommandContext<'_, R, E>,
    command: CleanupCommand,
    confirm: &C,
) -> Result<CommandOutcome> {
    let candidates: Vec<ContainerSummary> = ctx
        .dev_containers()?
        .into_iter()
        .filter(|container| command.all || !container.running)
        .collect();
    if candidates.is_empty() {
        info!("No development containers to remove.");
        return Ok(CommandOutcome::Success);
    }

    let prompt = format!(
        "Remove {} development container(s): {}?",
        candidates.len(),
        names(&candidates)
    );
    if !command.assume_yes && !confirm.confirm(&prompt) {
        info!("Operation cancelled.");
        return Ok(CommandOutcome::Cancelled);
    }

    for container in &candidates {
        if container.running {
            info!("Stopping {}.", container.name);
            ctx.runtime
                .stop(&container.name, ctx.settings.stop_timeout_secs)?;
        }
        info!("Removing {}.", container.name);
        ctx.runtime.remove(&container.name)?;
    }
    info!("Removed {} development container(s).", candidates.len());
    Ok(CommandOutcome::Success)
}

fn names(containers: &[ContainerSummary]) -> String {
    containers
        .iter()
        .map(|container| container.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
