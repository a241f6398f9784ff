//! Read-only commands: `status` and `logs`.

use std::fmt;

use tracing::info;

use super::{CommandContext, CommandOutcome};
use crate::engine::{ContainerDetails, ContainerRuntime, LogsRequest};
use crate::error::Result;

/// Presence of the development image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageStatus {
    /// Image reference.
    pub reference: String,
    /// Creation time when the image is present locally.
    pub created: Option<String>,
}

/// State of one development container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStatus {
    /// Container name.
    pub name: String,
    /// Engine details; `None` when the container does not exist.
    pub details: Option<ContainerDetails>,
}

/// Everything `dev status` shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// The development image.
    pub image: ImageStatus,
    /// The selected container.
    pub container: ContainerStatus,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Development Environment Status:")?;
        writeln!(f, "{}", "=".repeat(40))?;
        match &self.image.created {
            Some(created) => writeln!(f, "Image: {} (Created: {created})", self.image.reference)?,
            None => writeln!(f, "Image: {} (Not found)", self.image.reference)?,
        }

        let name = &self.container.name;
        let Some(details) = &self.container.details else {
            writeln!(f, "Container: {name} (Not found)")?;
            return write!(f, "{}", "=".repeat(40));
        };

        let state = if details.running { "Running" } else { "Stopped" };
        writeln!(f, "Container: {name} ({state})")?;
        writeln!(
            f,
            "Started: {}",
            details.started_at.as_deref().unwrap_or("Unknown")
        )?;
        writeln!(
            f,
            "IP Address: {}",
            details.ip_address.as_deref().unwrap_or("None")
        )?;
        if !details.ports.is_empty() {
            writeln!(f, "Port Mappings:")?;
            for port in &details.ports {
                writeln!(f, "  {} -> {}", port.port_key(), port.host_port)?;
            }
        }
        if !details.mounts.is_empty() {
            writeln!(f, "Volume Mounts:")?;
            for mount in &details.mounts {
                writeln!(f, "  {} -> {}", mount.source, mount.destination)?;
            }
        }
        write!(f, "{}", "=".repeat(40))
    }
}

/// Collect image and container status.
///
/// # Errors
///
/// Returns an error when the engine cannot answer.
pub fn status<R: ContainerRuntime, E: mockable::Env>(
    ctx: &CommandContext<'_, R, E>,
    name: Option<&str>,
) -> Result<StatusReport> {
    let identity = ctx.target(name);
    let reference = ctx.settings.image.clone();
    let created = ctx.runtime.image_created(&reference)?;

    let details = if ctx.runtime.exists(identity.as_str())? {
        Some(ctx.runtime.inspect(identity.as_str())?)
    } else {
        None
    };

    Ok(StatusReport {
        image: ImageStatus { reference, created },
        container: ContainerStatus {
            name: String::from(identity.as_str()),
            details,
        },
    })
}

/// Stream a container's logs to standard output.
///
/// # Errors
///
/// Returns an error when the logs cannot be read.
pub fn logs<R: ContainerRuntime, E: mockable::Env>(
    ctx: &CommandContext<'_, R, E>,
    name: Option<&str>,
    request: &LogsRequest,
) -> Result<CommandOutcome> {
    let identity = ctx.target(name);
    if !ctx.runtime.exists(identity.as_str())? {
        info!("Container {identity} does not exist.");
        return Ok(CommandOutcome::Success);
    }
    ctx.runtime.logs(identity.as_str(), request)?;
    Ok(CommandOutcome::Success)
}
