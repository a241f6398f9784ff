//! Engine health checks.
//!
//! A connection is only handed out once the engine has answered a ping, so a
//! stopped daemon or a socket pointing at the wrong service fails up front
//! instead of halfway through a session.

use std::time::Duration;

use bollard::Docker;

use super::{EngineConnector, HEALTH_CHECK_TIMEOUT_SECS, SocketResolver};
use crate::error::{ContainerError, DevctrError};

impl EngineConnector {
    /// Ping the engine, failing after [`HEALTH_CHECK_TIMEOUT_SECS`].
    async fn ping_with_timeout(docker: &Docker) -> Result<(), DevctrError> {
        let timeout = Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS);

        tokio::time::timeout(timeout, docker.ping())
            .await
            .map_err(|_| {
                DevctrError::from(ContainerError::HealthCheckTimeout {
                    seconds: HEALTH_CHECK_TIMEOUT_SECS,
                })
            })?
            .map_err(|e| {
                DevctrError::from(ContainerError::HealthCheckFailed {
                    message: e.to_string(),
                })
            })?;
        Ok(())
    }

    /// Verify the container engine is responsive.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::HealthCheckFailed` if the engine does not
    /// respond correctly, or `ContainerError::HealthCheckTimeout` if it does
    /// not respond in time.
    pub async fn health_check_async(docker: &Docker) -> Result<(), DevctrError> {
        Self::ping_with_timeout(docker).await
    }

    /// Resolve the socket, connect, and verify the engine responds.
    ///
    /// # Errors
    ///
    /// Returns connection errors from [`Self::connect`] and health check
    /// errors from [`Self::health_check_async`].
    pub async fn connect_with_fallback_and_verify_async<E: mockable::Env>(
        config_socket: Option<&str>,
        resolver: &SocketResolver<'_, E>,
    ) -> Result<Docker, DevctrError> {
        let docker = Self::connect_with_fallback(config_socket, resolver)?;
        Self::ping_with_timeout(&docker).await?;
        Ok(docker)
    }

    /// Blocking variant of [`Self::connect_with_fallback_and_verify_async`]
    /// driven by a caller-owned runtime.
    ///
    /// # Errors
    ///
    /// Returns the same errors as the async variant.
    pub fn connect_with_fallback_and_verify<E: mockable::Env>(
        runtime: &tokio::runtime::Runtime,
        config_socket: Option<&str>,
        resolver: &SocketResolver<'_, E>,
    ) -> Result<Docker, DevctrError> {
        runtime.block_on(Self::connect_with_fallback_and_verify_async(
            config_socket,
            resolver,
        ))
    }
}
