//! Container lifecycle calls: start, stop, remove, inspect, list, and logs.
//!
//! Each call goes through [`ContainerLifecycleClient`] so the error mapping
//! can be exercised against a mock. A 404 from any of these calls means the
//! container (or image) is unknown and is reported as
//! `ContainerError::NotFound`; every other failure keeps the operation that
//! produced it.

use std::future::Future;
use std::pin::Pin;

use bollard::Docker;
use bollard::container::LogOutput;
use bollard::errors::Error as BollardError;
use bollard::models::{ContainerInspectResponse, ContainerSummary, ImageInspect};
use bollard::query_parameters::{
    InspectContainerOptions, ListContainersOptions, LogsOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use futures_util::{Stream, StreamExt};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::EngineConnector;
use super::error_classification::classify_response_error;
use crate::error::{ContainerError, DevctrError};

/// Boxed future returned by [`ContainerLifecycleClient`] calls.
pub type EngineFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BollardError>> + Send + 'a>>;

/// Boxed stream of container log frames.
pub type LogStream<'a> = Pin<Box<dyn Stream<Item = Result<LogOutput, BollardError>> + Send + 'a>>;

/// Engine calls that manage an existing container.
pub trait ContainerLifecycleClient {
    /// Start a created or stopped container.
    fn start_container(&self, name: &str) -> EngineFuture<'_, ()>;

    /// Stop a running container, killing it after `timeout_secs`.
    fn stop_container(&self, name: &str, timeout_secs: i32) -> EngineFuture<'_, ()>;

    /// Remove a container; `force` also kills a running one.
    fn remove_container(&self, name: &str, force: bool) -> EngineFuture<'_, ()>;

    /// Inspect a container.
    fn inspect_container(&self, name: &str) -> EngineFuture<'_, ContainerInspectResponse>;

    /// List all containers, running or not.
    fn list_containers(&self) -> EngineFuture<'_, Vec<ContainerSummary>>;

    /// Inspect a local image.
    fn inspect_image(&self, reference: &str) -> EngineFuture<'_, ImageInspect>;

    /// Stream a container's stdout and stderr.
    fn logs(&self, name: &str, follow: bool, tail: u32) -> LogStream<'_>;
}

impl ContainerLifecycleClient for Docker {
    fn start_container(&self, name: &str) -> EngineFuture<'_, ()> {
        let name_owned = String::from(name);
        Box::pin(async move {
            Self::start_container(self, &name_owned, None::<StartContainerOptions>).await
        })
    }

    fn stop_container(&self, name: &str, timeout_secs: i32) -> EngineFuture<'_, ()> {
        let name_owned = String::from(name);
        let options = StopContainerOptions {
            t: Some(timeout_secs),
            ..StopContainerOptions::default()
        };
        Box::pin(async move { Self::stop_container(self, &name_owned, Some(options)).await })
    }

    fn remove_container(&self, name: &str, force: bool) -> EngineFuture<'_, ()> {
        let name_owned = String::from(name);
        let options = RemoveContainerOptions {
            force,
            ..RemoveContainerOptions::default()
        };
        Box::pin(async move { Self::remove_container(self, &name_owned, Some(options)).await })
    }

    fn inspect_container(&self, name: &str) -> EngineFuture<'_, ContainerInspectResponse> {
        let name_owned = String::from(name);
        Box::pin(async move {
            Self::inspect_container(self, &name_owned, None::<InspectContainerOptions>).await
        })
    }

    fn list_containers(&self) -> EngineFuture<'_, Vec<ContainerSummary>> {
        let options = ListContainersOptions {
            all: true,
            ..ListContainersOptions::default()
        };
        Box::pin(async move { Self::list_containers(self, Some(options)).await })
    }

    fn inspect_image(&self, reference: &str) -> EngineFuture<'_, ImageInspect> {
        let reference_owned = String::from(reference);
        Box::pin(async move { Self::inspect_image(self, &reference_owned).await })
    }

    fn logs(&self, name: &str, follow: bool, tail: u32) -> LogStream<'_> {
        let options = LogsOptions {
            follow,
            stdout: true,
            stderr: true,
            tail: tail.to_string(),
            ..LogsOptions::default()
        };
        Box::pin(Self::logs(self, name, Some(options)))
    }
}

impl EngineConnector {
    /// Start the named container.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::NotFound` for an unknown container and
    /// `ContainerError::StartFailed` otherwise.
    pub async fn start_container_async<C: ContainerLifecycleClient>(
        client: &C,
        name: &str,
    ) -> Result<(), DevctrError> {
        client.start_container(name).await.map_err(|error| {
            DevctrError::from(classify_response_error(&error, name, |message| {
                ContainerError::StartFailed {
                    container_id: String::from(name),
                    message,
                }
            }))
        })
    }

    /// Stop the named container.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::NotFound` for an unknown container and
    /// `ContainerError::StopFailed` otherwise.
    pub async fn stop_container_async<C: ContainerLifecycleClient>(
        client: &C,
        name: &str,
        timeout_secs: u64,
    ) -> Result<(), DevctrError> {
        let timeout = i32::try_from(timeout_secs).unwrap_or(i32::MAX);
        client
            .stop_container(name, timeout)
            .await
            .map_err(|error| {
                DevctrError::from(classify_response_error(&error, name, |message| {
                    ContainerError::StopFailed {
                        container_id: String::from(name),
                        message,
                    }
                }))
            })
    }

    /// Remove the named container.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::NotFound` for an unknown container and
    /// `ContainerError::RemoveFailed` otherwise.
    pub async fn remove_container_async<C: ContainerLifecycleClient>(
        client: &C,
        name: &str,
        force: bool,
    ) -> Result<(), DevctrError> {
        client.remove_container(name, force).await.map_err(|error| {
            DevctrError::from(classify_response_error(&error, name, |message| {
                ContainerError::RemoveFailed {
                    container_id: String::from(name),
                    message,
                }
            }))
        })
    }

    /// Inspect the named container.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::NotFound` for an unknown container and
    /// `ContainerError::InspectFailed` otherwise.
    pub async fn inspect_container_async<C: ContainerLifecycleClient>(
        client: &C,
        name: &str,
    ) -> Result<ContainerInspectResponse, DevctrError> {
        client
            .inspect_container(name)
            .await
            .map_err(|error| inspect_failed(&error, name))
    }

    /// Inspect a local image.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::NotFound` when the image is not present
    /// locally and `ContainerError::InspectFailed` otherwise.
    pub async fn inspect_image_async<C: ContainerLifecycleClient>(
        client: &C,
        reference: &str,
    ) -> Result<ImageInspect, DevctrError> {
        client
            .inspect_image(reference)
            .await
            .map_err(|error| inspect_failed(&error, reference))
    }

    /// List every container known to the engine.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::ListFailed` when the engine rejects the call.
    pub async fn list_containers_async<C: ContainerLifecycleClient>(
        client: &C,
    ) -> Result<Vec<ContainerSummary>, DevctrError> {
        client.list_containers().await.map_err(|error| {
            DevctrError::from(ContainerError::ListFailed {
                message: error.to_string(),
            })
        })
    }

    /// Copy the container's log frames to `writer` until the stream ends.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::NotFound` for an unknown container and
    /// `ContainerError::LogsFailed` for stream or write failures.
    pub async fn stream_logs_async<C: ContainerLifecycleClient, W: AsyncWrite + Unpin>(
        client: &C,
        name: &str,
        follow: bool,
        tail: u32,
        writer: &mut W,
    ) -> Result<(), DevctrError> {
        let logs_failed = |message: String| ContainerError::LogsFailed {
            container_id: String::from(name),
            message,
        };

        let mut frames = client.logs(name, follow, tail);
        while let Some(frame) = frames.next().await {
            let log = frame
                .map_err(|error| DevctrError::from(classify_response_error(&error, name, logs_failed)))?;
            writer
                .write_all(&log.into_bytes())
                .await
                .map_err(|error| DevctrError::from(logs_failed(error.to_string())))?;
        }
        writer
            .flush()
            .await
            .map_err(|error| DevctrError::from(logs_failed(error.to_string())))
    }
}

fn inspect_failed(error: &BollardError, target: &str) -> DevctrError {
    DevctrError::from(classify_response_error(error, target, |message| {
        ContainerError::InspectFailed {
            target: String::from(target),
            message,
        }
    }))
}
