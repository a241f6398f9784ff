//! Engine housekeeping: building the development image and pruning unused
//! resources.

mod context;

use std::collections::HashMap;
use std::pin::Pin;

use bollard::errors::Error as BollardError;
use bollard::models::{
    BuildInfo, ContainerPruneResponse, ImagePruneResponse, NetworkPruneResponse,
    VolumePruneResponse,
};
use bollard::query_parameters::{
    BuildImageOptions, BuildImageOptionsBuilder, PruneContainersOptions, PruneImagesOptionsBuilder,
    PruneNetworksOptions, PruneVolumesOptions,
};
use bollard::{Docker, body_full};
use camino::{Utf8Path, Utf8PathBuf};
use futures_util::{Stream, StreamExt};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use self::context::{DOCKERFILE, pack_build_context};
use super::EngineConnector;
use super::lifecycle::EngineFuture;
use crate::error::{ConfigError, ContainerError, DevctrError};

/// Boxed stream of build progress messages.
pub type BuildStream<'a> = Pin<Box<dyn Stream<Item = Result<BuildInfo, BollardError>> + Send + 'a>>;

/// Engine calls for image builds and resource pruning.
pub trait EngineMaintenanceClient {
    /// Remove every stopped container.
    fn prune_containers(&self) -> EngineFuture<'_, ContainerPruneResponse>;

    /// Remove unused images; only untagged ones when `dangling_only`.
    fn prune_images(&self, dangling_only: bool) -> EngineFuture<'_, ImagePruneResponse>;

    /// Remove networks no container uses.
    fn prune_networks(&self) -> EngineFuture<'_, NetworkPruneResponse>;

    /// Remove volumes no container uses.
    fn prune_volumes(&self) -> EngineFuture<'_, VolumePruneResponse>;

    /// Build an image from a tar archive of its context.
    fn build_image(&self, options: BuildImageOptions, context: Vec<u8>) -> BuildStream<'_>;
}

impl EngineMaintenanceClient for Docker {
    fn prune_containers(&self) -> EngineFuture<'_, ContainerPruneResponse> {
        Box::pin(async move { Self::prune_containers(self, None::<PruneContainersOptions>).await })
    }

    fn prune_images(&self, dangling_only: bool) -> EngineFuture<'_, ImagePruneResponse> {
        let filters = HashMap::from([("dangling", vec![dangling_only.to_string()])]);
        let options = PruneImagesOptionsBuilder::new().filters(&filters).build();
        Box::pin(async move { Self::prune_images(self, Some(options)).await })
    }

    fn prune_networks(&self) -> EngineFuture<'_, NetworkPruneResponse> {
        Box::pin(async move { Self::prune_networks(self, None::<PruneNetworksOptions>).await })
    }

    fn prune_volumes(&self) -> EngineFuture<'_, VolumePruneResponse> {
        Box::pin(async move { Self::prune_volumes(self, None::<PruneVolumesOptions>).await })
    }

    fn build_image(&self, options: BuildImageOptions, context: Vec<u8>) -> BuildStream<'_> {
        Box::pin(Self::build_image(
            self,
            options,
            None,
            Some(body_full(context.into())),
        ))
    }
}

/// Which unused resources a prune removes.
///
/// Stopped containers and dangling images always go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PruneScope {
    /// Also remove unused networks and every unused image.
    pub all: bool,
    /// Also remove unused volumes.
    pub volumes: bool,
}

/// What a prune removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PruneSummary {
    /// Containers removed.
    pub containers: usize,
    /// Image layers and tags removed.
    pub images: usize,
    /// Networks removed.
    pub networks: usize,
    /// Volumes removed.
    pub volumes: usize,
    /// Disk space freed, in bytes.
    pub space_reclaimed: u64,
}

/// An image build from a directory on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    context_dir: Utf8PathBuf,
    tag: String,
    no_cache: bool,
}

impl BuildRequest {
    /// Build `context_dir`'s `Dockerfile` and tag the result `tag`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRequired` when `tag` is blank.
    pub fn new(context_dir: &Utf8Path, tag: &str) -> Result<Self, DevctrError> {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            return Err(DevctrError::from(ConfigError::MissingRequired {
                field: String::from("image"),
            }));
        }
        Ok(Self {
            context_dir: context_dir.to_owned(),
            tag: String::from(trimmed),
            no_cache: false,
        })
    }

    /// Ignore cached layers.
    #[must_use]
    pub const fn with_no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }

    /// Directory sent as the build context.
    #[must_use]
    pub fn context_dir(&self) -> &Utf8Path {
        &self.context_dir
    }

    /// Tag applied to the built image.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Whether cached layers are ignored.
    #[must_use]
    pub const fn no_cache(&self) -> bool {
        self.no_cache
    }
}

impl EngineConnector {
    /// Remove the unused resources `scope` selects.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::PruneFailed` naming the first resource kind
    /// the engine refused to prune.
    pub async fn prune_async<C: EngineMaintenanceClient>(
        client: &C,
        scope: PruneScope,
    ) -> Result<PruneSummary, DevctrError> {
        let mut summary = PruneSummary::default();

        let containers = client
            .prune_containers()
            .await
            .map_err(|error| prune_failed("containers", &error))?;
        summary.containers = containers.containers_deleted.map_or(0, |deleted| deleted.len());
        summary.space_reclaimed += reclaimed(containers.space_reclaimed);

        if scope.all {
            let networks = client
                .prune_networks()
                .await
                .map_err(|error| prune_failed("networks", &error))?;
            summary.networks = networks.networks_deleted.map_or(0, |deleted| deleted.len());
        }

        let images = client
            .prune_images(!scope.all)
            .await
            .map_err(|error| prune_failed("images", &error))?;
        summary.images = images.images_deleted.map_or(0, |deleted| deleted.len());
        summary.space_reclaimed += reclaimed(images.space_reclaimed);

        if scope.volumes {
            let volumes = client
                .prune_volumes()
                .await
                .map_err(|error| prune_failed("volumes", &error))?;
            summary.volumes = volumes.volumes_deleted.map_or(0, |deleted| deleted.len());
            summary.space_reclaimed += reclaimed(volumes.space_reclaimed);
        }

        Ok(summary)
    }

    /// Build and tag an image, copying the build output to `writer`.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::BuildFailed` when the context cannot be
    /// packed, the engine rejects the build, or a build step fails.
    pub async fn build_image_async<C: EngineMaintenanceClient, W: AsyncWrite + Unpin>(
        client: &C,
        request: &BuildRequest,
        writer: &mut W,
    ) -> Result<(), DevctrError> {
        let build_failed = |message: String| {
            DevctrError::from(ContainerError::BuildFailed {
                image: String::from(request.tag()),
                message,
            })
        };

        let archive = pack_build_context(request.context_dir())
            .map_err(|error| build_failed(format!("cannot pack build context: {error}")))?;
        let options = BuildImageOptionsBuilder::new()
            .dockerfile(DOCKERFILE)
            .t(request.tag())
            .nocache(request.no_cache())
            .rm(true)
            .build();

        let mut progress = client.build_image(options, archive);
        while let Some(step) = progress.next().await {
            let info = step.map_err(|error| build_failed(error.to_string()))?;
            if let Some(message) = info.error_detail.and_then(|detail| detail.message) {
                return Err(build_failed(message));
            }
            if let Some(text) = info.stream {
                writer
                    .write_all(text.as_bytes())
                    .await
                    .map_err(|error| build_failed(format!("failed writing output: {error}")))?;
            }
        }
        writer
            .flush()
            .await
            .map_err(|error| build_failed(format!("failed writing output: {error}")))
    }
}

fn prune_failed(resource: &str, error: &BollardError) -> DevctrError {
    DevctrError::from(ContainerError::PruneFailed {
        resource: String::from(resource),
        message: error.to_string(),
    })
}

fn reclaimed(bytes: Option<i64>) -> u64 {
    bytes.and_then(|value| u64::try_from(value).ok()).unwrap_or(0)
}
