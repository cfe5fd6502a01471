//! Local Docker build backend.

use async_trait::async_trait;
use bakery_core::builder::{BuildOutcome, BuildSpec, ImageBuilder};
use bakery_core::{Error, Result};
use bollard::image::BuildImageOptions;
use bollard::Docker;
use chrono::Utc;
use futures::StreamExt;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::context::pack_context;

/// Builder backed by the local Docker daemon.
pub struct DockerBuilder {
    docker: Docker,
}

impl DockerBuilder {
    /// Connect to the local Docker daemon.
    pub fn new() -> Result<Self> {
        let docker =
            Docker::connect_with_local_defaults().map_err(|e| Error::Unavailable(e.to_string()))?;
        Ok(Self { docker })
    }

    /// Create with a custom Docker client.
    pub fn with_client(docker: Docker) -> Self {
        Self { docker }
    }
}

#[async_trait]
impl ImageBuilder for DockerBuilder {
    fn name(&self) -> &'static str {
        "docker"
    }

    async fn available(&self) -> bool {
        self.docker.ping().await.is_ok()
    }

    async fn build(&self, spec: &BuildSpec) -> Result<BuildOutcome> {
        let started_at = Utc::now();

        info!(
            service = %spec.service,
            image = %spec.image,
            context = %spec.context.display(),
            network = %spec.network,
            "Building image"
        );
        let tarball = pack_context(&spec.context)?;

        let buildargs: HashMap<String, String> = spec.args.iter().cloned().collect();
        let options = BuildImageOptions {
            dockerfile: "Dockerfile".to_string(),
            t: spec.image.clone(),
            networkmode: spec.network.clone(),
            buildargs,
            rm: true,
            ..Default::default()
        };

        let mut stream = self.docker.build_image(options, None, Some(tarball));
        while let Some(result) = stream.next().await {
            let progress = result.map_err(|e| Error::BuildFailed(e.to_string()))?;

            if let Some(message) = progress.stream {
                for line in message.lines().filter(|l| !l.trim().is_empty()) {
                    debug!(image = %spec.image, "{}", line);
                }
            }
            if let Some(status) = progress.status {
                debug!(status = %status, "Build progress");
            }
            if let Some(error) = progress.error {
                return Err(Error::BuildFailed(error));
            }
        }

        let finished_at = Utc::now();
        info!(image = %spec.image, "Build complete");

        Ok(BuildOutcome {
            image: spec.image.clone(),
            started_at,
            finished_at,
        })
    }
}
