//! Image builder trait and build spec types.
//!
//! Builders hand a fully resolved service to an external container build
//! engine. The engine owns layer construction, caching, and everything else
//! about how the image actually gets made.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::service::ResolvedBuildService;
use crate::Result;

/// Everything the build engine needs for a single image build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpec {
    /// Service this build came from.
    pub service: String,
    /// Tag applied to the built image (`name:tag`).
    pub image: String,
    /// Build context directory on the local filesystem.
    pub context: PathBuf,
    /// Network mode for build-time containers.
    pub network: String,
    /// `name=value` build arguments, declaration order preserved.
    pub args: Vec<(String, String)>,
}

impl From<ResolvedBuildService> for BuildSpec {
    fn from(service: ResolvedBuildService) -> Self {
        Self {
            image: service.image.to_string(),
            context: PathBuf::from(&service.context),
            network: service.network,
            args: service.args,
            service: service.name,
        }
    }
}

/// Result of a completed image build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildOutcome {
    /// Tag of the image that was built.
    pub image: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Trait for image build backends.
#[async_trait]
pub trait ImageBuilder: Send + Sync {
    /// Name of this builder.
    fn name(&self) -> &'static str;

    /// Check whether the build engine is reachable.
    async fn available(&self) -> bool;

    /// Build one image and wait for the engine to finish.
    async fn build(&self, spec: &BuildSpec) -> Result<BuildOutcome>;
}
