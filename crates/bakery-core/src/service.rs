//! Build service definitions.
//!
//! A [`BuildService`] is a declared build target exactly as it appears in the
//! manifest: its string fields may still contain `${VAR}` placeholders. A
//! [`ResolvedBuildService`] is the same target after every placeholder has
//! been substituted against an environment; it is what gets handed to the
//! build engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Network mode applied when a service does not resolve one of its own.
pub const DEFAULT_NETWORK: &str = "bridge";

/// A declared build target, templated form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildService {
    /// Service name, unique within the manifest.
    pub name: String,
    /// Build context path template.
    pub context: String,
    /// Build network template; `None` when the manifest omits it.
    pub network: Option<String>,
    /// Build arguments, in declaration order.
    pub args: Vec<BuildArg>,
    /// Image reference template (`name:tag`).
    pub image: String,
}

/// A single build argument declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildArg {
    /// A bare name: the value is taken from the environment at resolve time.
    FromEnv(String),
    /// `NAME=template`: the value template is carried in the manifest.
    Inline { name: String, template: String },
}

impl BuildArg {
    /// The argument name as surfaced to the build script.
    pub fn name(&self) -> &str {
        match self {
            BuildArg::FromEnv(name) => name,
            BuildArg::Inline { name, .. } => name,
        }
    }
}

/// A build target with every placeholder substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedBuildService {
    pub name: String,
    /// Build context path, ready to hand to the engine.
    pub context: String,
    /// Build network, never empty (defaults to [`DEFAULT_NETWORK`]).
    pub network: String,
    /// `name=value` build arguments, declaration order preserved.
    pub args: Vec<(String, String)>,
    pub image: ImageRef,
}

/// A `name:tag` container image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub name: String,
    pub tag: String,
}

impl ImageRef {
    /// Split a reference into name and tag. A missing tag means `latest`.
    /// A colon inside the last path component is a tag separator; one before
    /// a `/` belongs to a registry port.
    pub fn parse(reference: &str) -> Self {
        match reference.rsplit_once(':') {
            Some((name, tag)) if !tag.contains('/') && !name.is_empty() => Self {
                name: name.to_string(),
                tag: tag.to_string(),
            },
            _ => Self {
                name: reference.to_string(),
                tag: "latest".to_string(),
            },
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.tag)
    }
}
