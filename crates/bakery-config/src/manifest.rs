//! Build manifest parsing and service resolution.

use crate::variables::Environment;
use crate::{ConfigError, ConfigResult};
use bakery_core::{BuildArg, BuildService, ImageRef, ResolvedBuildService, DEFAULT_NETWORK};
use serde_yaml::Value;
use std::path::Path;

/// A parsed build manifest: a schema version and the declared services,
/// in document order. String fields are still templates at this point;
/// see [`Manifest::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub version: String,
    pub services: Vec<BuildService>,
}

impl Manifest {
    /// Parse a manifest from YAML text.
    pub fn parse(input: &str) -> ConfigResult<Self> {
        let doc: Value = serde_yaml::from_str(input)?;

        if doc.as_mapping().is_none() {
            return Err(ConfigError::InvalidValue {
                field: "document".to_string(),
                message: "expected a mapping at the top level".to_string(),
            });
        }

        let version = match doc.get("version") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(_) => {
                return Err(ConfigError::InvalidValue {
                    field: "version".to_string(),
                    message: "expected a string".to_string(),
                });
            }
            None => return Err(ConfigError::MissingField("version".to_string())),
        };

        // Compose schema family 3 only.
        if version != "3" && !version.starts_with("3.") {
            return Err(ConfigError::InvalidValue {
                field: "version".to_string(),
                message: format!("unsupported schema version '{}'", version),
            });
        }

        let services_node = doc
            .get("services")
            .ok_or_else(|| ConfigError::MissingField("services".to_string()))?;
        let services_map = services_node
            .as_mapping()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "services".to_string(),
                message: "expected a mapping of service name to definition".to_string(),
            })?;

        let mut services: Vec<BuildService> = Vec::with_capacity(services_map.len());
        for (key, value) in services_map {
            let name = key.as_str().ok_or_else(|| ConfigError::InvalidValue {
                field: "services".to_string(),
                message: "service names must be strings".to_string(),
            })?;
            // The YAML parser already rejects duplicate mapping keys; this
            // guards the invariant at the model level as well.
            if services.iter().any(|s| s.name == name) {
                return Err(ConfigError::Duplicate(name.to_string()));
            }
            services.push(parse_service(name, value)?);
        }

        Ok(Self { version, services })
    }

    /// Read and parse a manifest file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Look up a declared service by name.
    pub fn get(&self, name: &str) -> Option<&BuildService> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Resolve one service against an environment.
    pub fn resolve(&self, name: &str, env: &Environment) -> ConfigResult<ResolvedBuildService> {
        let service = self
            .get(name)
            .ok_or_else(|| ConfigError::InvalidReference(format!("no service named '{}'", name)))?;
        resolve_service(service, env)
    }

    /// Resolve every service, in manifest order.
    pub fn resolve_all(&self, env: &Environment) -> ConfigResult<Vec<ResolvedBuildService>> {
        self.services
            .iter()
            .map(|service| resolve_service(service, env))
            .collect()
    }
}

/// Substitute every placeholder in a service definition.
///
/// The network falls back to [`DEFAULT_NETWORK`] when the manifest omits it
/// or when it resolves to the empty string. Bare argument names are looked
/// up in the environment and must be set.
pub fn resolve_service(
    service: &BuildService,
    env: &Environment,
) -> ConfigResult<ResolvedBuildService> {
    let context = env.interpolate(&service.context)?;

    let network = match &service.network {
        Some(template) => {
            let network = env.interpolate(template)?;
            if network.is_empty() {
                DEFAULT_NETWORK.to_string()
            } else {
                network
            }
        }
        None => DEFAULT_NETWORK.to_string(),
    };

    let mut args = Vec::with_capacity(service.args.len());
    for arg in &service.args {
        let value = match arg {
            BuildArg::FromEnv(name) => env
                .get(name)
                .ok_or_else(|| ConfigError::UnresolvedVariable(name.clone()))?
                .to_string(),
            BuildArg::Inline { template, .. } => env.interpolate(template)?,
        };
        args.push((arg.name().to_string(), value));
    }

    let image = ImageRef::parse(&env.interpolate(&service.image)?);

    Ok(ResolvedBuildService {
        name: service.name.clone(),
        context,
        network,
        args,
        image,
    })
}

fn parse_service(name: &str, value: &Value) -> ConfigResult<BuildService> {
    if value.as_mapping().is_none() {
        return Err(ConfigError::InvalidValue {
            field: format!("services.{}", name),
            message: "expected a mapping".to_string(),
        });
    }

    let image = match value.get("image") {
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            return Err(ConfigError::InvalidValue {
                field: format!("services.{}.image", name),
                message: "expected a string".to_string(),
            });
        }
        None => {
            return Err(ConfigError::MissingField(format!(
                "image for service '{}'",
                name
            )));
        }
    };

    let build = value.get("build").ok_or_else(|| {
        ConfigError::MissingField(format!("build for service '{}'", name))
    })?;

    // `build: ./path` shorthand or the full mapping form.
    let (context, network, args) = match build {
        Value::String(context) => (context.clone(), None, Vec::new()),
        Value::Mapping(_) => {
            let context = match build.get("context") {
                Some(Value::String(s)) => s.clone(),
                Some(_) => {
                    return Err(ConfigError::InvalidValue {
                        field: format!("services.{}.build.context", name),
                        message: "expected a string".to_string(),
                    });
                }
                None => {
                    return Err(ConfigError::MissingField(format!(
                        "build.context for service '{}'",
                        name
                    )));
                }
            };

            let network = match build.get("network") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(_) => {
                    return Err(ConfigError::InvalidValue {
                        field: format!("services.{}.build.network", name),
                        message: "expected a string".to_string(),
                    });
                }
                None => None,
            };

            let args = match build.get("args") {
                Some(node) => parse_args(name, node)?,
                None => Vec::new(),
            };

            (context, network, args)
        }
        _ => {
            return Err(ConfigError::InvalidValue {
                field: format!("services.{}.build", name),
                message: "expected a mapping or a context path".to_string(),
            });
        }
    };

    Ok(BuildService {
        name: name.to_string(),
        context,
        network,
        args,
        image,
    })
}

fn parse_args(service: &str, node: &Value) -> ConfigResult<Vec<BuildArg>> {
    match node {
        // List form: `- NAME` pulls from the environment, `- NAME=template`
        // carries an inline value template.
        Value::Sequence(items) => items
            .iter()
            .map(|item| {
                let entry = item.as_str().ok_or_else(|| ConfigError::InvalidValue {
                    field: format!("services.{}.build.args", service),
                    message: "list entries must be strings".to_string(),
                })?;
                Ok(match entry.split_once('=') {
                    Some((name, template)) => BuildArg::Inline {
                        name: name.to_string(),
                        template: template.to_string(),
                    },
                    None => BuildArg::FromEnv(entry.to_string()),
                })
            })
            .collect(),
        // Mapping form: `NAME: template`.
        Value::Mapping(map) => map
            .iter()
            .map(|(key, value)| {
                let name = key.as_str().ok_or_else(|| ConfigError::InvalidValue {
                    field: format!("services.{}.build.args", service),
                    message: "argument names must be strings".to_string(),
                })?;
                let template = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => {
                        return Err(ConfigError::InvalidValue {
                            field: format!("services.{}.build.args.{}", service, name),
                            message: "expected a scalar value".to_string(),
                        });
                    }
                };
                Ok(BuildArg::Inline {
                    name: name.to_string(),
                    template,
                })
            })
            .collect(),
        _ => Err(ConfigError::InvalidValue {
            field: format!("services.{}.build.args", service),
            message: "expected a list or a mapping".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE_MANIFEST: &str = r#"
version: '3.4'
services:
  base:
    build:
      context: ./base/${OSNAME}
      network: ${DOCKER_BUILD_NETWORK:-bridge}
      args:
        - OSNAME
        - DOCKER_UID
        - INDY_SDK_VERSION
    image: ${LST_BASE_DOCKER_NAME}:${LST_BASE_DOCKER_TAG}
  ci:
    build:
      context: ./ci/${OSNAME}
      network: ${DOCKER_BUILD_NETWORK:-bridge}
      args:
        - OSNAME
        - DOCKER_UID
        - PYTHON3_VERSION
    image: ${LST_CI_DOCKER_NAME}:${LST_CI_DOCKER_TAG}
  android_ndk:
    build:
      context: ./android_ndk/${OSNAME}
      network: ${DOCKER_BUILD_NETWORK:-bridge}
      args:
        - OSNAME
        - DOCKER_UID
        - ANDROID_NDK_VERSION
        - ANDROID_NDK_DIR
    image: ${LST_ANDROID_NDK_DOCKER_NAME}:${LST_ANDROID_NDK_DOCKER_TAG}
  android_build:
    build:
      context: ./android_build/${OSNAME}
      network: ${DOCKER_BUILD_NETWORK:-bridge}
      args:
        - OSNAME
        - DOCKER_UID
        - ANDROID_ARCHS
        - ANDROID_PREBUILT_DIR
        - RUST_TARGETS
    image: ${LST_ANDROID_BUILD_DOCKER_NAME}:${LST_ANDROID_BUILD_DOCKER_TAG}
"#;

    /// Environment with every variable the reference manifest consumes.
    fn full_env() -> Environment {
        Environment::new()
            .with("OSNAME", "ubuntu")
            .with("DOCKER_UID", "1000")
            .with("INDY_SDK_VERSION", "1.16")
            .with("PYTHON3_VERSION", "3.8")
            .with("ANDROID_NDK_VERSION", "r20")
            .with("ANDROID_NDK_DIR", "/opt/android-ndk")
            .with("ANDROID_ARCHS", "arm arm64 x86")
            .with("ANDROID_PREBUILT_DIR", "/opt/prebuilt")
            .with("RUST_TARGETS", "aarch64-linux-android")
            .with("LST_BASE_DOCKER_NAME", "sovrin/base")
            .with("LST_BASE_DOCKER_TAG", "0.1.0")
            .with("LST_CI_DOCKER_NAME", "sovrin/ci")
            .with("LST_CI_DOCKER_TAG", "0.1.0")
            .with("LST_ANDROID_NDK_DOCKER_NAME", "sovrin/android-ndk")
            .with("LST_ANDROID_NDK_DOCKER_TAG", "0.1.0")
            .with("LST_ANDROID_BUILD_DOCKER_NAME", "sovrin/android-build")
            .with("LST_ANDROID_BUILD_DOCKER_TAG", "0.1.0")
    }

    #[test]
    fn test_one_service_per_declared_name() {
        let manifest = Manifest::parse(REFERENCE_MANIFEST).unwrap();
        assert_eq!(manifest.version, "3.4");

        let names: Vec<&str> = manifest.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["base", "ci", "android_ndk", "android_build"]);
    }

    #[test]
    fn test_resolve_base_with_defaults() {
        let manifest = Manifest::parse(REFERENCE_MANIFEST).unwrap();
        let env = Environment::new()
            .with("OSNAME", "ubuntu")
            .with("DOCKER_UID", "1000")
            .with("INDY_SDK_VERSION", "1.16")
            .with("LST_BASE_DOCKER_NAME", "sovrin/base")
            .with("LST_BASE_DOCKER_TAG", "0.1.0");

        let resolved = manifest.resolve("base", &env).unwrap();
        assert_eq!(resolved.context, "./base/ubuntu");
        // DOCKER_BUILD_NETWORK unset: the default applies.
        assert_eq!(resolved.network, "bridge");
        assert_eq!(
            resolved.args,
            vec![
                ("OSNAME".to_string(), "ubuntu".to_string()),
                ("DOCKER_UID".to_string(), "1000".to_string()),
                ("INDY_SDK_VERSION".to_string(), "1.16".to_string()),
            ]
        );
        assert_eq!(resolved.image.to_string(), "sovrin/base:0.1.0");
    }

    #[test]
    fn test_missing_required_variable_names_it() {
        let manifest = Manifest::parse(REFERENCE_MANIFEST).unwrap();
        // Everything android_ndk needs except ANDROID_NDK_VERSION.
        let env = Environment::new()
            .with("OSNAME", "ubuntu")
            .with("DOCKER_UID", "1000")
            .with("ANDROID_NDK_DIR", "/opt/android-ndk")
            .with("LST_ANDROID_NDK_DOCKER_NAME", "sovrin/android-ndk")
            .with("LST_ANDROID_NDK_DOCKER_TAG", "0.1.0");

        let err = manifest.resolve("android_ndk", &env).unwrap_err();
        assert!(
            matches!(err, ConfigError::UnresolvedVariable(ref name) if name == "ANDROID_NDK_VERSION")
        );
    }

    #[test]
    fn test_network_override_applies_to_all_services() {
        let manifest = Manifest::parse(REFERENCE_MANIFEST).unwrap();
        let env = full_env().with("DOCKER_BUILD_NETWORK", "host");

        let resolved = manifest.resolve_all(&env).unwrap();
        assert_eq!(resolved.len(), 4);
        for service in &resolved {
            assert_eq!(service.network, "host");
        }
    }

    #[test]
    fn test_parse_is_idempotent() {
        let first = Manifest::parse(REFERENCE_MANIFEST).unwrap();
        let second = Manifest::parse(REFERENCE_MANIFEST).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_unknown_service() {
        let manifest = Manifest::parse(REFERENCE_MANIFEST).unwrap();
        let err = manifest.resolve("windows", &full_env()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidReference(_)));
    }

    #[test]
    fn test_duplicate_service_names_rejected() {
        let yaml = r#"
version: '3.4'
services:
  base:
    build: ./base
    image: a:1
  base:
    build: ./other
    image: b:1
"#;
        assert!(Manifest::parse(yaml).is_err());
    }

    #[test]
    fn test_missing_image_rejected() {
        let yaml = r#"
version: '3.4'
services:
  base:
    build: ./base
"#;
        let err = Manifest::parse(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn test_missing_context_rejected() {
        let yaml = r#"
version: '3.4'
services:
  base:
    build:
      network: host
    image: a:1
"#;
        let err = Manifest::parse(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let yaml = r#"
version: '2.1'
services:
  base:
    build: ./base
    image: a:1
"#;
        let err = Manifest::parse(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "version"));
    }

    #[test]
    fn test_build_shorthand_and_omitted_network() {
        let yaml = r#"
version: '3.4'
services:
  base:
    build: ./base
    image: a:1
"#;
        let manifest = Manifest::parse(yaml).unwrap();
        let resolved = manifest.resolve("base", &Environment::new()).unwrap();
        assert_eq!(resolved.context, "./base");
        assert_eq!(resolved.network, "bridge");
        assert!(resolved.args.is_empty());
    }

    #[test]
    fn test_inline_and_mapping_args() {
        let yaml = r#"
version: '3.4'
services:
  base:
    build:
      context: ./base
      args:
        - OSNAME
        - RUST_TARGETS=${RUST_TARGETS}
    image: a:1
  ci:
    build:
      context: ./ci
      args:
        PYTHON3_VERSION: '3.8'
    image: b:1
"#;
        let manifest = Manifest::parse(yaml).unwrap();
        let env = Environment::new()
            .with("OSNAME", "ubuntu")
            .with("RUST_TARGETS", "aarch64-linux-android");

        let base = manifest.resolve("base", &env).unwrap();
        assert_eq!(
            base.args,
            vec![
                ("OSNAME".to_string(), "ubuntu".to_string()),
                (
                    "RUST_TARGETS".to_string(),
                    "aarch64-linux-android".to_string()
                ),
            ]
        );

        let ci = manifest.resolve("ci", &env).unwrap();
        assert_eq!(ci.args, vec![("PYTHON3_VERSION".to_string(), "3.8".to_string())]);
    }

    #[test]
    fn test_resolved_service_serializes_to_json() {
        let manifest = Manifest::parse(REFERENCE_MANIFEST).unwrap();
        let resolved = manifest.resolve("base", &full_env()).unwrap();

        let json = serde_json::to_value(&resolved).unwrap();
        assert_eq!(json["name"], "base");
        assert_eq!(json["context"], "./base/ubuntu");
        assert_eq!(json["network"], "bridge");
        assert_eq!(json["image"]["tag"], "0.1.0");
    }
}
