//! CLI command implementations.

use anyhow::{Context, Result};
use bakery_config::{Environment, Manifest};
use bakery_core::builder::{BuildSpec, ImageBuilder};
use bakery_core::ResolvedBuildService;
use bakery_executor::DockerBuilder;
use std::path::Path;
use tracing::info;

fn load_manifest(path: &Path) -> Result<Manifest> {
    Manifest::from_file(path)
        .with_context(|| format!("failed to load manifest '{}'", path.display()))
}

pub fn validate(path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest '{}'", path.display()))?;
    match Manifest::parse(&content) {
        Ok(manifest) => {
            println!(
                "Configuration is valid ({} services)",
                manifest.services.len()
            );
            Ok(())
        }
        Err(e) => {
            println!("Configuration error: {}", e);
            std::process::exit(1);
        }
    }
}

pub fn list(path: &Path) -> Result<()> {
    let manifest = load_manifest(path)?;
    for service in &manifest.services {
        println!("{}\t{}", service.name, service.image);
    }
    Ok(())
}

pub fn resolve(path: &Path, service: Option<String>, json: bool) -> Result<()> {
    let manifest = load_manifest(path)?;
    let env = Environment::from_process();

    let resolved = match service {
        Some(name) => vec![manifest.resolve(&name, &env)?],
        None => manifest.resolve_all(&env)?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
    } else {
        for service in &resolved {
            print_resolved(service);
        }
    }
    Ok(())
}

fn print_resolved(service: &ResolvedBuildService) {
    println!("{}:", service.name);
    println!("  context: {}", service.context);
    println!("  network: {}", service.network);
    println!("  image:   {}", service.image);
    for (name, value) in &service.args {
        println!("  arg:     {}={}", name, value);
    }
}

pub async fn build(path: &Path, services: Vec<String>) -> Result<()> {
    let manifest = load_manifest(path)?;
    let env = Environment::from_process();

    // No dependency inference: explicit names build in the given order,
    // otherwise manifest order.
    let resolved = if services.is_empty() {
        manifest.resolve_all(&env)?
    } else {
        services
            .iter()
            .map(|name| manifest.resolve(name, &env))
            .collect::<std::result::Result<Vec<_>, _>>()?
    };

    let builder = DockerBuilder::new().context("failed to connect to the Docker daemon")?;

    info!(count = resolved.len(), "Starting builds");
    for service in resolved {
        let spec = BuildSpec::from(service);
        let outcome = builder.build(&spec).await?;
        println!("Built {}", outcome.image);
    }

    Ok(())
}
