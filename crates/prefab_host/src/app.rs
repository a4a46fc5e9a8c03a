//! Main application logic.
//!
//! `Application` validates the loaded configuration, builds a
//! [`PrefabRegistry`] from it and runs the requested command. Results are
//! printed to stdout as JSON.

use crate::cli::{CliArgs, HostCommand};
use crate::config::AppConfig;
use crate::logging::display_banner;
use crate::manifest::Manifest;
use prefab_registry::{
    CollectingSink, IdentityToken, ObjectHandle, PrefabRegistry, RegistryStats,
};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of the `hash` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashReport {
    pub name: String,
    #[serde(rename = "type")]
    pub type_qualifier: String,
    pub method: String,
    pub token: IdentityToken,
}

/// What happened to a single clone request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneStatus {
    Registered,
    Local,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct CloneReport {
    pub name: String,
    pub template: String,
    pub object_id: String,
    pub module: String,
    pub status: CloneStatus,
    pub token: Option<IdentityToken>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackReport {
    pub module: String,
    pub networked_object_prefabs: Vec<String>,
}

/// Result of the `apply` command.
#[derive(Debug, Clone, Serialize)]
pub struct ApplySummary {
    pub clones: Vec<CloneReport>,
    pub content_packs: Vec<PackReport>,
    pub diagnostics: Vec<String>,
    pub stats: RegistryStats,
}

pub struct Application {
    config: AppConfig,
    config_path: PathBuf,
    command: HostCommand,
}

impl Application {
    /// Validates `config`, which already carries the CLI overrides.
    pub fn new(args: CliArgs, config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        } else {
            info!("✅ Configuration loaded and validated successfully");
        }

        Ok(Self {
            config,
            config_path: args.config_path,
            command: args.command,
        })
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        display_banner();
        self.log_configuration_summary();

        let output = match &self.command {
            HostCommand::Hash {
                name,
                type_qualifier,
                method,
            } => serde_json::to_string_pretty(&hash(name, type_qualifier, method))?,
            HostCommand::Apply { manifest } => {
                info!("📜 Loading manifest from: {}", manifest.display());
                let manifest = Manifest::load(manifest).await?;
                let summary = apply_manifest(&self.config, &manifest)?;
                serde_json::to_string_pretty(&summary)?
            }
        };

        println!("{output}");
        Ok(())
    }

    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  📂 Config file: {}", self.config_path.display());
        info!("  🗃️ Container: {}", self.config.registry.container_name);
        info!(
            "  🌐 Register by default: {}",
            self.config.registry.register_network_by_default
        );
    }
}

pub fn hash(name: &str, type_qualifier: &str, method: &str) -> HashReport {
    HashReport {
        name: name.to_string(),
        type_qualifier: type_qualifier.to_string(),
        method: method.to_string(),
        token: IdentityToken::derive(name, type_qualifier, method),
    }
}

/// Replays `manifest` through a fresh registry built from `config`.
pub fn apply_manifest(
    config: &AppConfig,
    manifest: &Manifest,
) -> Result<ApplySummary, Box<dyn std::error::Error>> {
    manifest.validate()?;

    let sink = Arc::new(CollectingSink::new());
    let registry = PrefabRegistry::new(config.to_registry_config())?.with_diagnostics(sink.clone());

    let mut objects: HashMap<String, ObjectHandle> = manifest
        .templates
        .iter()
        .map(|template| (template.name.clone(), template.build()))
        .collect();

    let mut clones = Vec::with_capacity(manifest.clones.len());
    for request in &manifest.clones {
        let template = objects
            .get(&request.template)
            .ok_or_else(|| format!("Unknown template: {}", request.template))?
            .clone();
        let register = request
            .register
            .unwrap_or(config.registry.register_network_by_default);

        let clone = registry.clone_and_register(&template, &request.name, register, &request.call_site()?)?;

        let status = if !register {
            CloneStatus::Local
        } else if registry.is_prefab_hashed(&clone) {
            CloneStatus::Registered
        } else {
            warn!("⚠️ Clone '{}' was created but not registered", request.name);
            CloneStatus::Skipped
        };

        clones.push(CloneReport {
            name: request.name.clone(),
            template: request.template.clone(),
            object_id: clone.id().to_string(),
            module: request.module.clone(),
            status,
            token: clone.asset_id(),
        });
        objects.insert(request.name.clone(), clone);
    }

    let content_packs = registry
        .content_packs()
        .iter()
        .map(|pack| PackReport {
            module: pack.module().to_string(),
            networked_object_prefabs: pack.networked_object_prefabs().iter().map(|o| o.name()).collect(),
        })
        .collect();

    let stats = registry.stats();
    info!(
        "📊 Applied manifest: {} clones, {} registered, {} skipped, {} content packs",
        stats.clones_created, stats.prefabs_registered, stats.registrations_skipped, stats.content_packs
    );

    Ok(ApplySummary {
        clones,
        content_packs,
        diagnostics: sink.drain().iter().map(ToString::to_string).collect(),
        stats,
    })
}
