//! # Prefab Host - Main Entry Point
//!
//! Command-line host for the prefab registry. It computes identity tokens and
//! replays manifests of clone requests, which is useful for checking that a
//! mod's prefabs get the tokens its peers expect.
//!
//! ## Quick Start
//!
//! ```bash
//! # Token for a clone named "Mob" created by Mods.Foo.SpawnerType::SpawnMob
//! prefab_host hash --name Mob --type Mods.Foo.SpawnerType --method SpawnMob
//!
//! # Clone and register everything listed in a manifest
//! prefab_host apply mods.toml
//!
//! # Custom configuration and JSON logging
//! prefab_host --config production.toml --json-logs apply mods.toml
//! ```
//!
//! ## Configuration
//!
//! The host loads configuration from a TOML file (default: `prefab_host.toml`).
//! If the file doesn't exist, a default configuration will be created.

use tracing::error;

mod app;
mod cli;
mod config;
mod logging;
mod manifest;

pub use app::{apply_manifest, hash, Application, ApplySummary, CloneReport, CloneStatus, HashReport, PackReport};
pub use cli::{CliArgs, HostCommand};
pub use config::{AppConfig, LoggingSettings};
pub use manifest::{CloneRequest, Manifest, TemplateEntry};

/// Main entry point for the prefab host.
///
/// Parses arguments, loads configuration, sets up logging and runs the
/// requested command. Exits with status 1 on failure.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let mut config = match AppConfig::load_from_file(&args.config_path).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration from {}: {e}", args.config_path.display());
            std::process::exit(1);
        }
    };
    config.apply_cli_overrides(&args);

    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args, config) {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {e}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}
