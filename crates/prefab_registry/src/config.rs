//! Registry configuration.

use crate::error::{PrefabError, Result};
use serde::{Deserialize, Serialize};

/// Name of the shared container that holds every cloned prefab.
pub const DEFAULT_CONTAINER_NAME: &str = "ModdedPrefabs";

fn default_container_name() -> String {
    DEFAULT_CONTAINER_NAME.to_string()
}

fn default_register_network() -> bool {
    true
}

/// Settings for a [`PrefabRegistry`](crate::PrefabRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Name given to the shared, inactive container clones are parented under
    #[serde(default = "default_container_name")]
    pub container_name: String,
    /// Whether `instantiate_clone` registers clones for network spawning
    #[serde(default = "default_register_network")]
    pub register_network_by_default: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            container_name: default_container_name(),
            register_network_by_default: default_register_network(),
        }
    }
}

impl RegistryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.container_name.trim().is_empty() {
            return Err(PrefabError::Config("container_name cannot be empty".to_string()));
        }
        Ok(())
    }
}
