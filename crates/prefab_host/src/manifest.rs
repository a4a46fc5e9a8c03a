//! Manifest of templates and clone requests replayed by `prefab_host apply`.
//!
//! ```toml
//! [[templates]]
//! name = "Lemurian"
//! network_identity = true
//! children = ["Mesh", "Hitbox"]
//!
//! [[clones]]
//! template = "Lemurian"
//! name = "EliteLemurian"
//! module = "elite_mod"
//! type = "EliteMod.Spawner"
//! method = "Awake"
//! ```

use prefab_registry::{CallSite, ObjectHandle, SceneObject};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub templates: Vec<TemplateEntry>,
    #[serde(default)]
    pub clones: Vec<CloneRequest>,
}

/// A build-time object that clone requests can use as their template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateEntry {
    pub name: String,
    #[serde(default)]
    pub network_identity: bool,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Names of child objects, created without components
    #[serde(default)]
    pub children: Vec<String>,
}

/// One call to the registry, attributed to a mod's type and method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneRequest {
    /// A template name, or the name of an earlier clone
    pub template: String,
    pub name: String,
    pub module: String,
    #[serde(rename = "type")]
    pub type_qualifier: String,
    pub method: String,
    /// Falls back to the registry's `register_network_by_default`
    #[serde(default)]
    pub register: Option<bool>,
}

impl Manifest {
    pub async fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let manifest: Manifest = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Checks that names are unique and every clone refers to something defined before it.
    pub fn validate(&self) -> Result<(), String> {
        let mut known: Vec<&str> = Vec::new();
        for template in &self.templates {
            if known.contains(&template.name.as_str()) {
                return Err(format!("Duplicate template name: {}", template.name));
            }
            known.push(&template.name);
        }
        for clone in &self.clones {
            if !known.contains(&clone.template.as_str()) {
                return Err(format!(
                    "Clone '{}' refers to unknown template '{}'",
                    clone.name, clone.template
                ));
            }
            if known.contains(&clone.name.as_str()) {
                return Err(format!("Duplicate object name: {}", clone.name));
            }
            known.push(&clone.name);
        }
        Ok(())
    }
}

impl TemplateEntry {
    /// Builds the template as build-time content.
    pub fn build(&self) -> ObjectHandle {
        let mut object = SceneObject::new(self.name.as_str()).as_build_time_prefab();
        if self.network_identity {
            object = object.with_network_identity();
        }
        if !self.active {
            object = object.inactive();
        }

        let handle = ObjectHandle::new(object);
        for child in &self.children {
            ObjectHandle::new(SceneObject::new(child.as_str())).set_parent(&handle);
        }
        handle
    }
}

impl CloneRequest {
    pub fn call_site(&self) -> prefab_registry::Result<CallSite> {
        CallSite::new(self.module.as_str(), self.type_qualifier.as_str(), self.method.as_str())
    }
}
