//! # Object Cloner
//!
//! Duplicates templates into a single shared container that is persistent and
//! deactivated. Clones "sleep" there: they are inactive until the caller
//! activates or spawns them.
//!
//! The host's own prefab detection only knows about build-time content. Rather
//! than patching it, the host asks a [`PrefabClassifier`], and the registry's
//! classifier treats anything parented directly under the shared container as
//! a prefab.

use crate::error::{PrefabError, Result};
use crate::object::{ObjectHandle, SceneObject};
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Predicate the host queries to decide whether an object is a prefab.
pub trait PrefabClassifier: Send + Sync {
    fn is_prefab(&self, object: &ObjectHandle) -> bool;
}

/// The host's default rule: only content that shipped with the build is a prefab.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuildTimeClassifier;

impl PrefabClassifier for BuildTimeClassifier {
    fn is_prefab(&self, object: &ObjectHandle) -> bool {
        object.is_build_time_prefab()
    }
}

#[derive(Debug)]
pub struct ObjectCloner {
    container_name: String,
    container: OnceCell<ObjectHandle>,
    clones_created: AtomicU64,
}

impl ObjectCloner {
    pub fn new(container_name: impl Into<String>) -> Self {
        Self {
            container_name: container_name.into(),
            container: OnceCell::new(),
            clones_created: AtomicU64::new(0),
        }
    }

    /// The shared container, created on first use.
    pub fn container(&self) -> &ObjectHandle {
        self.container.get_or_init(|| {
            let container = ObjectHandle::new(SceneObject::new(self.container_name.clone()).inactive());
            container.mark_persistent();
            info!("🗃️ Created shared prefab container '{}'", self.container_name);
            container
        })
    }

    /// The shared container if it has been created yet.
    pub fn existing_container(&self) -> Option<&ObjectHandle> {
        self.container.get()
    }

    /// Deep-copies `template` under the shared container and names it `display_name`.
    ///
    /// The clone is inactive whatever the template's state. The template is not
    /// modified.
    pub fn instantiate_clone(&self, template: &ObjectHandle, display_name: &str) -> Result<ObjectHandle> {
        if display_name.trim().is_empty() {
            return Err(PrefabError::InvalidDisplayName(display_name.to_string()));
        }
        if self.existing_container() == Some(template) {
            return Err(PrefabError::InvalidTemplate(format!(
                "the shared container '{}' cannot be cloned",
                self.container_name
            )));
        }

        let clone = template.instantiate();
        clone.set_name(display_name);
        clone.set_active(false);
        clone.set_parent(self.container());

        self.clones_created.fetch_add(1, Ordering::Relaxed);
        debug!("🧬 Cloned {} as '{}' ({})", template, display_name, clone.id());
        Ok(clone)
    }

    /// True if `object` sits directly under the shared container.
    pub fn is_modded_prefab(&self, object: &ObjectHandle) -> bool {
        match (self.existing_container(), object.parent()) {
            (Some(container), Some(parent)) => parent == *container,
            _ => false,
        }
    }

    pub fn clones_created(&self) -> u64 {
        self.clones_created.load(Ordering::Relaxed)
    }
}
