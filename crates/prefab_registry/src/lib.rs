//! # Prefab Registry
//!
//! Runtime prefab cloning and deterministic network-identity registration for
//! modded content.
//!
//! Mods build new network-spawnable prefabs at runtime by cloning existing
//! objects. The network layer only accepts objects it can identify, so every
//! registered clone gets an [`IdentityToken`] derived from its name and the
//! call site that created it. Client and server run the same mod code, so they
//! compute the same token independently and agree on the prefab without any
//! negotiation.
//!
//! ## Quick Start
//!
//! ```rust
//! use prefab_registry::{call_site, ObjectHandle, PrefabRegistry, RegistryConfig, SceneObject};
//!
//! # fn main() -> Result<(), prefab_registry::PrefabError> {
//! let registry = PrefabRegistry::new(RegistryConfig::default())?;
//! let template = ObjectHandle::new(SceneObject::new("Beetle").with_network_identity());
//!
//! let elite = registry.instantiate_clone(&template, "EliteBeetle", &call_site!()?)?;
//!
//! assert!(!elite.is_active());
//! assert!(registry.is_prefab_hashed(&elite));
//! assert!(elite.asset_id().is_some());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`object`] - the scene object model and identity-compared handles
//! - [`identity`] - identity token derivation
//! - [`call_site`] - origin tokens and stack-based call site resolution
//! - [`cloner`] - inert cloning and prefab classification
//! - [`ledger`] - the registration ledger
//! - [`content_pack`] - per-module content packs
//! - [`diagnostics`] - the diagnostic channel
//! - [`registry`] - the [`PrefabRegistry`] façade

pub mod call_site;
pub mod cloner;
pub mod config;
pub mod content_pack;
pub mod diagnostics;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod object;
pub mod registry;

#[cfg(test)]
mod tests;

pub use call_site::{CallSite, CallSiteResolver, ModuleId};
pub use cloner::{BuildTimeClassifier, ObjectCloner, PrefabClassifier};
pub use config::{RegistryConfig, DEFAULT_CONTAINER_NAME};
pub use content_pack::{BindOutcome, ContentPack, ContentPackBinder};
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, Severity, TracingSink};
pub use error::{PrefabError, Result};
pub use identity::IdentityToken;
pub use ledger::{RegistrationLedger, RegistrationRecord};
pub use object::{Component, NetworkIdentity, ObjectHandle, ObjectId, SceneObject, WeakObjectHandle};
pub use registry::{PrefabRegistry, RegistrationOutcome, RegistryStats};
