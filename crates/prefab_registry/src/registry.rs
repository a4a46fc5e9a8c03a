//! # Prefab Registry
//!
//! [`PrefabRegistry`] is the entry point mods use to create runtime prefabs. It
//! ties the pipeline together:
//!
//! 1. [`ObjectCloner`] produces an inert duplicate under the shared container
//! 2. the caller's [`CallSite`] names the code that asked for it
//! 3. [`IdentityToken::derive`] turns (name, type, method) into a stable token
//! 4. the token is written into the clone's network identity
//! 5. [`RegistrationLedger`] records the registration
//! 6. [`ContentPackBinder`] appends the clone to its module's content pack
//!
//! The registry is an ordinary value built by the host during startup, so
//! several isolated registries can coexist (in tests, for instance). All
//! operations are synchronous and safe to call from multiple threads.

use crate::call_site::{CallSite, CallSiteResolver, ModuleId};
use crate::cloner::{BuildTimeClassifier, ObjectCloner, PrefabClassifier};
use crate::config::RegistryConfig;
use crate::content_pack::{ContentPack, ContentPackBinder};
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::error::{PrefabError, Result};
use crate::identity::IdentityToken;
use crate::ledger::RegistrationLedger;
use crate::object::ObjectHandle;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// What happened to a network registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The object received `token` and was added to `module`'s content pack.
    Bound { token: IdentityToken, module: ModuleId },
    /// The object was registered earlier. Nothing changed.
    AlreadyRegistered { token: IdentityToken },
    /// The object has no network identity. A diagnostic was reported.
    Skipped,
}

/// Counters describing registry activity.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub clones_created: u64,
    pub prefabs_registered: u64,
    pub registrations_skipped: u64,
    pub duplicate_requests: u64,
    pub content_packs: usize,
}

pub struct PrefabRegistry {
    config: RegistryConfig,
    cloner: ObjectCloner,
    ledger: RegistrationLedger,
    binder: ContentPackBinder,
    diagnostics: Arc<dyn DiagnosticSink>,
    fallback_classifier: Arc<dyn PrefabClassifier>,
    registrations_skipped: AtomicU64,
    duplicate_requests: AtomicU64,
}

impl std::fmt::Debug for PrefabRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefabRegistry")
            .field("config", &self.config)
            .field("registered", &self.ledger.len())
            .field("content_packs", &self.binder.packs_created())
            .finish()
    }
}

impl PrefabRegistry {
    /// Creates a registry that reports diagnostics through `tracing` and falls
    /// back to [`BuildTimeClassifier`] for objects it did not clone.
    pub fn new(config: RegistryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            cloner: ObjectCloner::new(config.container_name.clone()),
            config,
            ledger: RegistrationLedger::new(),
            binder: ContentPackBinder::new(),
            diagnostics: Arc::new(TracingSink),
            fallback_classifier: Arc::new(BuildTimeClassifier),
            registrations_skipped: AtomicU64::new(0),
            duplicate_requests: AtomicU64::new(0),
        })
    }

    /// Replaces the diagnostic channel.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Replaces the classifier consulted for objects outside the shared container.
    pub fn with_fallback_classifier(mut self, classifier: Arc<dyn PrefabClassifier>) -> Self {
        self.fallback_classifier = classifier;
        self
    }

    /// Clones `template` and, if the config says so, registers the clone for
    /// network spawning.
    pub fn instantiate_clone(
        &self,
        template: &ObjectHandle,
        display_name: &str,
        call_site: &CallSite,
    ) -> Result<ObjectHandle> {
        self.clone_and_register(
            template,
            display_name,
            self.config.register_network_by_default,
            call_site,
        )
    }

    /// Clones `template` as `display_name`, optionally registering the clone.
    ///
    /// Invalid templates or names fail the call. A template without a network
    /// identity still yields a clone. The failed registration is reported as a
    /// diagnostic.
    pub fn clone_and_register(
        &self,
        template: &ObjectHandle,
        display_name: &str,
        register_network: bool,
        call_site: &CallSite,
    ) -> Result<ObjectHandle> {
        let clone = self.cloner.instantiate_clone(template, display_name)?;
        if register_network {
            self.register_network_prefab(&clone, call_site)?;
        }
        Ok(clone)
    }

    /// Gives `object` a deterministic network identity and adds it to the
    /// content pack of the call site's module.
    ///
    /// Registering the same object twice is a no-op that returns the token it
    /// already has.
    pub fn register_network_prefab(
        &self,
        object: &ObjectHandle,
        call_site: &CallSite,
    ) -> Result<RegistrationOutcome> {
        if let Some(existing) = self.ledger.record(object) {
            self.duplicate_requests.fetch_add(1, Ordering::Relaxed);
            warn!(
                "⚠️ {} is already registered as {} by {}::{}; ignoring request from {}",
                object, existing.token, existing.type_qualifier, existing.method_name, call_site
            );
            return Ok(RegistrationOutcome::AlreadyRegistered { token: existing.token });
        }

        if !object.has_network_identity() {
            return Ok(self.skip_unidentified(object));
        }

        let display_name = object.name();
        let token = IdentityToken::derive(&display_name, call_site.type_qualifier(), call_site.method_name());

        match self.ledger.register(object, &display_name, call_site, token) {
            Ok(()) => {}
            // Lost a race with a concurrent registration of the same object
            Err(PrefabError::AlreadyRegistered(_)) => {
                self.duplicate_requests.fetch_add(1, Ordering::Relaxed);
                let token = self.ledger.record(object).map_or(token, |record| record.token);
                return Ok(RegistrationOutcome::AlreadyRegistered { token });
            }
            Err(e) => return Err(e),
        }

        // Checks for the component and writes under one lock. A failed write
        // releases the claim so the object can be registered again later.
        if !object.set_asset_id(token) {
            self.ledger.release(object);
            return Ok(self.skip_unidentified(object));
        }

        let pack = self.binder.attach(object, call_site.module());
        info!("🌐 Registered network prefab '{}' as {} in {}", display_name, token, pack.module());
        Ok(RegistrationOutcome::Bound {
            token,
            module: pack.module().clone(),
        })
    }

    fn skip_unidentified(&self, object: &ObjectHandle) -> RegistrationOutcome {
        self.registrations_skipped.fetch_add(1, Ordering::Relaxed);
        self.diagnostics.report(Diagnostic::error(
            object,
            "doesn't have a NetworkIdentity component; can't register",
        ));
        RegistrationOutcome::Skipped
    }

    /// Like [`register_network_prefab`](Self::register_network_prefab), but
    /// takes the call site from the stack instead of from the caller.
    ///
    /// Fails with [`PrefabError::CallSiteUnresolved`] if the calling frame has
    /// no usable symbol, for example in stripped builds.
    #[inline(never)]
    pub fn register_network_prefab_at_caller(&self, object: &ObjectHandle) -> Result<RegistrationOutcome> {
        let call_site = CallSiteResolver::resolve(0)?;
        self.register_network_prefab(object, &call_site)
    }

    /// Whether `object` has been given a network identity by this registry.
    pub fn is_prefab_hashed(&self, object: &ObjectHandle) -> bool {
        self.ledger.is_registered(object)
    }

    pub fn content_pack(&self, module: &ModuleId) -> Option<Arc<ContentPack>> {
        self.binder.pack(module)
    }

    pub fn content_packs(&self) -> Vec<Arc<ContentPack>> {
        self.binder.packs()
    }

    pub fn ledger(&self) -> &RegistrationLedger {
        &self.ledger
    }

    pub fn cloner(&self) -> &ObjectCloner {
        &self.cloner
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            clones_created: self.cloner.clones_created(),
            prefabs_registered: self.ledger.len() as u64,
            registrations_skipped: self.registrations_skipped.load(Ordering::Relaxed),
            duplicate_requests: self.duplicate_requests.load(Ordering::Relaxed),
            content_packs: self.binder.packs_created(),
        }
    }
}

impl PrefabClassifier for PrefabRegistry {
    fn is_prefab(&self, object: &ObjectHandle) -> bool {
        self.cloner.is_modded_prefab(object) || self.fallback_classifier.is_prefab(object)
    }
}
