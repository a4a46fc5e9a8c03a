//! # Content Packs
//!
//! Every origin module owns exactly one [`ContentPack`] listing the prefabs it
//! has made network-spawnable. Packs are created on first use. When several
//! threads race to create the pack for the same module, they all end up with
//! the same instance.

use crate::call_site::ModuleId;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::object::ObjectHandle;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Per-module collection of network-spawnable prefabs.
#[derive(Debug)]
pub struct ContentPack {
    module: ModuleId,
    networked_object_prefabs: RwLock<Vec<ObjectHandle>>,
}

impl ContentPack {
    fn new(module: ModuleId) -> Self {
        Self {
            module,
            networked_object_prefabs: RwLock::new(Vec::new()),
        }
    }

    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    /// Snapshot of the spawnable prefabs in insertion order.
    pub fn networked_object_prefabs(&self) -> Vec<ObjectHandle> {
        self.networked_object_prefabs.read().clone()
    }

    pub fn contains(&self, object: &ObjectHandle) -> bool {
        self.networked_object_prefabs.read().contains(object)
    }

    pub fn len(&self) -> usize {
        self.networked_object_prefabs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, object: ObjectHandle) {
        self.networked_object_prefabs.write().push(object);
    }
}

/// Result of a [`ContentPackBinder::bind`] call.
#[derive(Debug, Clone)]
pub enum BindOutcome {
    /// The object was appended to this pack.
    Bound(Arc<ContentPack>),
    /// The object cannot be spawned over the network and was left alone.
    Skipped,
}

#[derive(Debug, Default)]
pub struct ContentPackBinder {
    packs: DashMap<ModuleId, Arc<ContentPack>>,
    packs_created: AtomicUsize,
}

impl ContentPackBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pack for `module`, creating it if this is the first request.
    pub fn get_or_create(&self, module: &ModuleId) -> Arc<ContentPack> {
        if let Some(pack) = self.packs.get(module) {
            return pack.clone();
        }

        // Re-checked under the shard write lock, so only one racer inserts.
        self.packs
            .entry(module.clone())
            .or_insert_with(|| {
                self.packs_created.fetch_add(1, Ordering::Relaxed);
                info!("📦 Created content pack for module {}", module);
                Arc::new(ContentPack::new(module.clone()))
            })
            .clone()
    }

    /// Appends `object` to the spawn list of `module`'s pack.
    ///
    /// Objects without a network identity are reported to `diagnostics` and
    /// skipped. No pack is created or modified for them.
    pub fn bind(
        &self,
        object: &ObjectHandle,
        module: &ModuleId,
        diagnostics: &dyn DiagnosticSink,
    ) -> BindOutcome {
        if !object.has_network_identity() {
            diagnostics.report(Diagnostic::error(
                object,
                "doesn't have a NetworkIdentity component; can't register",
            ));
            return BindOutcome::Skipped;
        }

        BindOutcome::Bound(self.attach(object, module))
    }

    /// Appends an object whose network identity has already been checked.
    pub(crate) fn attach(&self, object: &ObjectHandle, module: &ModuleId) -> Arc<ContentPack> {
        let pack = self.get_or_create(module);
        pack.push(object.clone());
        debug!("🔗 Bound {} to content pack {} ({} prefabs)", object, module, pack.len());
        pack
    }

    pub fn pack(&self, module: &ModuleId) -> Option<Arc<ContentPack>> {
        self.packs.get(module).map(|pack| pack.clone())
    }

    /// All packs, ordered by module.
    pub fn packs(&self) -> Vec<Arc<ContentPack>> {
        let mut packs: Vec<_> = self.packs.iter().map(|entry| entry.value().clone()).collect();
        packs.sort_by(|a, b| a.module.cmp(&b.module));
        packs
    }

    /// Number of packs created since construction.
    pub fn packs_created(&self) -> usize {
        self.packs_created.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{CollectingSink, Severity};
    use crate::object::SceneObject;
    use rayon::prelude::*;

    fn networked(name: &str) -> ObjectHandle {
        ObjectHandle::new(SceneObject::new(name).with_network_identity())
    }

    #[test]
    fn test_same_module_same_pack() {
        let binder = ContentPackBinder::new();
        let sink = CollectingSink::new();
        let module = ModuleId::new("cool_mod");

        let first = match binder.bind(&networked("A"), &module, &sink) {
            BindOutcome::Bound(pack) => pack,
            BindOutcome::Skipped => panic!("networked object should bind"),
        };
        let second = match binder.bind(&networked("B"), &module, &sink) {
            BindOutcome::Bound(pack) => pack,
            BindOutcome::Skipped => panic!("networked object should bind"),
        };

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 2);
        assert_eq!(binder.packs_created(), 1);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_different_modules_get_different_packs() {
        let binder = ContentPackBinder::new();
        let a = binder.get_or_create(&ModuleId::new("mod_a"));
        let b = binder.get_or_create(&ModuleId::new("mod_b"));
        assert!(!Arc::ptr_eq(&a, &b));
        let modules: Vec<_> = binder.packs().iter().map(|p| p.module().to_string()).collect();
        assert_eq!(modules, ["mod_a", "mod_b"]);
    }

    #[test]
    fn test_missing_capability_is_skipped_and_reported_once() {
        let binder = ContentPackBinder::new();
        let sink = CollectingSink::new();
        let module = ModuleId::new("cool_mod");
        let decoration = ObjectHandle::new(SceneObject::new("Decoration"));

        let outcome = binder.bind(&decoration, &module, &sink);

        assert!(matches!(outcome, BindOutcome::Skipped));
        assert!(binder.pack(&module).is_none());
        assert_eq!(binder.packs_created(), 0);

        let diagnostics = sink.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Error);
        assert_eq!(diagnostics[0].object_id, Some(decoration.id()));
        assert_eq!(diagnostics[0].object_name, "Decoration");
    }

    #[test]
    fn test_missing_capability_leaves_existing_pack_untouched() {
        let binder = ContentPackBinder::new();
        let sink = CollectingSink::new();
        let module = ModuleId::new("cool_mod");
        binder.bind(&networked("Real"), &module, &sink);

        binder.bind(&ObjectHandle::new(SceneObject::new("Fake")), &module, &sink);

        assert_eq!(binder.pack(&module).unwrap().len(), 1);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_concurrent_first_binds_create_one_pack() {
        const N: usize = 256;
        let binder = ContentPackBinder::new();
        let sink = CollectingSink::new();
        let module = ModuleId::new("racing_mod");
        let objects: Vec<_> = (0..N).map(|i| networked(&format!("Racer{i}"))).collect();

        let packs: Vec<_> = objects
            .par_iter()
            .map(|object| match binder.bind(object, &module, &sink) {
                BindOutcome::Bound(pack) => pack,
                BindOutcome::Skipped => panic!("networked object should bind"),
            })
            .collect();

        assert_eq!(binder.packs_created(), 1);
        assert!(packs.iter().all(|pack| Arc::ptr_eq(pack, &packs[0])));
        let pack = binder.pack(&module).unwrap();
        assert_eq!(pack.len(), N);
        assert!(objects.iter().all(|object| pack.contains(object)));
    }
}
