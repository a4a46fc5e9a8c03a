//! # Scene Object Model
//!
//! A minimal model of the host runtime's object graph: named objects with an
//! activation flag, optional components and a parent/child hierarchy.
//!
//! Parents own their children through strong handles while children only keep
//! a weak link back to their parent, so a hierarchy is released from the root.
//! [`ObjectHandle`] equality is reference identity: two handles are equal only
//! if they point at the same object, never because two objects look alike.

use crate::identity::IdentityToken;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// Unique identifier for a scene object, assigned at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub Uuid);

impl ObjectId {
    /// Creates a new random object ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Network identity capability.
///
/// Only objects carrying this component can be spawned over the network. The
/// asset id is the opaque 128-bit value peers use to agree on which prefab an
/// instance was spawned from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkIdentity {
    asset_id: Option<IdentityToken>,
}

impl NetworkIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asset_id(&self) -> Option<IdentityToken> {
        self.asset_id
    }

    pub fn set_asset_id(&mut self, token: IdentityToken) {
        self.asset_id = Some(token);
    }
}

/// Opaque component data attached to an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub type_name: String,
    pub data: serde_json::Value,
}

impl Component {
    pub fn new(type_name: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            type_name: type_name.into(),
            data,
        }
    }
}

/// State of a single object in the scene graph.
#[derive(Debug)]
pub struct SceneObject {
    /// Display name of the object
    pub name: String,
    /// Local activation state
    pub active: bool,
    /// Whether the object survives scene transitions
    pub persistent: bool,
    /// Whether the object shipped as build-time content
    pub build_time_prefab: bool,
    /// Network identity capability, if present
    pub network_identity: Option<NetworkIdentity>,
    /// Any other components
    pub components: Vec<Component>,
    children: Vec<ObjectHandle>,
    parent: Option<WeakObjectHandle>,
}

impl SceneObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
            persistent: false,
            build_time_prefab: false,
            network_identity: None,
            components: Vec::new(),
            children: Vec::new(),
            parent: None,
        }
    }

    pub fn with_network_identity(mut self) -> Self {
        self.network_identity = Some(NetworkIdentity::new());
        self
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    /// Marks the object as content that shipped with the game build.
    pub fn as_build_time_prefab(mut self) -> Self {
        self.build_time_prefab = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Shared handle to a scene object.
#[derive(Clone)]
pub struct ObjectHandle {
    id: ObjectId,
    inner: Arc<RwLock<SceneObject>>,
}

impl ObjectHandle {
    pub fn new(object: SceneObject) -> Self {
        Self {
            id: ObjectId::new(),
            inner: Arc::new(RwLock::new(object)),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn read(&self) -> RwLockReadGuard<'_, SceneObject> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, SceneObject> {
        self.inner.write()
    }

    pub fn name(&self) -> String {
        self.read().name.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.write().name = name.into();
    }

    /// Local activation state, ignoring ancestors.
    pub fn is_active(&self) -> bool {
        self.read().active
    }

    pub fn set_active(&self, active: bool) {
        self.write().active = active;
    }

    /// True only if this object and every ancestor are active.
    pub fn is_active_in_hierarchy(&self) -> bool {
        if !self.is_active() {
            return false;
        }
        match self.parent() {
            Some(parent) => parent.is_active_in_hierarchy(),
            None => true,
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.read().persistent
    }

    /// Keeps the object alive across scene transitions.
    pub fn mark_persistent(&self) {
        self.write().persistent = true;
    }

    pub fn is_build_time_prefab(&self) -> bool {
        self.read().build_time_prefab
    }

    pub fn has_network_identity(&self) -> bool {
        self.read().network_identity.is_some()
    }

    pub fn asset_id(&self) -> Option<IdentityToken> {
        self.read()
            .network_identity
            .as_ref()
            .and_then(NetworkIdentity::asset_id)
    }

    /// Writes the asset id into the network identity component.
    ///
    /// Returns `false` without touching the object if it has no such component.
    pub fn set_asset_id(&self, token: IdentityToken) -> bool {
        match self.write().network_identity.as_mut() {
            Some(identity) => {
                identity.set_asset_id(token);
                true
            }
            None => false,
        }
    }

    pub fn parent(&self) -> Option<ObjectHandle> {
        self.read().parent.as_ref().and_then(WeakObjectHandle::upgrade)
    }

    pub fn children(&self) -> Vec<ObjectHandle> {
        self.read().children.clone()
    }

    /// Moves this object under `parent`.
    ///
    /// Returns `false` if the move would create a cycle.
    pub fn set_parent(&self, parent: &ObjectHandle) -> bool {
        if parent == self || parent.is_descendant_of(self) {
            return false;
        }
        self.detach();
        parent.write().children.push(self.clone());
        self.write().parent = Some(parent.downgrade());
        true
    }

    /// Removes this object from its parent, if any.
    pub fn detach(&self) {
        let old_parent = self.write().parent.take();
        if let Some(old_parent) = old_parent.and_then(|weak| weak.upgrade()) {
            old_parent.write().children.retain(|child| child != self);
        }
    }

    pub fn is_descendant_of(&self, ancestor: &ObjectHandle) -> bool {
        let mut current = self.parent();
        while let Some(node) = current {
            if node == *ancestor {
                return true;
            }
            current = node.parent();
        }
        false
    }

    pub fn downgrade(&self) -> WeakObjectHandle {
        WeakObjectHandle {
            id: self.id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Deep-copies this object and its children into a new, detached hierarchy.
    ///
    /// Every copied object gets a fresh id. Components, including the network
    /// identity and its current asset id, are copied as-is. Persistence and the
    /// build-time flag describe the original, not the copy, so they are reset.
    pub fn instantiate(&self) -> ObjectHandle {
        let (copy, children) = {
            let source = self.read();
            let copy = SceneObject {
                name: source.name.clone(),
                active: source.active,
                persistent: false,
                build_time_prefab: false,
                network_identity: source.network_identity.clone(),
                components: source.components.clone(),
                children: Vec::new(),
                parent: None,
            };
            (copy, source.children.clone())
        };

        let handle = ObjectHandle::new(copy);
        for child in children {
            child.instantiate().set_parent(&handle);
        }
        handle
    }
}

impl PartialEq for ObjectHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ObjectHandle {}

impl std::hash::Hash for ObjectHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("ObjectHandle");
        debug.field("id", &self.id);
        // Skip the name rather than block if a writer holds the lock
        if let Some(object) = self.inner.try_read() {
            debug.field("name", &object.name);
        }
        debug.finish()
    }
}

impl std::fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_read() {
            Some(object) => write!(f, "{} ({})", object.name, self.id),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Non-owning handle to a scene object.
#[derive(Clone)]
pub struct WeakObjectHandle {
    id: ObjectId,
    inner: Weak<RwLock<SceneObject>>,
}

impl WeakObjectHandle {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn upgrade(&self) -> Option<ObjectHandle> {
        self.inner.upgrade().map(|inner| ObjectHandle { id: self.id, inner })
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl std::fmt::Debug for WeakObjectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakObjectHandle")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}
