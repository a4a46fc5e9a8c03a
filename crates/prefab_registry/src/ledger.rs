//! Registration ledger: the single source of truth for which objects have been
//! given a network identity.
//!
//! Records hold weak references, so the ledger never keeps an object alive on
//! its own. Entries are never removed. Objects are assumed to stay registered
//! for the rest of the session.

use crate::call_site::{CallSite, ModuleId};
use crate::error::{PrefabError, Result};
use crate::identity::IdentityToken;
use crate::object::{ObjectHandle, ObjectId, WeakObjectHandle};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// One registered object and the call site that registered it.
#[derive(Debug, Clone)]
pub struct RegistrationRecord {
    pub object: WeakObjectHandle,
    pub display_name: String,
    pub type_qualifier: String,
    pub method_name: String,
    pub module: ModuleId,
    pub token: IdentityToken,
    sequence: u64,
}

impl RegistrationRecord {
    pub fn object_id(&self) -> ObjectId {
        self.object.id()
    }

    /// Position of this record in registration order.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

#[derive(Debug, Default)]
pub struct RegistrationLedger {
    records: DashMap<ObjectId, RegistrationRecord>,
    next_sequence: AtomicU64,
}

impl RegistrationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `object` as registered from `call_site`.
    ///
    /// Fails with [`PrefabError::AlreadyRegistered`] if the object already has a
    /// record. The check and the insert are a single atomic step.
    pub fn register(
        &self,
        object: &ObjectHandle,
        display_name: &str,
        call_site: &CallSite,
        token: IdentityToken,
    ) -> Result<()> {
        match self.records.entry(object.id()) {
            Entry::Occupied(existing) => Err(PrefabError::AlreadyRegistered(format!(
                "{} is already registered as {}",
                object,
                existing.get().token
            ))),
            Entry::Vacant(slot) => {
                let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
                slot.insert(RegistrationRecord {
                    object: object.downgrade(),
                    display_name: display_name.to_string(),
                    type_qualifier: call_site.type_qualifier().to_string(),
                    method_name: call_site.method_name().to_string(),
                    module: call_site.module().clone(),
                    token,
                    sequence,
                });
                debug!("📒 Ledger entry #{} for {} ({})", sequence, display_name, token);
                Ok(())
            }
        }
    }

    /// Drops a claim whose registration could not be completed.
    pub(crate) fn release(&self, object: &ObjectHandle) -> Option<RegistrationRecord> {
        self.records.remove(&object.id()).map(|(_, record)| record)
    }

    pub fn is_registered(&self, object: &ObjectHandle) -> bool {
        self.records.contains_key(&object.id())
    }

    pub fn record(&self, object: &ObjectHandle) -> Option<RegistrationRecord> {
        self.records.get(&object.id()).map(|record| record.clone())
    }

    /// All records in registration order.
    pub fn records(&self) -> Vec<RegistrationRecord> {
        let mut records: Vec<_> = self.records.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by_key(RegistrationRecord::sequence);
        records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::SceneObject;

    fn site() -> CallSite {
        CallSite::new("cool_mod", "cool_mod::Spawner", "spawn").unwrap()
    }

    #[test]
    fn test_register_and_query() {
        let ledger = RegistrationLedger::new();
        let object = ObjectHandle::new(SceneObject::new("Mob"));
        let lookalike = ObjectHandle::new(SceneObject::new("Mob"));
        let token = IdentityToken::derive("Mob", "cool_mod::Spawner", "spawn");

        assert!(ledger.is_empty());
        ledger.register(&object, "Mob", &site(), token).unwrap();

        assert!(ledger.is_registered(&object));
        assert!(!ledger.is_registered(&lookalike));

        let record = ledger.record(&object).unwrap();
        assert_eq!(record.object_id(), object.id());
        assert_eq!(record.module.as_str(), "cool_mod");
        assert_eq!(record.method_name, "spawn");
        assert_eq!(record.token, token);
    }

    #[test]
    fn test_released_claim_can_be_registered_again() {
        let ledger = RegistrationLedger::new();
        let object = ObjectHandle::new(SceneObject::new("Mob"));
        let token = IdentityToken::derive("Mob", "cool_mod::Spawner", "spawn");

        ledger.register(&object, "Mob", &site(), token).unwrap();
        let released = ledger.release(&object).unwrap();
        assert_eq!(released.token, token);
        assert!(!ledger.is_registered(&object));
        assert!(ledger.release(&object).is_none());

        ledger.register(&object, "Mob", &site(), token).unwrap();
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_second_registration_is_rejected() {
        let ledger = RegistrationLedger::new();
        let object = ObjectHandle::new(SceneObject::new("Mob"));
        let token = IdentityToken::derive("Mob", "cool_mod::Spawner", "spawn");

        ledger.register(&object, "Mob", &site(), token).unwrap();
        let result = ledger.register(&object, "Mob", &site(), token);
        assert!(matches!(result, Err(PrefabError::AlreadyRegistered(_))));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_records_keep_registration_order() {
        let ledger = RegistrationLedger::new();
        let names = ["First", "Second", "Third", "Fourth"];
        let objects: Vec<_> = names
            .iter()
            .map(|name| ObjectHandle::new(SceneObject::new(*name)))
            .collect();

        for (object, name) in objects.iter().zip(names) {
            let token = IdentityToken::derive(name, "cool_mod::Spawner", "spawn");
            ledger.register(object, name, &site(), token).unwrap();
        }

        let recorded: Vec<_> = ledger.records().into_iter().map(|r| r.display_name).collect();
        assert_eq!(recorded, names);
    }

    #[test]
    fn test_ledger_does_not_own_objects() {
        let ledger = RegistrationLedger::new();
        let object = ObjectHandle::new(SceneObject::new("Temporary"));
        let token = IdentityToken::derive("Temporary", "cool_mod::Spawner", "spawn");
        ledger.register(&object, "Temporary", &site(), token).unwrap();

        let record = ledger.record(&object).unwrap();
        drop(object);
        assert!(!record.object.is_alive());
        assert_eq!(ledger.len(), 1);
    }
}
