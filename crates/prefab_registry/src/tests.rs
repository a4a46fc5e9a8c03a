// End-to-end tests for the clone-and-register pipeline

use crate::*;
use rayon::prelude::*;
use std::sync::Arc;

fn registry_with_sink() -> (PrefabRegistry, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::new());
    let registry = PrefabRegistry::new(RegistryConfig::default())
        .expect("default config is valid")
        .with_diagnostics(sink.clone());
    (registry, sink)
}

fn spawner_site() -> CallSite {
    CallSite::new("foo_mod", "Mods.Foo.SpawnerType", "SpawnMob").unwrap()
}

fn networked_template(name: &str) -> ObjectHandle {
    ObjectHandle::new(
        SceneObject::new(name)
            .with_network_identity()
            .as_build_time_prefab(),
    )
}

#[test]
fn test_clone_and_register_full_pipeline() {
    let (registry, sink) = registry_with_sink();
    let template = networked_template("Lemurian");

    let mob = registry
        .clone_and_register(&template, "Mob", true, &spawner_site())
        .unwrap();

    let expected = IdentityToken::derive("Mob", "Mods.Foo.SpawnerType", "SpawnMob");
    assert_eq!(mob.asset_id(), Some(expected));
    assert!(!mob.is_active());
    assert!(registry.is_prefab_hashed(&mob));
    assert!(!registry.is_prefab_hashed(&template));
    assert_eq!(template.asset_id(), None);

    let pack = registry.content_pack(&ModuleId::new("foo_mod")).unwrap();
    assert_eq!(pack.networked_object_prefabs(), vec![mob.clone()]);

    let record = registry.ledger().record(&mob).unwrap();
    assert_eq!(record.display_name, "Mob");
    assert_eq!(record.type_qualifier, "Mods.Foo.SpawnerType");
    assert_eq!(record.method_name, "SpawnMob");
    assert_eq!(record.token, expected);
    assert!(sink.is_empty());
}

#[test]
fn test_peers_converge_on_the_same_token() {
    let (server, _) = registry_with_sink();
    let (client, _) = registry_with_sink();

    let on_server = server
        .instantiate_clone(&networked_template("Lemurian"), "Mob", &spawner_site())
        .unwrap();
    let on_client = client
        .instantiate_clone(&networked_template("Lemurian"), "Mob", &spawner_site())
        .unwrap();

    assert_ne!(on_server.id(), on_client.id());
    assert_eq!(on_server.asset_id(), on_client.asset_id());
}

#[test]
fn test_same_name_from_different_mods_does_not_collide() {
    let (registry, _) = registry_with_sink();
    let template = networked_template("Lemurian");
    let other_site = CallSite::new("bar_mod", "Mods.Bar.Spawner", "SpawnMob").unwrap();

    let foo = registry.instantiate_clone(&template, "Mob", &spawner_site()).unwrap();
    let bar = registry.instantiate_clone(&template, "Mob", &other_site).unwrap();

    assert_ne!(foo.asset_id(), bar.asset_id());
    assert_eq!(registry.content_packs().len(), 2);
}

#[test]
fn test_local_clone_is_not_registered() {
    let (registry, sink) = registry_with_sink();
    let template = networked_template("Lemurian");

    let visual = registry
        .clone_and_register(&template, "VisualOnly", false, &spawner_site())
        .unwrap();

    assert!(!registry.is_prefab_hashed(&visual));
    assert_eq!(visual.asset_id(), None);
    assert!(registry.content_packs().is_empty());
    assert!(registry.is_prefab(&visual));
    assert!(sink.is_empty());
}

#[test]
fn test_register_by_default_follows_config() {
    let config = RegistryConfig {
        register_network_by_default: false,
        ..Default::default()
    };
    let registry = PrefabRegistry::new(config).unwrap();
    let clone = registry
        .instantiate_clone(&networked_template("Lemurian"), "Quiet", &spawner_site())
        .unwrap();
    assert!(!registry.is_prefab_hashed(&clone));
}

#[test]
fn test_missing_network_identity_still_clones() {
    let (registry, sink) = registry_with_sink();
    let decoration = ObjectHandle::new(SceneObject::new("Rock"));

    let clone = registry
        .instantiate_clone(&decoration, "FancyRock", &spawner_site())
        .unwrap();

    assert_eq!(clone.name(), "FancyRock");
    assert!(!registry.is_prefab_hashed(&clone));
    assert!(registry.content_packs().is_empty());

    let diagnostics = sink.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].object_id, Some(clone.id()));
    assert!(diagnostics[0].reason.contains("NetworkIdentity"));
    assert_eq!(registry.stats().registrations_skipped, 1);
}

#[test]
fn test_reregistration_is_idempotent() {
    let (registry, _) = registry_with_sink();
    let mob = registry
        .instantiate_clone(&networked_template("Lemurian"), "Mob", &spawner_site())
        .unwrap();
    let first_token = mob.asset_id().unwrap();

    let elsewhere = CallSite::new("other_mod", "Other.Type", "Again").unwrap();
    let outcome = registry.register_network_prefab(&mob, &elsewhere).unwrap();

    assert_eq!(outcome, RegistrationOutcome::AlreadyRegistered { token: first_token });
    assert_eq!(mob.asset_id(), Some(first_token));
    assert_eq!(registry.ledger().len(), 1);
    assert_eq!(registry.content_pack(&ModuleId::new("foo_mod")).unwrap().len(), 1);
    assert!(registry.content_pack(&ModuleId::new("other_mod")).is_none());
    assert_eq!(registry.stats().duplicate_requests, 1);
}

#[test]
fn test_register_existing_object_directly() {
    let (registry, _) = registry_with_sink();
    let handmade = ObjectHandle::new(SceneObject::new("Handmade").with_network_identity());

    let outcome = registry.register_network_prefab(&handmade, &spawner_site()).unwrap();

    let token = IdentityToken::derive("Handmade", "Mods.Foo.SpawnerType", "SpawnMob");
    assert_eq!(
        outcome,
        RegistrationOutcome::Bound {
            token,
            module: ModuleId::new("foo_mod"),
        }
    );
    assert_eq!(handmade.asset_id(), Some(token));
}

#[test]
fn test_precondition_failures_propagate() {
    let (registry, _) = registry_with_sink();
    let template = networked_template("Lemurian");

    assert!(matches!(
        registry.instantiate_clone(&template, "", &spawner_site()),
        Err(PrefabError::InvalidDisplayName(_))
    ));
    assert_eq!(registry.stats(), RegistryStats::default());
}

#[test]
fn test_classification_prefers_container_then_fallback() {
    struct Nothing;
    impl PrefabClassifier for Nothing {
        fn is_prefab(&self, _object: &ObjectHandle) -> bool {
            false
        }
    }

    let (registry, _) = registry_with_sink();
    let template = networked_template("Lemurian");
    let stray = ObjectHandle::new(SceneObject::new("Stray"));
    let clone = registry.instantiate_clone(&template, "Mob", &spawner_site()).unwrap();

    assert!(registry.is_prefab(&clone));
    assert!(registry.is_prefab(&template));
    assert!(!registry.is_prefab(&stray));

    let strict = PrefabRegistry::new(RegistryConfig::default())
        .unwrap()
        .with_fallback_classifier(Arc::new(Nothing));
    assert!(!strict.is_prefab(&template));
}

#[test]
fn test_call_site_macro_feeds_the_token() {
    let (registry, _) = registry_with_sink();
    let site = call_site!().unwrap();
    let clone = registry
        .instantiate_clone(&networked_template("Lemurian"), "MacroMob", &site)
        .unwrap();

    let expected = IdentityToken::derive(
        "MacroMob",
        "prefab_registry::tests",
        "test_call_site_macro_feeds_the_token",
    );
    assert_eq!(clone.asset_id(), Some(expected));
    assert!(registry.content_pack(&ModuleId::new("prefab_registry")).is_some());
}

#[test]
fn test_concurrent_registration_from_one_module() {
    const N: usize = 128;
    let (registry, sink) = registry_with_sink();
    let template = networked_template("Lemurian");

    let clones: Vec<ObjectHandle> = (0..N)
        .into_par_iter()
        .map(|i| {
            registry
                .instantiate_clone(&template, &format!("Mob{i}"), &spawner_site())
                .unwrap()
        })
        .collect();

    let stats = registry.stats();
    assert_eq!(stats.content_packs, 1);
    assert_eq!(stats.prefabs_registered, N as u64);
    assert_eq!(stats.clones_created, N as u64);
    assert_eq!(registry.content_pack(&ModuleId::new("foo_mod")).unwrap().len(), N);
    assert_eq!(registry.cloner().container().children().len(), N);
    assert!(clones.iter().all(|clone| registry.is_prefab_hashed(clone)));
    assert!(sink.is_empty());
}

#[test]
fn test_concurrent_duplicate_requests_bind_once() {
    let (registry, _) = registry_with_sink();
    let mob = ObjectHandle::new(SceneObject::new("Contested").with_network_identity());

    let outcomes: Vec<_> = (0..64)
        .into_par_iter()
        .map(|_| registry.register_network_prefab(&mob, &spawner_site()).unwrap())
        .collect();

    let bound = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, RegistrationOutcome::Bound { .. }))
        .count();
    assert_eq!(bound, 1);
    assert_eq!(registry.ledger().len(), 1);
    assert_eq!(registry.content_pack(&ModuleId::new("foo_mod")).unwrap().len(), 1);
}

#[test]
fn test_skipped_object_can_register_once_identified() {
    let (registry, sink) = registry_with_sink();
    let late = ObjectHandle::new(SceneObject::new("Late"));

    assert_eq!(
        registry.register_network_prefab(&late, &spawner_site()).unwrap(),
        RegistrationOutcome::Skipped
    );
    assert!(!registry.is_prefab_hashed(&late));

    late.write().network_identity = Some(NetworkIdentity::new());
    let outcome = registry.register_network_prefab(&late, &spawner_site()).unwrap();

    assert!(matches!(outcome, RegistrationOutcome::Bound { .. }));
    assert!(registry.content_pack(&ModuleId::new("foo_mod")).unwrap().contains(&late));
    assert_eq!(sink.len(), 1);
}

#[test]
fn test_identity_removed_during_registration_leaves_no_partial_state() {
    const N: usize = 64;
    let (registry, _) = registry_with_sink();
    let objects: Vec<ObjectHandle> = (0..N)
        .map(|i| ObjectHandle::new(SceneObject::new(format!("Flicker{i}")).with_network_identity()))
        .collect();

    rayon::join(
        || {
            objects.par_iter().for_each(|object| {
                registry.register_network_prefab(object, &spawner_site()).unwrap();
            })
        },
        || {
            objects.par_iter().for_each(|object| {
                object.write().network_identity = None;
            })
        },
    );

    let pack = registry.content_pack(&ModuleId::new("foo_mod"));
    for object in &objects {
        let in_pack = pack.as_ref().is_some_and(|pack| pack.contains(object));
        assert_eq!(registry.is_prefab_hashed(object), in_pack, "{object}");
    }
    let stats = registry.stats();
    assert_eq!(stats.prefabs_registered + stats.registrations_skipped, N as u64);
}
