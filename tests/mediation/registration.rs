//! Registration and configuration through the public surface

use crate::common::*;
use concord::prelude::*;
use concord::{MediationConfig, Phase, VersioningPolicy};

#[test]
fn config_file_drives_registration_policy() {
    let config = MediationConfig::from_toml_str("versioning_policy = \"deny\"\n").unwrap();
    let err = farm_registry(|pen| pen.versioning(Versioning::lock_only(LOCK)))
        .build_with(&config)
        .unwrap_err();
    assert_eq!(
        err,
        ConcordError::MisconfiguredVersioning {
            entity_type: PEN,
            lock_attribute: LOCK.to_string(),
        }
    );
}

#[test]
fn silenced_policy_still_skips_bump() {
    let config = MediationConfig {
        versioning_policy: VersioningPolicy::Off,
        ..MediationConfig::default()
    };
    let log = CallLog::default();
    let registry = farm_registry(|pen| {
        pen.reconcile("feed_dingos", recorder(&log, "feed_dingos"))
            .versioning(Versioning::lock_only(LOCK))
    })
    .build_with(&config)
    .unwrap();
    assert!(registry.diagnostics().is_empty());

    let farm = Farm::from_engine(
        Engine::with_config(Arc::new(MemoryStore::new()), registry, config),
        log,
    );
    let pen = farm.seed_pen();
    farm.engine.save(&mut farm.dingo(pen)).unwrap();
    assert_eq!(farm.lock_version(pen), 0);
    assert_eq!(farm.calls(), vec!["feed_dingos"]);
}

#[test]
fn strict_registration_rejects_unknown_types() {
    const FENCE: EntityType = EntityType::new("Fence");
    let config = MediationConfig::from_toml_str("strict_registration = true").unwrap();
    let registry = farm_registry(|pen| pen).build_with(&config).unwrap();
    let engine = Engine::with_config(Arc::new(MemoryStore::new()), registry, config);

    let err = engine.save(&mut Record::new(FENCE)).unwrap_err();
    assert_eq!(err, ConcordError::NotRegistered(FENCE));

    let pen = engine.store().seed(Record::new(PEN));
    assert!(engine
        .save(&mut Record::new(DINGO).with("pen_id", pen))
        .unwrap());
}

#[test]
fn custom_accessor_routes_dependents() {
    const KENNEL: EntityType = EntityType::new("Kennel");
    let log = CallLog::default();
    let registry = Registry::builder()
        .root(PEN, |pen| {
            pen.reconcile("feed_dingos", recorder(&log, "feed_dingos"))
                .depends_on(KENNEL)
        })
        .dependent(
            KENNEL,
            RootAccessor::custom(|kennel| {
                kennel
                    .reference("paddock")
                    .map(|id| EntityRef::new(PEN, id))
            }),
        )
        .build()
        .unwrap();
    let farm = Farm::from_engine(Engine::new(Arc::new(MemoryStore::new()), registry), log);
    let pen = farm.seed_pen();

    farm.engine
        .save(&mut Record::new(KENNEL).with("paddock", pen))
        .unwrap();
    assert_eq!(farm.calls(), vec!["feed_dingos"]);
}

#[test]
fn descriptors_expose_declared_phases() {
    let farm = Farm::new();
    let descriptor = farm.engine.registry().descriptor(PEN).unwrap();
    let names = |phase| {
        descriptor
            .operations(phase)
            .iter()
            .map(|op| op.name())
            .collect::<Vec<_>>()
    };
    assert_eq!(names(Phase::Reconciliation), vec!["adjust_supply", "feed_dingos"]);
    assert_eq!(names(Phase::Caching), vec!["calc_weight"]);
    assert!(descriptor.dependencies().contains(&DINGO));
    assert!(descriptor.dependencies().contains(&BISCUIT));
    assert!(farm
        .engine
        .registry()
        .descriptor(DINGO)
        .unwrap()
        .is_dependent());
}
