//! Nested saves on one session
//!
//! However deep the nesting, the root's phases and bump run once per
//! outermost mediation.

use crate::common::*;
use concord::prelude::*;
use concord::MediationConfig;
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Member {
    Pen,
    Dingo,
    Biscuit,
}

fn member_strategy() -> impl Strategy<Value = Member> {
    prop_oneof![Just(Member::Pen), Just(Member::Dingo), Just(Member::Biscuit)]
}

/// Save `chain[0]`, whose save nests the save of `chain[1]`, and so on
fn save_chain(
    session: &mut Session<'_, MemoryStore>,
    farm: &Farm,
    pen: EntityId,
    chain: &[Member],
) -> ConcordResult<bool> {
    let Some((first, rest)) = chain.split_first() else {
        return Ok(true);
    };
    let mut record = match first {
        Member::Pen => session.fetch(&pen)?,
        Member::Dingo => farm.dingo(pen),
        Member::Biscuit => farm.biscuit(pen),
    };
    session.mediate(&EntityRef::new(PEN, pen), |s| {
        if !s.write(&mut record)? {
            return Ok(false);
        }
        save_chain(s, farm, pen, rest)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn phases_and_bump_run_once_per_outermost_save(
        chain in prop::collection::vec(member_strategy(), 1..12)
    ) {
        let farm = Farm::new();
        let pen = farm.seed_pen();
        let mut session = farm.engine.session();

        prop_assert!(save_chain(&mut session, &farm, pen, &chain).unwrap());

        prop_assert_eq!(
            farm.calls(),
            vec!["adjust_supply", "feed_dingos", "calc_weight"]
        );
        prop_assert_eq!(farm.lock_version(pen), 1);
        prop_assert_eq!(farm.store().stats().touches, 1);
        prop_assert!(session.state().is_idle());
        prop_assert_eq!(session.depth(), 0);
    }
}

#[test]
fn sequential_saves_each_mediate() {
    let farm = Farm::new();
    let pen = farm.seed_pen();
    let mut session = farm.engine.session();

    for _ in 0..3 {
        session.save(&mut farm.dingo(pen)).unwrap();
    }

    assert_eq!(farm.calls().len(), 9);
    assert_eq!(farm.lock_version(pen), 3);
    assert_eq!(farm.pen(pen).int("supply"), Some(7));
}

#[test]
fn nested_save_of_another_root_mediates_it_separately() {
    let farm = Farm::new();
    let north = farm.seed_pen();
    let south = farm.seed_pen();
    let mut session = farm.engine.session();

    session
        .mediate(&EntityRef::new(PEN, north), |s| {
            s.write(&mut farm.dingo(north))?;
            assert!(s.save(&mut farm.dingo(south))?);
            // The inner mediation joined this transaction and has closed again
            assert!(s.is_open(&EntityRef::new(PEN, north)));
            assert!(!s.is_open(&EntityRef::new(PEN, south)));
            assert_eq!(farm.lock_version(south), 0);
            Ok(true)
        })
        .unwrap();

    assert_eq!(farm.calls().len(), 6);
    assert_eq!(farm.lock_version(north), 1);
    assert_eq!(farm.lock_version(south), 1);
    assert_eq!(farm.store().stats().commits, 1);
}

#[test]
fn unidentified_roots_never_join() {
    const FENCE: EntityType = EntityType::new("Fence");
    let farm = Farm::new();
    let mut session = farm.engine.session();
    let fence = EntityRef::unidentified(FENCE);

    let saved = session
        .mediate(&fence, |s| {
            assert_eq!(s.state().open_count(), 1);
            s.mediate(&fence, |s| {
                assert_eq!(s.state().open_count(), 2);
                s.write(&mut Record::unsaved(FENCE))
            })
        })
        .unwrap();

    assert!(saved);
    assert_eq!(farm.engine.metrics().total_started, 2);
    assert_eq!(farm.engine.metrics().total_nested, 0);
    assert_eq!(farm.store().len(), 1);
}

#[test]
fn nesting_depth_is_bounded() {
    init_tracing();
    let log = CallLog::default();
    let config = MediationConfig {
        max_nesting_depth: 3,
        ..MediationConfig::default()
    };
    let registry = farm_registry(|pen| pen.reconcile("feed_dingos", recorder(&log, "feed_dingos")))
        .build_with(&config)
        .unwrap();
    let engine = Engine::with_config(Arc::new(MemoryStore::new()), registry, config);
    let farm = Farm::from_engine(engine, log);
    let pen = farm.seed_pen();
    let mut session = farm.engine.session();

    let chain = [Member::Dingo, Member::Dingo, Member::Dingo];
    assert!(save_chain(&mut session, &farm, pen, &chain).unwrap());

    let chain = [Member::Dingo; 4];
    let err = save_chain(&mut session, &farm, pen, &chain).unwrap_err();
    assert_eq!(err, ConcordError::NestingTooDeep { depth: 4, limit: 3 });
    assert!(session.state().is_idle());
    assert_eq!(session.depth(), 0);
    assert_eq!(farm.calls(), vec!["feed_dingos"]);
    assert_eq!(farm.store().len(), 4);
}
