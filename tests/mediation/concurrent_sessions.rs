//! Independent sessions running concurrently
//!
//! Sessions never see each other's open mediations; the only cross-session
//! coordination is the lock-counter comparison.

use crate::common::*;
use concord::prelude::*;
use concord::RetryConfig;
use static_assertions::assert_impl_all;
use std::sync::Barrier;
use std::thread;

assert_impl_all!(Engine<MemoryStore>: Send, Sync);

#[test]
fn stale_reader_loses_after_concurrent_commit() {
    let farm = Farm::new();
    let pen = farm.seed_pen();
    let read = Barrier::new(2);
    let committed = Barrier::new(2);

    let (stale, fresh) = thread::scope(|scope| {
        let stale = scope.spawn(|| {
            let mut session = farm.engine.session();
            session.transaction(|s| {
                let observed = s.fetch(&pen)?;
                assert_eq!(observed.int(LOCK), Some(0));
                read.wait();
                committed.wait();
                s.save(&mut farm.dingo(pen))
            })
        });
        let fresh = scope.spawn(|| {
            read.wait();
            let result = farm.engine.save(&mut farm.dingo(pen));
            committed.wait();
            result
        });
        (stale.join().unwrap(), fresh.join().unwrap())
    });

    assert!(fresh.unwrap());
    let err = stale.unwrap_err();
    assert_eq!(
        err,
        ConcordError::StaleVersion {
            entity: pen,
            expected: 0,
            found: 1,
        }
    );
    assert!(err.is_conflict());

    // Only the winner's mediation is visible
    assert_eq!(farm.lock_version(pen), 1);
    assert_eq!(farm.pen(pen).int("supply"), Some(9));
    assert_eq!(farm.store().len(), 2);
}

#[test]
fn independent_roots_do_not_interfere() {
    const THREADS: usize = 8;
    const SAVES: i64 = 10;

    let farm = Farm::new();
    let pens: Vec<EntityId> = (0..THREADS).map(|_| farm.seed_pen()).collect();
    let start = Barrier::new(THREADS);

    thread::scope(|scope| {
        for &pen in &pens {
            let farm = &farm;
            let start = &start;
            scope.spawn(move || {
                start.wait();
                let mut session = farm.engine.session();
                for _ in 0..SAVES {
                    assert!(session.save(&mut farm.dingo(pen)).unwrap());
                }
                assert!(session.state().is_idle());
            });
        }
    });

    for &pen in &pens {
        assert_eq!(farm.lock_version(pen), SAVES);
        assert_eq!(farm.pen(pen).int("supply"), Some(10 - SAVES));
    }
    let metrics = farm.engine.metrics();
    assert_eq!(metrics.total_committed, THREADS as u64 * SAVES as u64);
    assert_eq!(metrics.total_failed, 0);
    assert_eq!(metrics.active_count, 0);
}

#[test]
fn same_root_with_retry_loses_no_update() {
    const THREADS: usize = 4;
    const SAVES: i64 = 5;

    let farm = Farm::new();
    let pen = farm.seed_pen();
    let start = Barrier::new(THREADS);
    let retry = RetryConfig::new()
        .with_max_retries(100)
        .with_base_delay_ms(1)
        .with_max_delay_ms(5);

    thread::scope(|scope| {
        for _ in 0..THREADS {
            let farm = &farm;
            let start = &start;
            let retry = retry.clone();
            scope.spawn(move || {
                start.wait();
                for _ in 0..SAVES {
                    let saved = farm
                        .engine
                        .run_with_retry(retry.clone(), |s| s.save(&mut farm.dingo(pen)))
                        .unwrap();
                    assert!(saved);
                }
            });
        }
    });

    let total = THREADS as i64 * SAVES;
    assert_eq!(farm.lock_version(pen), total);
    assert_eq!(farm.pen(pen).int("supply"), Some(10 - total));
    // Pen plus one dingo per successful save
    assert_eq!(farm.store().len(), 1 + total as usize);
}
