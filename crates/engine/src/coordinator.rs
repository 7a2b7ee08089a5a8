//! Mediation coordinator
//!
//! Wraps a caller-supplied save in the mediation protocol:
//!
//! ```text
//! 1. Resolve the root key on the session's MediationState
//! 2. IF the key is already open: nested save, no phases, no bump
//! 3. ELSE open a context, begin (or join) a transaction, run the save
//!    - vetoed: skip everything, roll back if this mediation began the transaction
//!    - saved:  reconciliation → caching → version bump, then commit if owned
//!    - error:  roll back if owned, otherwise mark the shared transaction
//!              rollback-only; propagate unchanged
//! 4. Close the context on every exit path (including unwinding panics)
//! ```
//!
//! Reconciliation, caching and the bump therefore run exactly once per
//! outermost mediation of a root on one session.
//!
//! # Memory Ordering
//!
//! The metric counters use Relaxed ordering. They are observational only and
//! do not synchronize any other memory.

use crate::descriptor::Phase;
use crate::phase::PhaseRunner;
use crate::session::Session;
use concord_concurrency::{BumpOutcome, RootKey, VersionGuard};
use concord_core::{ConcordError, ConcordResult, EntityRef, Persistence, Versioning};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Drives mediations and counts their outcomes
#[derive(Debug, Default)]
pub struct MediationCoordinator {
    active_count: AtomicU64,
    total_started: AtomicU64,
    total_committed: AtomicU64,
    total_vetoed: AtomicU64,
    total_failed: AtomicU64,
    total_nested: AtomicU64,
}

impl MediationCoordinator {
    /// Create a coordinator with zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `save` under the mediation of `root`
    ///
    /// `save` returns `Ok(false)` to veto. The returned flag is the save's own
    /// result.
    ///
    /// # Errors
    ///
    /// - `NestingTooDeep` when the session exceeds the configured depth
    /// - any error from `save`, a phase operation, the bump or the commit,
    ///   unchanged
    pub fn mediate<'e, P, F>(
        &self,
        session: &mut Session<'e, P>,
        root: &EntityRef,
        save: F,
    ) -> ConcordResult<bool>
    where
        P: Persistence,
        F: FnOnce(&mut Session<'e, P>) -> ConcordResult<bool>,
    {
        let limit = session.engine().config().max_nesting_depth;
        if session.depth() >= limit {
            warn!(target: "concord::mediation", %root, depth = session.depth(), limit, "Nesting too deep");
            return Err(ConcordError::NestingTooDeep {
                depth: session.depth() + 1,
                limit,
            });
        }

        let key = session.state_mut().key_for(root);
        if session.state().is_open(&key) {
            self.total_nested.fetch_add(1, Ordering::Relaxed);
            debug!(target: "concord::mediation", %root, depth = session.depth(), "Nested save");
            session.enter();
            let result = save(&mut *session);
            session.leave();
            return result;
        }

        self.mediate_first_entry(session, key, root, save)
    }

    fn mediate_first_entry<'e, P, F>(
        &self,
        session: &mut Session<'e, P>,
        key: RootKey,
        root: &EntityRef,
        save: F,
    ) -> ConcordResult<bool>
    where
        P: Persistence,
        F: FnOnce(&mut Session<'e, P>) -> ConcordResult<bool>,
    {
        let owns_transaction = !session.in_transaction();
        if owns_transaction {
            session.begin_transaction()?;
        }
        let opened = session
            .state_mut()
            .open(key, *root, owns_transaction)
            .map(|_| ());
        if let Err(e) = opened {
            if owns_transaction {
                session.rollback_transaction();
            }
            return Err(e);
        }

        self.total_started.fetch_add(1, Ordering::Relaxed);
        self.active_count.fetch_add(1, Ordering::Relaxed);
        debug!(target: "concord::mediation", %root, owns_transaction, "Mediation opened");

        let depth_at_entry = session.depth();
        session.enter();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            Self::run_protocol(session, &key, root, save)
        }));
        session.reset_depth(depth_at_entry);
        session.state_mut().close(&key);
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        debug!(target: "concord::mediation", %root, "Mediation closed");

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(payload) => {
                if owns_transaction {
                    session.rollback_transaction();
                } else {
                    session.mark_rollback_only(ConcordError::internal(format!(
                        "mediation of {root} panicked"
                    )));
                }
                self.total_failed.fetch_add(1, Ordering::Relaxed);
                warn!(target: "concord::mediation", %root, "Mediation unwound by panic");
                panic::resume_unwind(payload);
            }
        };

        match outcome {
            Ok(true) => {
                if owns_transaction {
                    if let Err(e) = session.commit_transaction() {
                        self.total_failed.fetch_add(1, Ordering::Relaxed);
                        warn!(target: "concord::mediation", %root, error = %e, "Mediation commit failed");
                        return Err(e);
                    }
                }
                self.total_committed.fetch_add(1, Ordering::Relaxed);
                info!(target: "concord::mediation", %root, owns_transaction, "Mediation completed");
                Ok(true)
            }
            Ok(false) => {
                if owns_transaction {
                    session.rollback_transaction();
                }
                self.total_vetoed.fetch_add(1, Ordering::Relaxed);
                warn!(target: "concord::mediation", %root, "Save vetoed; phases skipped");
                Ok(false)
            }
            Err(e) => {
                if owns_transaction {
                    session.rollback_transaction();
                } else {
                    session.mark_rollback_only(e.clone());
                }
                self.total_failed.fetch_add(1, Ordering::Relaxed);
                warn!(target: "concord::mediation", %root, error = %e, "Mediation aborted");
                Err(e)
            }
        }
    }

    /// Save, then the phases and the bump, inside the open context
    fn run_protocol<'e, P, F>(
        session: &mut Session<'e, P>,
        key: &RootKey,
        root: &EntityRef,
        save: F,
    ) -> ConcordResult<bool>
    where
        P: Persistence,
        F: FnOnce(&mut Session<'e, P>) -> ConcordResult<bool>,
    {
        if !save(&mut *session)? {
            session.state_mut().mark_vetoed(key);
            return Ok(false);
        }

        let engine = session.engine();
        let Some(descriptor) = engine.registry().descriptor(root.entity_type) else {
            return Ok(true);
        };

        PhaseRunner::run(
            session,
            root,
            Phase::Reconciliation,
            descriptor.operations(Phase::Reconciliation),
        )?;
        PhaseRunner::run(
            session,
            root,
            Phase::Caching,
            descriptor.operations(Phase::Caching),
        )?;
        Self::bump(session, root, &descriptor.versioning())?;
        Ok(true)
    }

    fn bump<P: Persistence>(
        session: &mut Session<'_, P>,
        root: &EntityRef,
        versioning: &Versioning,
    ) -> ConcordResult<BumpOutcome> {
        let store = session.engine().store();
        let txn = session.transaction_mut()?;
        VersionGuard::bump(store, txn, root, versioning)
    }

    /// Snapshot of mediation counters
    pub fn metrics(&self) -> MediationMetrics {
        MediationMetrics {
            active_count: self.active_count.load(Ordering::Relaxed),
            total_started: self.total_started.load(Ordering::Relaxed),
            total_committed: self.total_committed.load(Ordering::Relaxed),
            total_vetoed: self.total_vetoed.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            total_nested: self.total_nested.load(Ordering::Relaxed),
        }
    }

    /// Mediations currently open across all sessions
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// Mediation statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MediationMetrics {
    /// Mediations currently open
    pub active_count: u64,
    /// Outermost mediations started
    pub total_started: u64,
    /// Mediations whose save and phases succeeded
    pub total_committed: u64,
    /// Mediations whose save vetoed
    pub total_vetoed: u64,
    /// Mediations aborted by an error or panic
    pub total_failed: u64,
    /// Saves that joined an already-open mediation
    pub total_nested: u64,
}

impl MediationMetrics {
    /// Mediations that finished (committed + vetoed + failed)
    pub fn total_completed(&self) -> u64 {
        self.total_committed + self.total_vetoed + self.total_failed
    }
}
