//! Sessions: one execution path through the mediation layer
//!
//! A `Session` carries everything that is scoped to one logical line of
//! execution: the open mediation contexts, the collaborator transaction, and
//! the current nesting depth. Phase operations receive `&mut Session`, so
//! nested saves made from inside a phase see the same state and join the
//! same transaction. Sessions are not shared between threads; concurrent
//! logical transactions each use their own.
//!
//! # Example
//!
//! ```text
//! let mut session = engine.session();
//! let mut dingo = Record::new(DINGO).with("pen_id", pen_id);
//! session.save(&mut dingo)?;   // mediates the owning Pen
//! ```

use crate::engine::Engine;
use concord_concurrency::{MediationState, RootKey};
use concord_core::{ConcordError, ConcordResult, EntityId, EntityRef, Persistence, Record};
use tracing::{debug, trace, warn};

/// One execution path
pub struct Session<'e, P: Persistence> {
    engine: &'e Engine<P>,
    state: MediationState,
    txn: Option<P::Txn>,
    /// Set when a mediation that joined `txn` failed; the commit is refused
    rollback_only: Option<ConcordError>,
    depth: usize,
}

impl<'e, P: Persistence> Session<'e, P> {
    pub(crate) fn new(engine: &'e Engine<P>) -> Self {
        Self {
            engine,
            state: MediationState::new(),
            txn: None,
            rollback_only: None,
            depth: 0,
        }
    }

    /// Save a record under the mediation of its root
    ///
    /// Dependents are routed to their root first. Returns `Ok(false)` when
    /// the store vetoed the write; nothing of the mediation is kept then.
    ///
    /// # Errors
    ///
    /// Routing errors (`UnresolvedRoot`, `NotRegistered`) and anything the
    /// mediation raises.
    pub fn save(&mut self, record: &mut Record) -> ConcordResult<bool> {
        let engine = self.engine;
        let (mut root, self_rooted) = engine.router().resolve_root(engine.registry(), record)?;
        if self_rooted && root.id.is_none() {
            // The root's key must not change when the write assigns its identity
            record.ensure_id();
            root = record.entity_ref();
        }
        trace!(target: "concord::mediation", entity = %record.entity_ref(), %root, self_rooted, "Save requested");
        engine
            .coordinator()
            .mediate(self, &root, |session| session.write(record))
    }

    /// Run an arbitrary save operation under the mediation of `root`
    pub fn mediate<F>(&mut self, root: &EntityRef, save: F) -> ConcordResult<bool>
    where
        F: FnOnce(&mut Session<'e, P>) -> ConcordResult<bool>,
    {
        let engine = self.engine;
        engine.coordinator().mediate(self, root, save)
    }

    /// Write a record without mediation
    ///
    /// Inside a transaction the write is buffered in it. Outside one it is
    /// committed on its own.
    pub fn write(&mut self, record: &mut Record) -> ConcordResult<bool> {
        let store = self.engine.store();
        if let Some(txn) = self.txn.as_mut() {
            return store.save(txn, record);
        }

        let mut txn = store.begin()?;
        match store.save(&mut txn, record) {
            Ok(true) => store.commit(txn).map(|()| true),
            Ok(false) => {
                store.rollback(txn);
                Ok(false)
            }
            Err(e) => {
                store.rollback(txn);
                Err(e)
            }
        }
    }

    /// Read a record as this session sees it
    pub fn load(&mut self, id: &EntityId) -> ConcordResult<Option<Record>> {
        let store = self.engine.store();
        if let Some(txn) = self.txn.as_mut() {
            return store.load(txn, id);
        }

        let mut txn = store.begin()?;
        let result = store.load(&mut txn, id);
        store.rollback(txn);
        result
    }

    /// Read a record that must exist
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if there is no such record.
    pub fn fetch(&mut self, id: &EntityId) -> ConcordResult<Record> {
        self.load(id)?.ok_or(ConcordError::EntityNotFound(*id))
    }

    /// Run `f` inside one transaction shared by every mediation it starts
    ///
    /// Commits when `f` succeeds and rolls back when it fails. If a
    /// transaction is already active `f` simply joins it.
    pub fn transaction<T, F>(&mut self, f: F) -> ConcordResult<T>
    where
        F: FnOnce(&mut Session<'e, P>) -> ConcordResult<T>,
    {
        if self.in_transaction() {
            return f(self);
        }

        self.begin_transaction()?;
        match f(self) {
            Ok(value) => {
                self.commit_transaction()?;
                Ok(value)
            }
            Err(e) => {
                self.rollback_transaction();
                Err(e)
            }
        }
    }

    /// Whether a mediation of `root` is open on this session
    ///
    /// Always `false` for roots without identity.
    pub fn is_open(&self, root: &EntityRef) -> bool {
        root.id
            .map_or(false, |id| self.state.is_open(&RootKey::Persistent(id)))
    }

    /// Open mediation contexts of this session
    pub fn state(&self) -> &MediationState {
        &self.state
    }

    /// Whether a collaborator transaction is active
    pub fn in_transaction(&self) -> bool {
        self.txn.is_some()
    }

    /// Whether the active transaction can only be rolled back
    ///
    /// A mediation that joined the transaction and then failed leaves its
    /// partial work in it; committing is refused from then on.
    pub fn is_rollback_only(&self) -> bool {
        self.rollback_only.is_some()
    }

    /// Current nesting depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The engine this session belongs to
    pub fn engine(&self) -> &'e Engine<P> {
        self.engine
    }

    pub(crate) fn state_mut(&mut self) -> &mut MediationState {
        &mut self.state
    }

    pub(crate) fn enter(&mut self) {
        self.depth += 1;
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn reset_depth(&mut self, depth: usize) {
        self.depth = depth;
    }

    pub(crate) fn begin_transaction(&mut self) -> ConcordResult<()> {
        if self.txn.is_some() {
            return Err(ConcordError::internal("transaction already active"));
        }
        self.txn = Some(self.engine.store().begin()?);
        self.rollback_only = None;
        trace!(target: "concord::mediation", "Transaction begun");
        Ok(())
    }

    pub(crate) fn commit_transaction(&mut self) -> ConcordResult<()> {
        let txn = self
            .txn
            .take()
            .ok_or_else(|| ConcordError::TransactionNotActive("commit".to_string()))?;
        if let Some(cause) = self.rollback_only.take() {
            warn!(target: "concord::mediation", error = %cause, "Commit refused: a joined mediation failed");
            self.engine.store().rollback(txn);
            return Err(cause);
        }
        self.engine.store().commit(txn)
    }

    /// Refuse the commit of the active transaction, keeping the first cause
    pub(crate) fn mark_rollback_only(&mut self, cause: ConcordError) {
        if self.txn.is_some() && self.rollback_only.is_none() {
            self.rollback_only = Some(cause);
        }
    }

    pub(crate) fn rollback_transaction(&mut self) {
        self.rollback_only = None;
        if let Some(txn) = self.txn.take() {
            self.engine.store().rollback(txn);
        }
    }

    pub(crate) fn transaction_mut(&mut self) -> ConcordResult<&mut P::Txn> {
        self.txn
            .as_mut()
            .ok_or_else(|| ConcordError::TransactionNotActive("version bump".to_string()))
    }
}

impl<'e, P: Persistence> Drop for Session<'e, P> {
    fn drop(&mut self) {
        if let Some(txn) = self.txn.take() {
            debug!(target: "concord::mediation", "Session dropped with an active transaction; rolling back");
            self.engine.store().rollback(txn);
        }
    }
}
