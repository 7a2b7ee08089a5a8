//! In-memory persistence collaborator
//!
//! `MemoryStore` is a reference implementation of [`Persistence`]:
//! - DashMap of committed records (lock-free reads)
//! - Per-type validators that veto saves instead of raising
//! - Snapshot-on-first-read transactions with buffered writes
//! - Optimistic-lock touch with first-committer-wins validation at commit
//!
//! # Commit Sequence
//!
//! ```text
//! 1. Acquire the commit lock
//! 2. For every touched entity: committed counter must equal the observed one
//! 3. IF any mismatch: discard everything, return StaleVersion
//! 4. Apply buffered writes
//! 5. Release the commit lock
//! ```

use crate::txn::{MemoryTxn, TouchRecord};
use chrono::Utc;
use concord_core::{ConcordError, ConcordResult, EntityId, EntityType, Persistence, Record};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Validation callback: `Err(reason)` vetoes the save
pub type Validator = Arc<dyn Fn(&Record) -> Result<(), String> + Send + Sync>;

/// Snapshot of store counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreStats {
    /// Transactions committed
    pub commits: u64,
    /// Transactions rolled back (explicitly or by failed commit)
    pub rollbacks: u64,
    /// Writes buffered by `save`
    pub writes: u64,
    /// Saves rejected by a validator
    pub vetoes: u64,
    /// Successful lock-counter touches
    pub touches: u64,
}

/// Thread-safe in-memory record store
pub struct MemoryStore {
    records: DashMap<EntityId, Record>,
    validators: RwLock<FxHashMap<EntityType, Vec<Validator>>>,
    /// Serializes commit validation + application
    commit_lock: Mutex<()>,
    next_txn_id: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
    writes: AtomicU64,
    vetoes: AtomicU64,
    touches: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            validators: RwLock::new(FxHashMap::default()),
            commit_lock: Mutex::new(()),
            next_txn_id: AtomicU64::new(1),
            commits: AtomicU64::new(0),
            rollbacks: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            vetoes: AtomicU64::new(0),
            touches: AtomicU64::new(0),
        }
    }

    /// Register a validator for an entity type
    ///
    /// Validators run in registration order on every `save` of that type.
    pub fn add_validator<F>(&self, entity_type: EntityType, validator: F)
    where
        F: Fn(&Record) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validators
            .write()
            .entry(entity_type)
            .or_default()
            .push(Arc::new(validator));
    }

    /// Write a record directly, outside any transaction
    ///
    /// Intended for fixtures. Skips validation. Returns the record's identity.
    pub fn seed(&self, mut record: Record) -> EntityId {
        let id = record.ensure_id();
        self.records.insert(id, record);
        id
    }

    /// Read the committed state of a record
    pub fn get(&self, id: &EntityId) -> Option<Record> {
        self.records.get(id).map(|r| r.value().clone())
    }

    /// Number of committed records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Counter snapshot
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            commits: self.commits.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            vetoes: self.vetoes.load(Ordering::Relaxed),
            touches: self.touches.load(Ordering::Relaxed),
        }
    }

    fn validate(&self, record: &Record) -> Result<(), String> {
        let validators = match self.validators.read().get(&record.entity_type()) {
            Some(list) => list.clone(),
            None => return Ok(()),
        };
        validators.iter().try_for_each(|v| v(record))
    }

    /// The record as `txn` sees it, pinning the committed version on first read
    fn view(&self, txn: &mut MemoryTxn, id: &EntityId) -> Option<Record> {
        if let Some(local) = txn.local_view(id) {
            return local.cloned();
        }
        let committed = self.get(id);
        txn.snapshot.insert(*id, committed.clone());
        committed
    }

    fn committed_counter(&self, id: &EntityId, lock_attribute: &str) -> i64 {
        self.records
            .get(id)
            .and_then(|r| r.int(lock_attribute))
            .unwrap_or(0)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Persistence for MemoryStore {
    type Txn = MemoryTxn;

    fn begin(&self) -> ConcordResult<MemoryTxn> {
        let txn_id = self.next_txn_id.fetch_add(1, Ordering::Relaxed);
        debug!(target: "concord::store", txn_id, "Transaction started");
        Ok(MemoryTxn::new(txn_id))
    }

    fn commit(&self, txn: MemoryTxn) -> ConcordResult<()> {
        let txn_id = txn.txn_id();
        let _guard = self.commit_lock.lock();

        for (id, touch) in &txn.touched {
            let found = self.committed_counter(id, &touch.lock_attribute);
            if found != touch.observed {
                self.rollbacks.fetch_add(1, Ordering::Relaxed);
                warn!(
                    target: "concord::store",
                    txn_id,
                    entity = %id,
                    expected = touch.observed,
                    found,
                    "Commit rejected: lock counter advanced concurrently"
                );
                return Err(ConcordError::StaleVersion {
                    entity: *id,
                    expected: touch.observed,
                    found,
                });
            }
        }

        let applied = txn.writes.len();
        for (id, record) in txn.writes {
            self.records.insert(id, record);
        }
        self.commits.fetch_add(1, Ordering::Relaxed);
        debug!(target: "concord::store", txn_id, applied, "Transaction committed");
        Ok(())
    }

    fn rollback(&self, txn: MemoryTxn) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
        debug!(
            target: "concord::store",
            txn_id = txn.txn_id(),
            discarded = txn.pending_writes(),
            "Transaction rolled back"
        );
    }

    fn load(&self, txn: &mut MemoryTxn, id: &EntityId) -> ConcordResult<Option<Record>> {
        Ok(self.view(txn, id))
    }

    fn save(&self, txn: &mut MemoryTxn, record: &mut Record) -> ConcordResult<bool> {
        if let Err(reason) = self.validate(record) {
            self.vetoes.fetch_add(1, Ordering::Relaxed);
            debug!(
                target: "concord::store",
                txn_id = txn.txn_id(),
                entity = %record.entity_ref(),
                %reason,
                "Save vetoed by validation"
            );
            return Ok(false);
        }

        let id = record.ensure_id();
        // Pin the pre-write committed state so touches compare against it.
        self.view(txn, &id);
        txn.writes.insert(id, record.clone());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }

    fn touch(
        &self,
        txn: &mut MemoryTxn,
        id: &EntityId,
        lock_attribute: &str,
        timestamp_attribute: &str,
    ) -> ConcordResult<i64> {
        let mut record = self
            .view(txn, id)
            .ok_or(ConcordError::EntityNotFound(*id))?;

        let current = record
            .int(lock_attribute)
            .or_else(|| {
                txn.snapshot
                    .get(id)
                    .and_then(|s| s.as_ref())
                    .and_then(|s| s.int(lock_attribute))
            })
            .unwrap_or(0);
        let observed = match txn.touched.get(id) {
            Some(previous) => previous.observed,
            None => current,
        };

        let found = self.committed_counter(id, lock_attribute);
        if found != observed {
            return Err(ConcordError::StaleVersion {
                entity: *id,
                expected: observed,
                found,
            });
        }

        let next = current + 1;
        record.set(lock_attribute, next);
        record.set(timestamp_attribute, Utc::now());
        txn.writes.insert(*id, record);
        txn.touched.entry(*id).or_insert(TouchRecord {
            lock_attribute: lock_attribute.to_string(),
            observed,
        });
        self.touches.fetch_add(1, Ordering::Relaxed);
        Ok(next)
    }
}
