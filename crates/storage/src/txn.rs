//! Transaction state for the in-memory store
//!
//! A `MemoryTxn` buffers every write until commit and pins the committed
//! version of each record on first read, so all reads within a transaction see
//! one consistent view. Touches remember the lock-counter value that was
//! observed, which commit re-validates (first-committer-wins).

use concord_core::{EntityId, Record};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// A lock-counter touch awaiting commit-time validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TouchRecord {
    /// Counter attribute name
    pub lock_attribute: String,
    /// Value of the counter when this transaction first observed it
    pub observed: i64,
}

/// Transaction handle for [`MemoryStore`](crate::MemoryStore)
#[derive(Debug)]
pub struct MemoryTxn {
    txn_id: u64,
    /// Committed state pinned on first read (`None` = did not exist)
    pub(crate) snapshot: FxHashMap<EntityId, Option<Record>>,
    /// Buffered writes, applied in id order on commit
    pub(crate) writes: BTreeMap<EntityId, Record>,
    pub(crate) touched: FxHashMap<EntityId, TouchRecord>,
}

impl MemoryTxn {
    pub(crate) fn new(txn_id: u64) -> Self {
        Self {
            txn_id,
            snapshot: FxHashMap::default(),
            writes: BTreeMap::new(),
            touched: FxHashMap::default(),
        }
    }

    /// Unique transaction id
    pub fn txn_id(&self) -> u64 {
        self.txn_id
    }

    /// Number of buffered writes
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Number of entities touched for versioning
    pub fn pending_touches(&self) -> usize {
        self.touched.len()
    }

    /// Whether commit would be a no-op
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }

    /// The record as this transaction currently sees it, if already known
    pub(crate) fn local_view(&self, id: &EntityId) -> Option<Option<&Record>> {
        if let Some(record) = self.writes.get(id) {
            return Some(Some(record));
        }
        self.snapshot.get(id).map(Option::as_ref)
    }
}
