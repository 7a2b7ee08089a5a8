//! Persistence collaborator abstraction
//!
//! The mediation layer never executes writes itself. It consumes this trait to
//! start and finish transactions, read and write records, and request the
//! optimistic-lock touch. Swapping the implementation must not change any
//! mediation semantics.

use crate::error::ConcordResult;
use crate::record::Record;
use crate::types::EntityId;

/// Persistence mechanism consumed by the mediation layer
///
/// Thread safety: one store is shared by all execution paths, so every method
/// must be safe to call concurrently (requires Send + Sync). A `Txn` belongs to
/// exactly one execution path and is never shared.
pub trait Persistence: Send + Sync {
    /// Transaction handle owned by one execution path
    type Txn: Send;

    /// Begin a transactional scope
    fn begin(&self) -> ConcordResult<Self::Txn>;

    /// Commit every buffered write of the transaction atomically
    ///
    /// # Errors
    ///
    /// Returns `StaleVersion` if a touched counter was advanced by another
    /// transaction after this one observed it. Nothing is applied in that case.
    fn commit(&self, txn: Self::Txn) -> ConcordResult<()>;

    /// Discard every buffered write of the transaction
    fn rollback(&self, txn: Self::Txn);

    /// Read a record as this transaction sees it
    ///
    /// The first read of an entity pins the version this transaction observes.
    fn load(&self, txn: &mut Self::Txn, id: &EntityId) -> ConcordResult<Option<Record>>;

    /// Validate and buffer a write
    ///
    /// Returns `Ok(false)` when validation rejects the record (a veto; nothing is
    /// buffered). Assigns an identity to records that do not have one.
    fn save(&self, txn: &mut Self::Txn, record: &mut Record) -> ConcordResult<bool>;

    /// Set the timestamp attribute and increment the lock counter
    ///
    /// The counter is compared against the value this transaction observed.
    /// Returns the new counter value.
    ///
    /// # Errors
    ///
    /// Returns `StaleVersion` if the committed counter differs from the observed
    /// one, and `EntityNotFound` if the entity does not exist.
    fn touch(
        &self,
        txn: &mut Self::Txn,
        id: &EntityId,
        lock_attribute: &str,
        timestamp_attribute: &str,
    ) -> ConcordResult<i64>;
}
