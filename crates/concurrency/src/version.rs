//! Optimistic-lock version bumping
//!
//! `VersionGuard` decides whether a root can be bumped and, when it can, asks
//! the collaborator to touch the timestamp attribute. The collaborator turns
//! the touch into an increment-and-compare of the lock counter, so a counter
//! advanced by another committed mediation surfaces as `StaleVersion`.
//!
//! The guard never retries. Whether to re-run the logical transaction is the
//! caller's decision.

use concord_core::{ConcordResult, EntityRef, Persistence, Versioning, VersioningStatus};
use tracing::{debug, trace};

/// Why a bump did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No versioning attributes declared
    Disabled,
    /// Counter declared without a timestamp: nothing to touch
    CounterWithoutTimestamp,
    /// Timestamp declared without a counter
    TimestampOnly,
    /// The root has no identity to touch
    NoIdentity,
}

/// Result of a bump request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpOutcome {
    /// The counter was advanced to `version`
    Bumped {
        /// New counter value
        version: i64,
    },
    /// Nothing was touched
    Skipped(SkipReason),
}

impl BumpOutcome {
    /// Whether a touch happened
    pub fn is_bumped(&self) -> bool {
        matches!(self, BumpOutcome::Bumped { .. })
    }
}

/// Stateless optimistic-lock bumper
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionGuard;

impl VersionGuard {
    /// Whether `versioning` allows a bump at all
    pub fn can_bump(versioning: &Versioning) -> bool {
        versioning.status() == VersioningStatus::Enabled
    }

    /// Bump the root's lock counter inside `txn`
    ///
    /// # Errors
    ///
    /// Propagates `StaleVersion` (and any other collaborator failure) unchanged.
    pub fn bump<P: Persistence>(
        store: &P,
        txn: &mut P::Txn,
        root: &EntityRef,
        versioning: &Versioning,
    ) -> ConcordResult<BumpOutcome> {
        let (lock_attribute, timestamp_attribute) =
            match (versioning.lock_attribute(), versioning.timestamp_attribute()) {
                (Some(lock), Some(ts)) => (lock, ts),
                _ => {
                    let reason = match versioning.status() {
                        VersioningStatus::CounterWithoutTimestamp => {
                            SkipReason::CounterWithoutTimestamp
                        }
                        VersioningStatus::TimestampOnly => SkipReason::TimestampOnly,
                        _ => SkipReason::Disabled,
                    };
                    trace!(target: "concord::mediation", root = %root, ?reason, "Bump skipped");
                    return Ok(BumpOutcome::Skipped(reason));
                }
            };

        let Some(id) = root.id else {
            debug!(target: "concord::mediation", root = %root, "Bump skipped: root has no identity");
            return Ok(BumpOutcome::Skipped(SkipReason::NoIdentity));
        };

        let version = store.touch(txn, &id, lock_attribute, timestamp_attribute)?;
        debug!(target: "concord::mediation", root = %root, version, "Version bumped");
        Ok(BumpOutcome::Bumped { version })
    }
}
