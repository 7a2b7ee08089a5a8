//! Dependent-to-root routing
//!
//! Routing is purely structural: it follows the registered accessor on the
//! in-memory record and never touches the store.

use crate::registry::Registry;
use concord_core::{ConcordError, ConcordResult, EntityRef, Persistence, Record};
use tracing::trace;

/// Maps a saved entity to the root whose mediation it belongs to
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyRouter {
    strict: bool,
}

impl DependencyRouter {
    /// Create a router; `strict` rejects unregistered types
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    /// Whether unregistered types are rejected
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Resolve the root for `record`
    ///
    /// Returns the root and whether `record` is its own root.
    ///
    /// # Errors
    ///
    /// - `UnresolvedRoot` if the record is a dependent whose accessor finds no owner
    /// - `NotRegistered` in strict mode for unregistered types
    pub fn resolve_root<P: Persistence>(
        &self,
        registry: &Registry<P>,
        record: &Record,
    ) -> ConcordResult<(EntityRef, bool)> {
        let entity_type = record.entity_type();
        let Some(descriptor) = registry.descriptor(entity_type) else {
            if self.strict {
                return Err(ConcordError::NotRegistered(entity_type));
            }
            return Ok((record.entity_ref(), true));
        };

        let Some(accessor) = descriptor.root_accessor() else {
            return Ok((record.entity_ref(), true));
        };

        match accessor.resolve(record) {
            Some(root) => {
                trace!(target: "concord::mediation", dependent = %record.entity_ref(), %root, "Routed to root");
                Ok((root, false))
            }
            None => Err(ConcordError::UnresolvedRoot {
                entity_type,
                entity: record.entity_ref().to_string(),
            }),
        }
    }
}
