//! Concord - mediated saves for graphs of interdependent entities
//!
//! A logical "concept" is a root entity plus its dependents. Saving any member
//! of the concept runs the root's mediation exactly once per logical update:
//! reconciliation operations, then caching operations, then a single
//! optimistic-lock bump of the root, all inside one transaction.
//!
//! # Quick Start
//!
//! ```ignore
//! use concord::prelude::*;
//!
//! const PEN: EntityType = EntityType::new("Pen");
//! const DINGO: EntityType = EntityType::new("Dingo");
//!
//! let registry = Registry::builder()
//!     .root(PEN, |pen| pen
//!         .reconcile("feed_dingos", feed_dingos)
//!         .cache("calc_weight", calc_weight)
//!         .versioning(Versioning::optimistic("lock_version", "updated_at"))
//!         .depends_on(DINGO))
//!     .dependent(DINGO, RootAccessor::attribute("pen_id", PEN))
//!     .build()?;
//!
//! let engine = Engine::new(Arc::new(MemoryStore::new()), registry);
//! let mut dingo = Record::new(DINGO).with("pen_id", pen_id);
//! engine.save(&mut dingo)?; // mediates the Pen
//! ```
//!
//! # Architecture
//!
//! - `concord-core`: records, identities, errors, the `Persistence` trait
//! - `concord-storage`: `MemoryStore`, an in-memory `Persistence`
//! - `concord-concurrency`: `MediationState` and `VersionGuard`
//! - `concord-engine`: registry, router, coordinator, sessions

pub use concord_concurrency::{
    BumpOutcome, MediationContext, MediationState, RootKey, SkipReason, VersionGuard,
};
pub use concord_core::{
    ConcordError, ConcordResult, EntityId, EntityRef, EntityType, Persistence, Record, Value,
    Versioning, VersioningStatus,
};
pub use concord_engine::{
    DependencyRouter, Engine, MediationConfig, MediationCoordinator, MediationDescriptor,
    MediationMetrics, NamedOperation, Operation, Phase, PhaseRunner, Registry, RegistryBuilder,
    RetryConfig, RootAccessor, RootBuilder, Session, VersioningPolicy, CONFIG_FILE_NAME,
};
pub use concord_storage::{MemoryStore, StoreStats};

/// Everything needed to register types and save records
pub mod prelude {
    pub use crate::{
        ConcordError, ConcordResult, Engine, EntityId, EntityRef, EntityType, MemoryStore,
        Persistence, Record, Registry, RootAccessor, Session, Versioning,
    };
    pub use std::sync::Arc;
}
