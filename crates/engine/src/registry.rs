//! Static registration of mediated types
//!
//! Registration happens once, before any session exists. `RegistryBuilder`
//! collects root and dependent declarations, validates that the dependency
//! graph is consistent, applies the configured versioning policy, and freezes
//! everything into an immutable `Registry`.
//!
//! # Example
//!
//! ```text
//! let registry = Registry::builder()
//!     .root(PEN, |pen| pen
//!         .reconcile("adjust_supply", adjust_supply)
//!         .reconcile("feed_dingos", feed_dingos)
//!         .cache("calc_weight", calc_weight)
//!         .versioning(Versioning::optimistic("lock_version", "updated_at"))
//!         .depends_on(DINGO))
//!     .dependent(DINGO, RootAccessor::attribute("pen_id", PEN))
//!     .build()?;
//! ```

use crate::config::{MediationConfig, VersioningPolicy};
use crate::descriptor::{MediationDescriptor, NamedOperation, RootAccessor};
use crate::session::Session;
use concord_core::{
    ConcordError, ConcordResult, EntityRef, EntityType, Persistence, Versioning,
    VersioningStatus,
};
use rustc_hash::FxHashMap;
use std::fmt;
use tracing::{info, warn};

/// Frozen set of mediation descriptors
pub struct Registry<P: Persistence> {
    descriptors: FxHashMap<EntityType, MediationDescriptor<P>>,
    diagnostics: Vec<ConcordError>,
}

impl<P: Persistence> Registry<P> {
    /// Start a registration
    pub fn builder() -> RegistryBuilder<P> {
        RegistryBuilder::new()
    }

    /// An empty registry: every type is its own root with no phases
    pub fn empty() -> Self {
        Self {
            descriptors: FxHashMap::default(),
            diagnostics: Vec::new(),
        }
    }

    /// Descriptor for a type, if registered
    pub fn descriptor(&self, entity_type: EntityType) -> Option<&MediationDescriptor<P>> {
        self.descriptors.get(&entity_type)
    }

    /// Whether a type is registered
    pub fn contains(&self, entity_type: EntityType) -> bool {
        self.descriptors.contains_key(&entity_type)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Non-fatal issues found at registration
    pub fn diagnostics(&self) -> &[ConcordError] {
        &self.diagnostics
    }
}

impl<P: Persistence> fmt::Debug for Registry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.descriptors.keys().collect::<Vec<_>>())
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}

/// Declarations for one root type
pub struct RootBuilder<P: Persistence> {
    descriptor: MediationDescriptor<P>,
}

impl<P: Persistence> RootBuilder<P> {
    /// Append a reconciliation operation
    pub fn reconcile<F>(mut self, name: &'static str, operation: F) -> Self
    where
        F: Fn(&mut Session<'_, P>, &EntityRef) -> ConcordResult<()> + Send + Sync + 'static,
    {
        self.descriptor
            .reconciliations
            .push(NamedOperation::new(name, operation));
        self
    }

    /// Append a caching operation
    pub fn cache<F>(mut self, name: &'static str, operation: F) -> Self
    where
        F: Fn(&mut Session<'_, P>, &EntityRef) -> ConcordResult<()> + Send + Sync + 'static,
    {
        self.descriptor.caches.push(NamedOperation::new(name, operation));
        self
    }

    /// Declare a dependent type
    pub fn depends_on(mut self, dependent: EntityType) -> Self {
        self.descriptor.dependencies.insert(dependent);
        self
    }

    /// Declare the versioning attributes
    pub fn versioning(mut self, versioning: Versioning) -> Self {
        self.descriptor.versioning = versioning;
        self
    }
}

/// Collects declarations and validates them on `build`
pub struct RegistryBuilder<P: Persistence> {
    descriptors: FxHashMap<EntityType, MediationDescriptor<P>>,
    /// Declaration order, for deterministic validation
    order: Vec<EntityType>,
    errors: Vec<ConcordError>,
}

impl<P: Persistence> RegistryBuilder<P> {
    fn new() -> Self {
        Self {
            descriptors: FxHashMap::default(),
            order: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn insert(&mut self, descriptor: MediationDescriptor<P>) {
        let entity_type = descriptor.entity_type;
        if self.descriptors.contains_key(&entity_type) {
            self.errors
                .push(ConcordError::DuplicateRegistration(entity_type));
            return;
        }
        self.order.push(entity_type);
        self.descriptors.insert(entity_type, descriptor);
    }

    /// Register a mediated root type
    pub fn root<F>(mut self, entity_type: EntityType, declare: F) -> Self
    where
        F: FnOnce(RootBuilder<P>) -> RootBuilder<P>,
    {
        let builder = declare(RootBuilder {
            descriptor: MediationDescriptor::new(entity_type),
        });
        self.insert(builder.descriptor);
        self
    }

    /// Register a dependent type and how to reach its root
    pub fn dependent(mut self, entity_type: EntityType, accessor: RootAccessor) -> Self {
        let mut descriptor = MediationDescriptor::new(entity_type);
        descriptor.root_accessor = Some(accessor);
        self.insert(descriptor);
        self
    }

    /// Validate with the default configuration
    pub fn build(self) -> ConcordResult<Registry<P>> {
        self.build_with(&MediationConfig::default())
    }

    /// Validate and freeze
    ///
    /// # Errors
    ///
    /// - `DuplicateRegistration` if a type was declared twice
    /// - `InvalidRegistration` if a declared dependency has no accessor, an
    ///   accessor targets a different root, or a dependent is never declared
    /// - `MisconfiguredVersioning` under `VersioningPolicy::Deny`
    pub fn build_with(mut self, config: &MediationConfig) -> ConcordResult<Registry<P>> {
        if let Some(err) = self.errors.drain(..).next() {
            return Err(err);
        }

        for entity_type in &self.order {
            let descriptor = &self.descriptors[entity_type];
            for dependency in &descriptor.dependencies {
                let accessor = self
                    .descriptors
                    .get(dependency)
                    .and_then(|d| d.root_accessor.as_ref())
                    .ok_or_else(|| ConcordError::InvalidRegistration {
                        entity_type: *dependency,
                        reason: format!(
                            "declared as a dependency of {} but has no root accessor",
                            entity_type
                        ),
                    })?;
                if let Some(target) = accessor.root_type() {
                    if target != *entity_type {
                        return Err(ConcordError::InvalidRegistration {
                            entity_type: *dependency,
                            reason: format!(
                                "declared as a dependency of {} but its accessor resolves to {}",
                                entity_type, target
                            ),
                        });
                    }
                }
            }
        }

        for entity_type in &self.order {
            let descriptor = &self.descriptors[entity_type];
            if !descriptor.is_dependent() {
                continue;
            }
            let declared = self
                .descriptors
                .values()
                .any(|d| d.dependencies.contains(entity_type));
            if !declared {
                return Err(ConcordError::InvalidRegistration {
                    entity_type: *entity_type,
                    reason: "has a root accessor but no root declares it as a dependency"
                        .to_string(),
                });
            }
        }

        let mut diagnostics = Vec::new();
        for entity_type in &self.order {
            let versioning = self.descriptors[entity_type].versioning;
            if versioning.status() != VersioningStatus::CounterWithoutTimestamp {
                continue;
            }
            let issue = ConcordError::MisconfiguredVersioning {
                entity_type: *entity_type,
                lock_attribute: versioning.lock_attribute().unwrap_or_default().to_string(),
            };
            match config.versioning_policy {
                VersioningPolicy::Deny => return Err(issue),
                VersioningPolicy::Warn => {
                    warn!(
                        target: "concord::registry",
                        entity_type = %entity_type,
                        "Lock counter declared without timestamp; version bumps will be skipped"
                    );
                    diagnostics.push(issue);
                }
                VersioningPolicy::Off => {}
            }
        }

        info!(
            target: "concord::registry",
            types = self.descriptors.len(),
            diagnostics = diagnostics.len(),
            "Registry built"
        );

        Ok(Registry {
            descriptors: self.descriptors,
            diagnostics,
        })
    }
}
