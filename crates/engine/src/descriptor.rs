//! Per-type mediation descriptors
//!
//! A `MediationDescriptor` is created once at registration and never changes
//! afterwards. Operations are typed callables captured at registration; the
//! names they carry exist for logs and diagnostics only.

use crate::session::Session;
use concord_core::{ConcordResult, EntityRef, EntityType, Persistence, Record, Versioning};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Callable run against the root entity during a phase
pub type Operation<P> =
    Arc<dyn Fn(&mut Session<'_, P>, &EntityRef) -> ConcordResult<()> + Send + Sync>;

/// Post-save phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Restores cross-entity invariants
    Reconciliation,
    /// Recomputes derived values from reconciled state
    Caching,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Reconciliation => f.write_str("reconciliation"),
            Phase::Caching => f.write_str("caching"),
        }
    }
}

/// An operation together with its declared name
pub struct NamedOperation<P: Persistence> {
    name: &'static str,
    operation: Operation<P>,
}

impl<P: Persistence> NamedOperation<P> {
    /// Wrap a callable
    pub fn new<F>(name: &'static str, operation: F) -> Self
    where
        F: Fn(&mut Session<'_, P>, &EntityRef) -> ConcordResult<()> + Send + Sync + 'static,
    {
        Self {
            name,
            operation: Arc::new(operation),
        }
    }

    /// Declared name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run the operation
    pub fn call(&self, session: &mut Session<'_, P>, root: &EntityRef) -> ConcordResult<()> {
        (self.operation)(session, root)
    }
}

impl<P: Persistence> Clone for NamedOperation<P> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            operation: Arc::clone(&self.operation),
        }
    }
}

impl<P: Persistence> fmt::Debug for NamedOperation<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NamedOperation").field(&self.name).finish()
    }
}

/// How a dependent instance finds its owning root
#[derive(Clone)]
pub enum RootAccessor {
    /// The root is referenced by a `Ref` attribute on the dependent
    Attribute {
        /// Attribute holding the root's identity
        attribute: &'static str,
        /// Type of the root
        root_type: EntityType,
    },
    /// Arbitrary structural lookup; must not perform I/O
    Custom(Arc<dyn Fn(&Record) -> Option<EntityRef> + Send + Sync>),
}

impl RootAccessor {
    /// Root referenced by a `Ref` attribute
    pub fn attribute(attribute: &'static str, root_type: EntityType) -> Self {
        RootAccessor::Attribute {
            attribute,
            root_type,
        }
    }

    /// Root computed by a closure
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Record) -> Option<EntityRef> + Send + Sync + 'static,
    {
        RootAccessor::Custom(Arc::new(f))
    }

    /// Follow the accessor; `None` when the dependent has no owner
    pub fn resolve(&self, dependent: &Record) -> Option<EntityRef> {
        match self {
            RootAccessor::Attribute {
                attribute,
                root_type,
            } => dependent
                .reference(attribute)
                .map(|id| EntityRef::new(*root_type, id)),
            RootAccessor::Custom(f) => f(dependent),
        }
    }

    /// Root type, when statically known
    pub fn root_type(&self) -> Option<EntityType> {
        match self {
            RootAccessor::Attribute { root_type, .. } => Some(*root_type),
            RootAccessor::Custom(_) => None,
        }
    }
}

impl fmt::Debug for RootAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RootAccessor::Attribute {
                attribute,
                root_type,
            } => f
                .debug_struct("Attribute")
                .field("attribute", attribute)
                .field("root_type", root_type)
                .finish(),
            RootAccessor::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Immutable mediation configuration for one entity type
pub struct MediationDescriptor<P: Persistence> {
    pub(crate) entity_type: EntityType,
    pub(crate) reconciliations: Vec<NamedOperation<P>>,
    pub(crate) caches: Vec<NamedOperation<P>>,
    pub(crate) dependencies: BTreeSet<EntityType>,
    pub(crate) root_accessor: Option<RootAccessor>,
    pub(crate) versioning: Versioning,
}

impl<P: Persistence> MediationDescriptor<P> {
    pub(crate) fn new(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            reconciliations: Vec::new(),
            caches: Vec::new(),
            dependencies: BTreeSet::new(),
            root_accessor: None,
            versioning: Versioning::none(),
        }
    }

    /// The described type
    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// Operations of `phase`, in declared order
    pub fn operations(&self, phase: Phase) -> &[NamedOperation<P>] {
        match phase {
            Phase::Reconciliation => &self.reconciliations,
            Phase::Caching => &self.caches,
        }
    }

    /// Declared dependent types
    pub fn dependencies(&self) -> &BTreeSet<EntityType> {
        &self.dependencies
    }

    /// Accessor to the owning root (dependents only)
    pub fn root_accessor(&self) -> Option<&RootAccessor> {
        self.root_accessor.as_ref()
    }

    /// Whether saves of this type route to another root
    pub fn is_dependent(&self) -> bool {
        self.root_accessor.is_some()
    }

    /// Versioning declaration
    pub fn versioning(&self) -> Versioning {
        self.versioning
    }
}

impl<P: Persistence> fmt::Debug for MediationDescriptor<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediationDescriptor")
            .field("entity_type", &self.entity_type)
            .field("reconciliations", &self.reconciliations)
            .field("caches", &self.caches)
            .field("dependencies", &self.dependencies)
            .field("root_accessor", &self.root_accessor)
            .field("versioning", &self.versioning)
            .finish()
    }
}
