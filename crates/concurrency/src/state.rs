//! Execution-path-scoped mediation registry
//!
//! `MediationState` records which roots have an open mediation on one
//! execution path. It is a plain owned value: whoever owns the execution path
//! (a `Session` in the engine) owns its state, so independent logical
//! transactions never observe or block on each other's entries.
//!
//! State transitions for one root key:
//! - absent → `Open` (`open`)
//! - `Open` → `Open { vetoed }` (`mark_vetoed`)
//! - `Open` → removed, returned `Closed` (`close`)
//!
//! Opening an already-open key is an invariant violation (`AlreadyOpen`).

use concord_core::{ConcordError, ConcordResult, EntityId, EntityRef};
use rustc_hash::FxHashMap;
use std::fmt;
use tracing::error;

/// Key identifying a root within one execution path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootKey {
    /// Root with a stable identity
    Persistent(EntityId),
    /// Root without identity; every such mediation gets a fresh key
    Transient(u64),
}

impl fmt::Display for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RootKey::Persistent(id) => write!(f, "{}", id),
            RootKey::Transient(n) => write!(f, "transient-{}", n),
        }
    }
}

/// One open logical transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediationContext {
    key: RootKey,
    root: EntityRef,
    open: bool,
    vetoed: bool,
    owns_transaction: bool,
    depth: usize,
}

impl MediationContext {
    /// Registry key of the root
    pub fn key(&self) -> RootKey {
        self.key
    }

    /// Root entity this context mediates
    pub fn root(&self) -> EntityRef {
        self.root
    }

    /// Whether the context is still registered
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Whether the wrapped save vetoed
    pub fn is_vetoed(&self) -> bool {
        self.vetoed
    }

    /// Whether this mediation began the collaborator transaction
    pub fn owns_transaction(&self) -> bool {
        self.owns_transaction
    }

    /// Number of contexts that were already open when this one opened
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Registry of open mediation contexts for one execution path
#[derive(Debug, Default)]
pub struct MediationState {
    contexts: FxHashMap<RootKey, MediationContext>,
    next_transient: u64,
}

impl MediationState {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry key for a root
    ///
    /// Identity-less roots always receive a fresh transient key, so they never
    /// match an open context.
    pub fn key_for(&mut self, root: &EntityRef) -> RootKey {
        match root.id {
            Some(id) => RootKey::Persistent(id),
            None => {
                self.next_transient += 1;
                RootKey::Transient(self.next_transient)
            }
        }
    }

    /// Whether a mediation for `key` is open on this path
    pub fn is_open(&self, key: &RootKey) -> bool {
        self.contexts.contains_key(key)
    }

    /// Open a context for `key`
    ///
    /// # Errors
    ///
    /// Returns `AlreadyOpen` if `key` is already open. Callers check `is_open`
    /// first; hitting this is a coordinator bug.
    pub fn open(
        &mut self,
        key: RootKey,
        root: EntityRef,
        owns_transaction: bool,
    ) -> ConcordResult<&MediationContext> {
        if self.contexts.contains_key(&key) {
            error!(target: "concord::mediation", root = %key, "Mediation opened twice on one path");
            return Err(ConcordError::AlreadyOpen {
                root: key.to_string(),
            });
        }
        let depth = self.contexts.len();
        let context = self.contexts.entry(key).or_insert(MediationContext {
            key,
            root,
            open: true,
            vetoed: false,
            owns_transaction,
            depth,
        });
        Ok(context)
    }

    /// Record that the wrapped save vetoed
    pub fn mark_vetoed(&mut self, key: &RootKey) {
        if let Some(context) = self.contexts.get_mut(key) {
            context.vetoed = true;
        }
    }

    /// Close and remove the context for `key`, returning it
    pub fn close(&mut self, key: &RootKey) -> Option<MediationContext> {
        self.contexts.remove(key).map(|mut context| {
            context.open = false;
            context
        })
    }

    /// Look up an open context
    pub fn get(&self, key: &RootKey) -> Option<&MediationContext> {
        self.contexts.get(key)
    }

    /// Number of open contexts
    pub fn open_count(&self) -> usize {
        self.contexts.len()
    }

    /// Whether no context is open
    pub fn is_idle(&self) -> bool {
        self.contexts.is_empty()
    }
}
