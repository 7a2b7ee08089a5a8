//! Engine: store, registry and coordinator bundled for sessions
//!
//! The engine is immutable after construction and shared by reference; each
//! execution path opens its own `Session` from it.

use crate::config::MediationConfig;
use crate::coordinator::{MediationCoordinator, MediationMetrics};
use crate::registry::Registry;
use crate::retry::RetryConfig;
use crate::router::DependencyRouter;
use crate::session::Session;
use concord_core::{ConcordError, ConcordResult, Persistence, Record};
use std::sync::Arc;
use tracing::{debug, warn};

/// Mediation engine over one store
pub struct Engine<P: Persistence> {
    store: Arc<P>,
    registry: Registry<P>,
    coordinator: MediationCoordinator,
    router: DependencyRouter,
    config: MediationConfig,
}

impl<P: Persistence> Engine<P> {
    /// Create an engine with the default configuration
    pub fn new(store: Arc<P>, registry: Registry<P>) -> Self {
        Self::with_config(store, registry, MediationConfig::default())
    }

    /// Create an engine with an explicit configuration
    ///
    /// The registry should have been built with the same configuration so the
    /// versioning policy matches.
    pub fn with_config(store: Arc<P>, registry: Registry<P>, config: MediationConfig) -> Self {
        Self {
            store,
            registry,
            coordinator: MediationCoordinator::new(),
            router: DependencyRouter::new(config.strict_registration),
            config,
        }
    }

    /// Open a new execution path
    pub fn session(&self) -> Session<'_, P> {
        Session::new(self)
    }

    /// Save one record in a fresh session
    pub fn save(&self, record: &mut Record) -> ConcordResult<bool> {
        self.session().save(record)
    }

    /// Run a logical transaction in a fresh session
    ///
    /// Everything `f` saves shares one transaction, committed when `f`
    /// returns `Ok`.
    pub fn run<T, F>(&self, f: F) -> ConcordResult<T>
    where
        F: for<'s> FnOnce(&mut Session<'s, P>) -> ConcordResult<T>,
    {
        self.session().transaction(f)
    }

    /// Like `run`, re-running `f` in a fresh session on `StaleVersion`
    ///
    /// Other errors, and the conflict after the last attempt, are returned.
    pub fn run_with_retry<T, F>(&self, config: RetryConfig, f: F) -> ConcordResult<T>
    where
        F: for<'s> Fn(&mut Session<'s, P>) -> ConcordResult<T>,
    {
        let mut last_error = None;

        for attempt in 0..=config.max_retries {
            match self.session().transaction(&f) {
                Ok(value) => return Ok(value),
                Err(e) if config.should_retry(&e, attempt) => {
                    debug!(target: "concord::mediation", attempt, error = %e, "Retrying after conflict");
                    last_error = Some(e);
                    std::thread::sleep(config.backoff(attempt));
                }
                Err(e) => {
                    if e.is_conflict() {
                        warn!(target: "concord::mediation", attempts = attempt + 1, "Retries exhausted");
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ConcordError::internal("retry loop exited without a result")))
    }

    /// Mediation counters
    pub fn metrics(&self) -> MediationMetrics {
        self.coordinator.metrics()
    }

    /// The underlying store
    pub fn store(&self) -> &P {
        &self.store
    }

    /// Shared handle to the store
    pub fn store_handle(&self) -> Arc<P> {
        Arc::clone(&self.store)
    }

    /// Registered descriptors
    pub fn registry(&self) -> &Registry<P> {
        &self.registry
    }

    /// Active configuration
    pub fn config(&self) -> &MediationConfig {
        &self.config
    }

    /// The coordinator driving mediations
    pub fn coordinator(&self) -> &MediationCoordinator {
        &self.coordinator
    }

    pub(crate) fn router(&self) -> &DependencyRouter {
        &self.router
    }
}
