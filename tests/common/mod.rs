//! Shared fixtures for the integration suites
//!
//! The "farm": a `Pen` root owning `Dingo` and `Biscuit` dependents. Phase
//! operations append their names to a shared call log so tests can assert
//! exactly which operations ran and in what order.

#![allow(dead_code)]

use concord::prelude::*;
use concord::{RegistryBuilder, RootBuilder};
use parking_lot::Mutex;
use std::sync::Once;

pub const PEN: EntityType = EntityType::new("Pen");
pub const DINGO: EntityType = EntityType::new("Dingo");
pub const BISCUIT: EntityType = EntityType::new("Biscuit");

pub const LOCK: &str = "lock_version";
pub const UPDATED_AT: &str = "updated_at";

pub type CallLog = Arc<Mutex<Vec<&'static str>>>;

static INIT_TRACING: Once = Once::new();

/// Install a test subscriber once; `RUST_LOG` controls verbosity
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .try_init();
    });
}

/// Operation that only records its name
pub fn recorder(
    log: &CallLog,
    name: &'static str,
) -> impl Fn(&mut Session<'_, MemoryStore>, &EntityRef) -> ConcordResult<()> + Send + Sync + 'static
{
    let log = Arc::clone(log);
    move |_, _| {
        log.lock().push(name);
        Ok(())
    }
}

/// Operation that records its name and fails
pub fn failing(
    log: &CallLog,
    name: &'static str,
) -> impl Fn(&mut Session<'_, MemoryStore>, &EntityRef) -> ConcordResult<()> + Send + Sync + 'static
{
    let log = Arc::clone(log);
    move |_, _| {
        log.lock().push(name);
        Err(ConcordError::phase_failure(name, "refused"))
    }
}

/// Reconciliation: take one unit of supply from the pen
pub fn adjust_supply(
    log: &CallLog,
) -> impl Fn(&mut Session<'_, MemoryStore>, &EntityRef) -> ConcordResult<()> + Send + Sync + 'static
{
    let log = Arc::clone(log);
    move |session, root| {
        log.lock().push("adjust_supply");
        let id = root
            .id
            .ok_or_else(|| ConcordError::invalid_input("pen without identity"))?;
        let mut pen = session.fetch(&id)?;
        let supply = pen.int("supply").unwrap_or(0);
        pen.set("supply", supply - 1);
        session.save(&mut pen)?;
        Ok(())
    }
}

/// Caching: weight is derived from the remaining supply
pub fn calc_weight(
    log: &CallLog,
) -> impl Fn(&mut Session<'_, MemoryStore>, &EntityRef) -> ConcordResult<()> + Send + Sync + 'static
{
    let log = Arc::clone(log);
    move |session, root| {
        log.lock().push("calc_weight");
        let id = root
            .id
            .ok_or_else(|| ConcordError::invalid_input("pen without identity"))?;
        let mut pen = session.fetch(&id)?;
        let supply = pen.int("supply").unwrap_or(0);
        pen.set("weight", supply * 2);
        session.save(&mut pen)?;
        Ok(())
    }
}

/// Registry builder with the farm's dependents already declared
pub fn farm_registry<F>(declare_pen: F) -> RegistryBuilder<MemoryStore>
where
    F: FnOnce(RootBuilder<MemoryStore>) -> RootBuilder<MemoryStore>,
{
    Registry::builder()
        .root(PEN, |pen| declare_pen(pen.depends_on(DINGO).depends_on(BISCUIT)))
        .dependent(DINGO, RootAccessor::attribute("pen_id", PEN))
        .dependent(BISCUIT, RootAccessor::attribute("pen_id", PEN))
}

/// The farm: engine, call log and seeding helpers
pub struct Farm {
    pub engine: Engine<MemoryStore>,
    pub log: CallLog,
}

impl Farm {
    /// Standard farm with full optimistic locking
    pub fn new() -> Self {
        Self::with_versioning(Versioning::optimistic(LOCK, UPDATED_AT))
    }

    /// Standard phases with the given versioning declaration
    pub fn with_versioning(versioning: Versioning) -> Self {
        init_tracing();
        let log = CallLog::default();
        let registry = farm_registry(|pen| {
            pen.reconcile("adjust_supply", adjust_supply(&log))
                .reconcile("feed_dingos", recorder(&log, "feed_dingos"))
                .cache("calc_weight", calc_weight(&log))
                .versioning(versioning)
        })
        .build()
        .expect("farm registry is valid");
        Self {
            engine: Engine::new(Arc::new(MemoryStore::new()), registry),
            log,
        }
    }

    /// Farm around an engine built by the test
    pub fn from_engine(engine: Engine<MemoryStore>, log: CallLog) -> Self {
        init_tracing();
        Self { engine, log }
    }

    pub fn store(&self) -> &MemoryStore {
        self.engine.store()
    }

    /// Commit a pen with supply 10 and lock version 0
    pub fn seed_pen(&self) -> EntityId {
        self.store().seed(
            Record::new(PEN)
                .with("supply", 10)
                .with(LOCK, 0)
                .with("name", "north paddock"),
        )
    }

    pub fn dingo(&self, pen: EntityId) -> Record {
        Record::new(DINGO).with("pen_id", pen).with("hunger", 3)
    }

    pub fn biscuit(&self, pen: EntityId) -> Record {
        Record::new(BISCUIT).with("pen_id", pen).with("grams", 40)
    }

    /// Committed pen
    pub fn pen(&self, id: EntityId) -> Record {
        self.store().get(&id).expect("pen exists")
    }

    pub fn lock_version(&self, id: EntityId) -> i64 {
        self.pen(id).int(LOCK).expect("pen has a lock version")
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.log.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.log.lock().clear();
    }
}
