//! Mediation engine for Concord
//!
//! This crate wires the mediation lifecycle together:
//! - Registry: static registration of roots, dependents and their phases
//! - DependencyRouter: dependent saves resolve to their root
//! - MediationCoordinator: open/join, phases, version bump, commit/rollback
//! - PhaseRunner: ordered, fail-fast execution of one phase
//! - Session: explicit execution-path state (no thread-locals)
//! - Engine: shared entry point, configuration and caller-driven retry

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod coordinator;
pub mod descriptor;
pub mod engine;
pub mod phase;
pub mod registry;
pub mod retry;
pub mod router;
pub mod session;

pub use config::{MediationConfig, VersioningPolicy, CONFIG_FILE_NAME};
pub use coordinator::{MediationCoordinator, MediationMetrics};
pub use descriptor::{MediationDescriptor, NamedOperation, Operation, Phase, RootAccessor};
pub use engine::Engine;
pub use phase::PhaseRunner;
pub use registry::{Registry, RegistryBuilder, RootBuilder};
pub use retry::RetryConfig;
pub use router::DependencyRouter;
pub use session::Session;
