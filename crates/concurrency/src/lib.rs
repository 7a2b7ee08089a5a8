//! Concurrency layer for Concord
//!
//! This crate implements the two pieces of mediation that deal with
//! concurrent logical transactions:
//! - MediationState: execution-path-scoped registry of open mediations
//!   (reentrancy detection without process-global state)
//! - VersionGuard: the single optimistic-lock bump per mediation, with
//!   conflicts surfaced as `StaleVersion`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod state;
pub mod version;

pub use state::{MediationContext, MediationState, RootKey};
pub use version::{BumpOutcome, SkipReason, VersionGuard};
