//! Storage layer for Concord
//!
//! This crate implements the in-memory persistence collaborator with:
//! - MemoryStore: DashMap-backed committed records
//! - MemoryTxn: snapshot-on-first-read transactions with buffered writes
//! - Validators that veto saves instead of raising
//! - Optimistic-lock touch with first-committer-wins commit validation
//!
//! The mediation layer only depends on the `Persistence` trait; this store is
//! the implementation used by the engine's tests and by embedders that do not
//! bring their own.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod store;
pub mod txn;

pub use store::{MemoryStore, StoreStats, Validator};
pub use txn::MemoryTxn;
