//! Core types and traits for Concord
//!
//! This crate defines the foundational types used throughout the system:
//! - EntityId / EntityType / EntityRef: entity identity
//! - Value / Record: entity data
//! - Versioning: optimistic-lock attribute declarations
//! - ConcordError: error type hierarchy
//! - Persistence: the collaborator trait the mediation layer drives

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod record;
pub mod traits;
pub mod types;
pub mod value;
pub mod versioning;

pub use error::{ConcordError, ConcordResult};
pub use record::Record;
pub use traits::Persistence;
pub use types::{EntityId, EntityRef, EntityType};
pub use value::Value;
pub use versioning::{Versioning, VersioningStatus};
