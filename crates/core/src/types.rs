//! Core identity types for Concord
//!
//! This module defines the foundational types:
//! - EntityId: Stable identity of a persistent entity
//! - EntityType: Static name of an entity type (e.g. `"Pen"`)
//! - EntityRef: Lightweight handle (type + optional identity)

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a persistent entity
///
/// An EntityId is a wrapper around a UUID v4. Records receive their identity
/// when constructed, so the identity is stable before the first save and every
/// mediation keyed on it sees the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Create a new random EntityId using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an EntityId from raw bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Create a deterministic EntityId from a number (useful for fixtures)
    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Parse an EntityId from a string representation
    ///
    /// Returns None if the string is not a valid UUID.
    pub fn from_string(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    /// Get the raw bytes of this EntityId
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of an entity type
///
/// Entity types are declared statically at registration time, so the name is
/// a `&'static str`. Two types are the same type iff their names are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityType(&'static str);

impl EntityType {
    /// Declare an entity type by name
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The type name
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Handle to an entity: its type and (possibly absent) identity
///
/// The coordinator and router key everything off `EntityRef`. An absent
/// identity means the entity has never been assigned one; such an entity
/// cannot be matched against an already-open mediation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityRef {
    /// Declared type of the entity
    pub entity_type: EntityType,
    /// Identity, if assigned
    pub id: Option<EntityId>,
}

impl EntityRef {
    /// Reference an entity with a known identity
    pub fn new(entity_type: EntityType, id: EntityId) -> Self {
        Self {
            entity_type,
            id: Some(id),
        }
    }

    /// Reference an entity that has no identity yet
    pub fn unidentified(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            id: None,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{}#{}", self.entity_type, id),
            None => write!(f, "{}#<new>", self.entity_type),
        }
    }
}
