//! Persistent entity records
//!
//! A `Record` is the unit the persistence collaborator reads and writes: a
//! declared type, an identity, and a map of named attributes.

use crate::types::{EntityId, EntityRef, EntityType};
use crate::value::Value;
use std::collections::BTreeMap;

/// An entity instance
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    entity_type: EntityType,
    id: Option<EntityId>,
    attrs: BTreeMap<String, Value>,
}

impl Record {
    /// Create a record with a fresh identity
    pub fn new(entity_type: EntityType) -> Self {
        Self::with_id(entity_type, EntityId::new())
    }

    /// Create a record with a known identity
    pub fn with_id(entity_type: EntityType, id: EntityId) -> Self {
        Self {
            entity_type,
            id: Some(id),
            attrs: BTreeMap::new(),
        }
    }

    /// Create a record that has no identity yet
    ///
    /// The collaborator assigns one on the first save.
    pub fn unsaved(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            id: None,
            attrs: BTreeMap::new(),
        }
    }

    /// Declared type
    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// Identity, if assigned
    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    /// Handle for this record
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef {
            entity_type: self.entity_type,
            id: self.id,
        }
    }

    /// Assign a fresh identity unless one is already present; returns it
    pub fn ensure_id(&mut self) -> EntityId {
        *self.id.get_or_insert_with(EntityId::new)
    }

    /// Builder-style attribute assignment
    pub fn with(mut self, attr: &str, value: impl Into<Value>) -> Self {
        self.set(attr, value);
        self
    }

    /// Set an attribute, returning the previous value
    pub fn set(&mut self, attr: &str, value: impl Into<Value>) -> Option<Value> {
        self.attrs.insert(attr.to_string(), value.into())
    }

    /// Remove an attribute
    pub fn remove(&mut self, attr: &str) -> Option<Value> {
        self.attrs.remove(attr)
    }

    /// Read an attribute
    pub fn get(&self, attr: &str) -> Option<&Value> {
        self.attrs.get(attr)
    }

    /// Read an `Int` attribute
    pub fn int(&self, attr: &str) -> Option<i64> {
        self.get(attr).and_then(Value::as_int)
    }

    /// Read a `Ref` attribute
    pub fn reference(&self, attr: &str) -> Option<EntityId> {
        self.get(attr).and_then(Value::as_ref_id)
    }

    /// Iterate attributes in name order
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v))
    }
}
