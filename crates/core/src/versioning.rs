//! Optimistic-lock declarations
//!
//! An entity type opts into version bumping by declaring both a lock-counter
//! attribute and a last-modified timestamp attribute. The bump is a "touch" of
//! the timestamp, which the collaborator turns into an increment-and-compare of
//! the counter. Without a timestamp there is nothing to touch.

use std::fmt;

/// Versioning attributes declared for an entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Versioning {
    lock_attribute: Option<&'static str>,
    timestamp_attribute: Option<&'static str>,
}

/// What a `Versioning` declaration permits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersioningStatus {
    /// Neither attribute declared
    Disabled,
    /// Counter declared, timestamp missing (bump silently does nothing)
    CounterWithoutTimestamp,
    /// Timestamp declared, counter missing
    TimestampOnly,
    /// Both declared; bumping is possible
    Enabled,
}

impl Versioning {
    /// No versioning
    pub const fn none() -> Self {
        Self {
            lock_attribute: None,
            timestamp_attribute: None,
        }
    }

    /// Counter plus timestamp: bumps are performed
    pub const fn optimistic(lock_attribute: &'static str, timestamp_attribute: &'static str) -> Self {
        Self {
            lock_attribute: Some(lock_attribute),
            timestamp_attribute: Some(timestamp_attribute),
        }
    }

    /// Counter only
    pub const fn lock_only(lock_attribute: &'static str) -> Self {
        Self {
            lock_attribute: Some(lock_attribute),
            timestamp_attribute: None,
        }
    }

    /// Timestamp only
    pub const fn timestamp_only(timestamp_attribute: &'static str) -> Self {
        Self {
            lock_attribute: None,
            timestamp_attribute: Some(timestamp_attribute),
        }
    }

    /// Declared lock-counter attribute
    pub fn lock_attribute(&self) -> Option<&'static str> {
        self.lock_attribute
    }

    /// Declared timestamp attribute
    pub fn timestamp_attribute(&self) -> Option<&'static str> {
        self.timestamp_attribute
    }

    /// Classify the declaration
    pub fn status(&self) -> VersioningStatus {
        match (self.lock_attribute, self.timestamp_attribute) {
            (None, None) => VersioningStatus::Disabled,
            (Some(_), None) => VersioningStatus::CounterWithoutTimestamp,
            (None, Some(_)) => VersioningStatus::TimestampOnly,
            (Some(_), Some(_)) => VersioningStatus::Enabled,
        }
    }
}

impl fmt::Display for VersioningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VersioningStatus::Disabled => "disabled",
            VersioningStatus::CounterWithoutTimestamp => "counter-without-timestamp",
            VersioningStatus::TimestampOnly => "timestamp-only",
            VersioningStatus::Enabled => "enabled",
        };
        f.write_str(s)
    }
}
