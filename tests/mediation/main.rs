//! Mediation Integration Tests
//!
//! End-to-end behaviour of mediated saves over the farm fixture
//! (a Pen root with Dingo and Biscuit dependents).

#[path = "../common/mod.rs"]
mod common;

mod concurrent_sessions;
mod nesting;
mod registration;
