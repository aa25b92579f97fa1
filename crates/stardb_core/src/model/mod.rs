//! Domain model for the `services` collection.
//!
//! # Responsibility
//! - Define the typed record persisted by the store.
//! - Own record-level invariants shared by write and read paths.
//!
//! # Invariants
//! - Every stored record carries `name`, `subscribers` and `revenue`.
//! - Currency values never pass through binary floating point.

pub mod service;
