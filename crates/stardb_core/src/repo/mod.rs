//! Repository layer over the backing store.
//!
//! # Responsibility
//! - Define the persistence contract used by the record store.
//! - Keep SQL details out of validation and orchestration code.
//!
//! # Invariants
//! - Repository writes enforce `ServiceRecord::validate()` before persistence.
//! - Collection registration is idempotent for an identical validator.

pub mod service_repo;
