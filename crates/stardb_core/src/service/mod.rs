//! Core use-case services.
//!
//! # Responsibility
//! - Expose the validated record store operations to callers.
//! - Keep CLI and other callers decoupled from storage details.

pub mod record_store;
