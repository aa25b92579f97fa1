//! Validated record store for the StarDB `services` collection.
//! Every write is checked against the collection schema before it is persisted.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod schema;
pub mod seed;
pub mod service;

pub use config::{ConfigError, StoreConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::service::{
    RecordId, Revenue, ServiceRecord, StoredService, ValidationError, NAME_MAX_CHARS,
};
pub use repo::service_repo::{
    RepoError, RepoResult, SchemaStatus, ServiceRepository, SqliteServiceRepository,
};
pub use schema::{services_schema, BsonType, CollectionSchema, FieldSpec, SERVICES_COLLECTION};
pub use seed::{seed_candidates, seed_services, SeedOutcome};
pub use service::record_store::{BatchViolation, RecordStore, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
