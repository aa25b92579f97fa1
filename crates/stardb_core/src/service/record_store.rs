//! Validated record store for the `services` collection.
//!
//! # Responsibility
//! - Validate dynamic candidates against the `services` schema.
//! - Persist accepted records and return their ids.
//! - Register the schema idempotently.
//!
//! # Invariants
//! - Nothing reaches the repository before the whole candidate (or the whole
//!   batch) has passed validation.
//! - Validation errors are surfaced as-is; candidates are never coerced.
//! - Storage failures propagate unchanged, without retries.

use crate::model::service::{RecordId, ServiceRecord, StoredService, ValidationError};
use crate::repo::service_repo::{RepoError, SchemaStatus, ServiceRepository};
use crate::schema::{
    services_schema, validate_candidate, BsonType, CollectionSchema, FieldValue,
    SchemaDefinitionError, ValidatedDocument,
};
use log::{info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// One rejected candidate inside a bulk insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchViolation {
    /// Zero-based index of the candidate in the submitted batch.
    pub position: usize,
    pub error: ValidationError,
}

impl Display for BatchViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "candidate #{}: {}", self.position, self.error)
    }
}

#[derive(Debug)]
pub enum StoreError {
    /// Candidate is not a document.
    InvalidDocument { found: &'static str },
    MissingField(String),
    InvalidField {
        field: String,
        reason: String,
        value: Value,
    },
    /// Every violation found in a rejected batch, in input order.
    Batch(Vec<BatchViolation>),
    SchemaConflict {
        collection: String,
        expected: Value,
        found: Value,
    },
    /// The declared schema itself is malformed.
    InvalidSchema(SchemaDefinitionError),
    StorageFailure(RepoError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDocument { found } => {
                write!(f, "candidate must be a document, found {found}")
            }
            Self::MissingField(field) => write!(f, "missing required field `{field}`"),
            Self::InvalidField {
                field,
                reason,
                value,
            } => write!(f, "invalid field `{field}`: {reason} (got {value})"),
            Self::Batch(violations) => {
                write!(f, "batch rejected with {} violation(s)", violations.len())?;
                for violation in violations {
                    write!(f, "; {violation}")?;
                }
                Ok(())
            }
            Self::SchemaConflict { collection, .. } => write!(
                f,
                "collection `{collection}` already exists with an incompatible validator"
            ),
            Self::InvalidSchema(err) => write!(f, "invalid schema declaration: {err}"),
            Self::StorageFailure(err) => write!(f, "storage failure: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidSchema(err) => Some(err),
            Self::StorageFailure(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        match value {
            ValidationError::InvalidDocument { found } => Self::InvalidDocument { found },
            ValidationError::MissingField(field) => Self::MissingField(field),
            ValidationError::InvalidField {
                field,
                reason,
                value,
            } => Self::InvalidField {
                field,
                reason,
                value,
            },
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::SchemaConflict {
                collection,
                expected,
                found,
            } => Self::SchemaConflict {
                collection,
                expected,
                found,
            },
            other => Self::StorageFailure(other),
        }
    }
}

/// Validated record store over a `ServiceRepository`.
pub struct RecordStore<R: ServiceRepository> {
    repo: R,
    schema: CollectionSchema,
}

impl<R: ServiceRepository> RecordStore<R> {
    /// Creates a store enforcing the `services` schema.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            schema: services_schema(),
        }
    }

    /// The schema this store enforces.
    pub fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    /// Registers the schema with the backing store.
    ///
    /// Returns `Unchanged` when an equivalent schema already exists and
    /// `SchemaConflict` when a different one does.
    pub fn ensure_schema(&mut self) -> StoreResult<SchemaStatus> {
        self.schema.check().map_err(StoreError::InvalidSchema)?;
        match self.repo.ensure_collection(&self.schema) {
            Ok(status) => {
                info!(
                    "event=schema_ensure module=store status=ok collection={} outcome={:?}",
                    self.schema.collection, status
                );
                Ok(status)
            }
            Err(err) => {
                warn!(
                    "event=schema_ensure module=store status=error collection={} error={}",
                    self.schema.collection, err
                );
                Err(err.into())
            }
        }
    }

    /// Validates one candidate and persists it.
    pub fn insert(&mut self, candidate: &Value) -> StoreResult<RecordId> {
        let record = match self.validate(candidate) {
            Ok(record) => record,
            Err(err) => {
                info!(
                    "event=record_insert module=store status=rejected field={}",
                    err.field().unwrap_or("-")
                );
                return Err(err.into());
            }
        };

        let id = self.repo.insert_record(&record)?;
        info!("event=record_insert module=store status=ok id={id}");
        Ok(id)
    }

    /// Validates every candidate, then persists all of them or none.
    ///
    /// On rejection the error lists every violation with its position.
    pub fn bulk_insert(&mut self, candidates: &[Value]) -> StoreResult<Vec<RecordId>> {
        let mut records = Vec::with_capacity(candidates.len());
        let mut violations = Vec::new();

        for (position, candidate) in candidates.iter().enumerate() {
            match self.validate(candidate) {
                Ok(record) => records.push(record),
                Err(error) => violations.push(BatchViolation { position, error }),
            }
        }

        if !violations.is_empty() {
            info!(
                "event=record_bulk_insert module=store status=rejected candidates={} violations={}",
                candidates.len(),
                violations.len()
            );
            return Err(StoreError::Batch(violations));
        }
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let ids = self.repo.insert_records(&records)?;
        info!(
            "event=record_bulk_insert module=store status=ok inserted={}",
            ids.len()
        );
        Ok(ids)
    }

    /// Reads one record back by id.
    pub fn get(&self, id: RecordId) -> StoreResult<Option<ServiceRecord>> {
        Ok(self.repo.get_record(id)?)
    }

    /// Lists every stored record in insertion order.
    pub fn list(&self) -> StoreResult<Vec<StoredService>> {
        Ok(self.repo.list_records()?)
    }

    pub fn count(&self) -> StoreResult<u64> {
        Ok(self.repo.count_records()?)
    }

    fn validate(&self, candidate: &Value) -> Result<ServiceRecord, ValidationError> {
        let document = validate_candidate(&self.schema, candidate)?;
        record_from_document(document)
    }
}

fn record_from_document(mut document: ValidatedDocument) -> Result<ServiceRecord, ValidationError> {
    let name = match take_field(&mut document, "name")? {
        FieldValue::Text(name) => name,
        other => return Err(unexpected_value("name", BsonType::String, &other)),
    };
    let subscribers = match take_field(&mut document, "subscribers")? {
        FieldValue::Int(subscribers) => subscribers,
        other => return Err(unexpected_value("subscribers", BsonType::Int, &other)),
    };
    let revenue = match take_field(&mut document, "revenue")? {
        FieldValue::Decimal(revenue) => revenue,
        other => return Err(unexpected_value("revenue", BsonType::Decimal, &other)),
    };
    ServiceRecord::new(name, subscribers, revenue)
}

fn take_field(document: &mut ValidatedDocument, field: &str) -> Result<FieldValue, ValidationError> {
    document
        .remove(field)
        .ok_or_else(|| ValidationError::MissingField(field.to_string()))
}

fn unexpected_value(field: &str, expected: BsonType, found: &FieldValue) -> ValidationError {
    ValidationError::InvalidField {
        field: field.to_string(),
        reason: format!(
            "schema yields {} where a service record needs {}",
            found.type_name(),
            expected.type_name()
        ),
        value: found.to_json(),
    }
}
