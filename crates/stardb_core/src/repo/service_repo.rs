//! Service repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Register collection validators and create their backing tables.
//! - Persist `ServiceRecord`s atomically, one at a time or as a batch.
//! - Read records back, re-validating persisted state.
//!
//! # Invariants
//! - Write paths call `ServiceRecord::validate()` before SQL mutations.
//! - A batch is written in one transaction: all rows or none.
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::db::migrations::latest_version;
use crate::db::{store_version, table_exists, DbError};
use crate::model::service::{RecordId, Revenue, ServiceRecord, StoredService, ValidationError};
use crate::schema::{CollectionSchema, SERVICES_COLLECTION};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence error for collection registration and record access.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    /// Connection was opened without applying migrations.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Write or read against a collection that was never registered.
    CollectionNotFound(String),
    /// Collection is registered with a different validator.
    SchemaConflict {
        collection: String,
        expected: Value,
        found: Value,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection is not initialized: store version {actual_version}, expected {expected_version}"
            ),
            Self::CollectionNotFound(name) => write!(f, "collection `{name}` is not registered"),
            Self::SchemaConflict {
                collection,
                expected,
                found,
            } => write!(
                f,
                "collection `{collection}` is registered with an incompatible validator: expected {expected}, found {found}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted record data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Result of registering a collection validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStatus {
    /// Collection and validator were created by this call.
    Created,
    /// An equivalent validator was already registered; nothing changed.
    Unchanged,
}

/// Repository interface for the `services` collection.
pub trait ServiceRepository {
    /// Registers `schema` and creates its table, or confirms it is already present.
    fn ensure_collection(&mut self, schema: &CollectionSchema) -> RepoResult<SchemaStatus>;
    fn insert_record(&mut self, record: &ServiceRecord) -> RepoResult<RecordId>;
    /// Inserts every record or none of them. Ids follow input order.
    fn insert_records(&mut self, records: &[ServiceRecord]) -> RepoResult<Vec<RecordId>>;
    fn get_record(&self, id: RecordId) -> RepoResult<Option<ServiceRecord>>;
    /// Lists records in insertion order.
    fn list_records(&self) -> RepoResult<Vec<StoredService>>;
    fn count_records(&self) -> RepoResult<u64>;
}

/// SQLite-backed service repository.
pub struct SqliteServiceRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteServiceRepository<'conn> {
    /// Wraps a migrated connection.
    ///
    /// Fails with `UninitializedConnection` when migrations were not applied.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        let expected_version = latest_version();
        let actual_version = store_version(conn)?;
        if actual_version != expected_version || !table_exists(conn, "collections")? {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }
}

impl ServiceRepository for SqliteServiceRepository<'_> {
    fn ensure_collection(&mut self, schema: &CollectionSchema) -> RepoResult<SchemaStatus> {
        let expected = schema.to_validator();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let registered: Option<String> = tx
            .query_row(
                "SELECT validator FROM collections WHERE name = ?1;",
                [schema.collection.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(text) = registered {
            let found: Value = serde_json::from_str(&text).map_err(|err| {
                RepoError::InvalidData(format!(
                    "validator for `{}` is not valid JSON: {err}",
                    schema.collection
                ))
            })?;
            if found == expected {
                return Ok(SchemaStatus::Unchanged);
            }
            return Err(RepoError::SchemaConflict {
                collection: schema.collection.clone(),
                expected,
                found,
            });
        }

        tx.execute_batch(&schema.create_table_sql())?;
        tx.execute(
            "INSERT INTO collections (name, validator) VALUES (?1, ?2);",
            params![schema.collection.as_str(), schema.canonical_validator()],
        )?;
        tx.commit()?;
        Ok(SchemaStatus::Created)
    }

    fn insert_record(&mut self, record: &ServiceRecord) -> RepoResult<RecordId> {
        record.validate()?;
        ensure_registered(self.conn)?;
        insert_row(self.conn, record)
    }

    fn insert_records(&mut self, records: &[ServiceRecord]) -> RepoResult<Vec<RecordId>> {
        for record in records {
            record.validate()?;
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        ensure_registered(&tx)?;
        let ids = records
            .iter()
            .map(|record| insert_row(&tx, record))
            .collect::<RepoResult<Vec<_>>>()?;
        tx.commit()?;
        Ok(ids)
    }

    fn get_record(&self, id: RecordId) -> RepoResult<Option<ServiceRecord>> {
        ensure_registered(self.conn)?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, name, subscribers, revenue FROM {SERVICES_COLLECTION} WHERE id = ?1;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_service_row(row)?.record));
        }

        Ok(None)
    }

    fn list_records(&self) -> RepoResult<Vec<StoredService>> {
        ensure_registered(self.conn)?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, name, subscribers, revenue FROM {SERVICES_COLLECTION} ORDER BY rowid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_service_row(row)?);
        }
        Ok(records)
    }

    fn count_records(&self) -> RepoResult<u64> {
        ensure_registered(self.conn)?;
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {SERVICES_COLLECTION};"),
            [],
            |row| row.get(0),
        )?;
        u64::try_from(count).map_err(|_| RepoError::InvalidData(format!("negative count {count}")))
    }
}

fn ensure_registered(conn: &Connection) -> RepoResult<()> {
    let registered: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM collections WHERE name = ?1);",
        [SERVICES_COLLECTION],
        |row| row.get(0),
    )?;
    if registered == 1 {
        Ok(())
    } else {
        Err(RepoError::CollectionNotFound(SERVICES_COLLECTION.to_string()))
    }
}

fn insert_row(conn: &Connection, record: &ServiceRecord) -> RepoResult<RecordId> {
    let id = Uuid::new_v4();
    conn.execute(
        &format!(
            "INSERT INTO {SERVICES_COLLECTION} (id, name, subscribers, revenue)
             VALUES (?1, ?2, ?3, ?4);"
        ),
        params![
            id.to_string(),
            record.name.as_str(),
            record.subscribers,
            record.revenue.to_string(),
        ],
    )?;
    Ok(id)
}

fn parse_service_row(row: &Row<'_>) -> RepoResult<StoredService> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid id value `{id_text}` in {SERVICES_COLLECTION}.id"
        ))
    })?;

    let subscribers_wide: i64 = row.get("subscribers")?;
    let subscribers = i32::try_from(subscribers_wide).map_err(|_| {
        RepoError::InvalidData(format!(
            "subscribers value {subscribers_wide} in {SERVICES_COLLECTION}.subscribers exceeds 32 bits"
        ))
    })?;

    let revenue_text: String = row.get("revenue")?;
    let revenue = Revenue::parse(&revenue_text).map_err(|reason| {
        RepoError::InvalidData(format!("{SERVICES_COLLECTION}.revenue: {reason}"))
    })?;

    let record = ServiceRecord {
        name: row.get("name")?,
        subscribers,
        revenue,
    };
    record.validate()?;
    Ok(StoredService { id, record })
}
