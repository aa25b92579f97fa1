//! Initial dataset for the `services` collection.

use crate::model::service::RecordId;
use crate::repo::service_repo::{SchemaStatus, ServiceRepository};
use crate::service::record_store::{RecordStore, StoreResult};
use log::info;
use serde_json::{json, Value};

/// Outcome of `seed_services`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedOutcome {
    pub schema: SchemaStatus,
    /// Ids of inserted seed records; empty when the collection already had data.
    pub inserted: Vec<RecordId>,
}

/// The four seed services, as dynamic candidates.
pub fn seed_candidates() -> Vec<Value> {
    vec![
        json!({ "name": "StarVision", "subscribers": 12000, "revenue": "48000.00" }),
        json!({ "name": "StarDocs", "subscribers": 8500, "revenue": "25500.00" }),
        json!({ "name": "StarCloud", "subscribers": 15000, "revenue": "112000.00" }),
        json!({ "name": "StarAI Engine", "subscribers": 6300, "revenue": "75500.00" }),
    ]
}

/// Registers the schema and loads the seed records into an empty collection.
///
/// Re-running against a populated collection inserts nothing.
pub fn seed_services<R: ServiceRepository>(store: &mut RecordStore<R>) -> StoreResult<SeedOutcome> {
    let schema = store.ensure_schema()?;

    let existing = store.count()?;
    if existing > 0 {
        info!("event=seed_run module=seed status=skipped existing={existing}");
        return Ok(SeedOutcome {
            schema,
            inserted: Vec::new(),
        });
    }

    let inserted = store.bulk_insert(&seed_candidates())?;
    info!(
        "event=seed_run module=seed status=ok inserted={}",
        inserted.len()
    );
    Ok(SeedOutcome { schema, inserted })
}
