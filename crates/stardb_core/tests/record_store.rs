use serde_json::{json, Value};
use stardb_core::db::open_db_in_memory;
use stardb_core::{
    RecordStore, RepoError, SchemaStatus, SqliteServiceRepository, StoreError,
};

fn candidate(name: &str, subscribers: i64, revenue: &str) -> Value {
    json!({ "name": name, "subscribers": subscribers, "revenue": revenue })
}

#[test]
fn insert_then_get_returns_identical_values() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = RecordStore::new(SqliteServiceRepository::try_new(&mut conn).unwrap());
    store.ensure_schema().unwrap();

    let cases = [
        ("StarCloud", 15000, "112000.00"),
        ("", 0, "0"),
        ("Ω-service", 2_147_483_647, "-12.3450"),
        ("x", 1, "0.000000000000000000000000001"),
    ];
    for (name, subscribers, revenue) in cases {
        let id = store
            .insert(&candidate(name, subscribers, revenue))
            .unwrap();
        let loaded = store.get(id).unwrap().unwrap();
        assert_eq!(loaded.name, name);
        assert_eq!(i64::from(loaded.subscribers), subscribers);
        assert_eq!(loaded.revenue.to_string(), revenue);
    }
}

#[test]
fn insert_reports_each_missing_field_by_name() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = RecordStore::new(SqliteServiceRepository::try_new(&mut conn).unwrap());
    store.ensure_schema().unwrap();

    for missing in ["name", "subscribers", "revenue"] {
        let mut doc = candidate("A", 1, "1.00");
        doc.as_object_mut().unwrap().remove(missing);

        let err = store.insert(&doc).unwrap_err();
        assert!(
            matches!(&err, StoreError::MissingField(field) if field == missing),
            "unexpected error for missing {missing}: {err}"
        );
    }
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn insert_rejects_name_longer_than_fifty_characters() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = RecordStore::new(SqliteServiceRepository::try_new(&mut conn).unwrap());
    store.ensure_schema().unwrap();

    let err = store
        .insert(&candidate(&"x".repeat(51), 1, "1.00"))
        .unwrap_err();
    match err {
        StoreError::InvalidField { field, value, .. } => {
            assert_eq!(field, "name");
            assert_eq!(value, json!("x".repeat(51)));
        }
        other => panic!("unexpected error: {other}"),
    }

    store
        .insert(&candidate(&"x".repeat(50), 1, "1.00"))
        .unwrap();
}

#[test]
fn insert_rejects_negative_subscribers() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = RecordStore::new(SqliteServiceRepository::try_new(&mut conn).unwrap());
    store.ensure_schema().unwrap();

    let err = store.insert(&candidate("A", -1, "1.00")).unwrap_err();
    match err {
        StoreError::InvalidField {
            field,
            reason,
            value,
        } => {
            assert_eq!(field, "subscribers");
            assert!(reason.contains(">= 0"), "reason: {reason}");
            assert_eq!(value, json!(-1));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn insert_rejects_malformed_revenue() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = RecordStore::new(SqliteServiceRepository::try_new(&mut conn).unwrap());
    store.ensure_schema().unwrap();

    for revenue in [json!("12.5.0"), json!(12.5), json!(true), json!("1e5")] {
        let doc = json!({ "name": "A", "subscribers": 1, "revenue": revenue });
        let err = store.insert(&doc).unwrap_err();
        assert!(
            matches!(&err, StoreError::InvalidField { field, .. } if field == "revenue"),
            "unexpected error for {revenue}: {err}"
        );
    }
}

#[test]
fn insert_rejects_non_canonical_revenue_literals() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = RecordStore::new(SqliteServiceRepository::try_new(&mut conn).unwrap());
    store.ensure_schema().unwrap();

    for revenue in ["+1.00", "007.50", "-0.00"] {
        let err = store.insert(&candidate("A", 1, revenue)).unwrap_err();
        assert!(
            matches!(&err, StoreError::InvalidField { field, .. } if field == "revenue"),
            "unexpected error for {revenue}: {err}"
        );
    }
    assert_eq!(store.count().unwrap(), 0);

    for revenue in ["0.00", "-0.50", "7.50"] {
        let id = store.insert(&candidate("A", 1, revenue)).unwrap();
        let stored = store.get(id).unwrap().unwrap();
        assert_eq!(stored.revenue.to_string(), revenue);
    }
}

#[test]
fn first_violation_wins_in_field_order() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = RecordStore::new(SqliteServiceRepository::try_new(&mut conn).unwrap());
    store.ensure_schema().unwrap();

    let doc = json!({ "name": "x".repeat(60), "subscribers": -5, "revenue": "bad" });
    let err = store.insert(&doc).unwrap_err();
    assert!(matches!(err, StoreError::InvalidField { field, .. } if field == "name"));
}

#[test]
fn bulk_insert_with_one_invalid_candidate_persists_nothing() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = RecordStore::new(SqliteServiceRepository::try_new(&mut conn).unwrap());
    store.ensure_schema().unwrap();

    let batch = vec![
        candidate("A", 1, "1.00"),
        candidate("B", 2, "2.00"),
        candidate("C", 3, "3.00"),
        candidate("D", -4, "4.00"),
        candidate("E", 5, "5.00"),
    ];

    match store.bulk_insert(&batch).unwrap_err() {
        StoreError::Batch(violations) => {
            assert_eq!(violations.len(), 1);
            assert_eq!(violations[0].position, 3);
            assert_eq!(violations[0].error.field(), Some("subscribers"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn bulk_insert_reports_every_violation_with_position() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = RecordStore::new(SqliteServiceRepository::try_new(&mut conn).unwrap());
    store.ensure_schema().unwrap();

    let batch = vec![
        json!({ "subscribers": 1, "revenue": "1.00" }),
        candidate("ok", 1, "1.00"),
        candidate(&"n".repeat(51), 1, "1.00"),
    ];

    let err = store.bulk_insert(&batch).unwrap_err();
    let message = err.to_string();
    match err {
        StoreError::Batch(violations) => {
            let positions: Vec<_> = violations.iter().map(|v| v.position).collect();
            assert_eq!(positions, vec![0, 2]);
            assert_eq!(violations[0].error.field(), Some("name"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(message.contains("candidate #0"));
    assert!(message.contains("candidate #2"));
}

#[test]
fn bulk_insert_returns_ids_in_input_order() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = RecordStore::new(SqliteServiceRepository::try_new(&mut conn).unwrap());
    store.ensure_schema().unwrap();

    let ids = store
        .bulk_insert(&[candidate("first", 1, "1.00"), candidate("second", 2, "2.00")])
        .unwrap();

    let listed = store.list().unwrap();
    assert_eq!(listed.iter().map(|s| s.id).collect::<Vec<_>>(), ids);
    assert_eq!(listed[0].record.name, "first");
    assert_eq!(listed[1].record.name, "second");
}

#[test]
fn empty_bulk_insert_is_a_no_op() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = RecordStore::new(SqliteServiceRepository::try_new(&mut conn).unwrap());
    store.ensure_schema().unwrap();

    assert!(store.bulk_insert(&[]).unwrap().is_empty());
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn ensure_schema_twice_is_a_no_op() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = RecordStore::new(SqliteServiceRepository::try_new(&mut conn).unwrap());

    assert_eq!(store.ensure_schema().unwrap(), SchemaStatus::Created);
    let id = store.insert(&candidate("kept", 1, "1.00")).unwrap();
    assert_eq!(store.ensure_schema().unwrap(), SchemaStatus::Unchanged);
    assert!(store.get(id).unwrap().is_some());
}

#[test]
fn insert_before_schema_registration_is_a_storage_failure() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = RecordStore::new(SqliteServiceRepository::try_new(&mut conn).unwrap());

    let err = store.insert(&candidate("A", 1, "1.00")).unwrap_err();
    assert!(matches!(
        err,
        StoreError::StorageFailure(RepoError::CollectionNotFound(ref name)) if name == "services"
    ));
}

#[test]
fn validation_errors_take_precedence_over_storage_state() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = RecordStore::new(SqliteServiceRepository::try_new(&mut conn).unwrap());

    let err = store.insert(&json!("not a document")).unwrap_err();
    assert!(matches!(err, StoreError::InvalidDocument { found: "string" }));
}
