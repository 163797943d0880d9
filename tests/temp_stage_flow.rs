use colmig::{
    Action, ArtifactKind, AttributeDraft, AttributeType, ColmigConfig, MemoryStore, Migrator,
    Steps, Value,
};
use uuid::Uuid;

fn seed_amount(store: &MemoryStore) -> Vec<Uuid> {
    store
        .add_attribute(
            "invoice",
            &AttributeDraft::new("amount", AttributeType::Integer, "Amount", false),
        )
        .expect("amount");
    (0..4)
        .map(|i| store.insert_record("invoice", &[("amount", Value::Integer(i * 100))]))
        .collect()
}

#[test]
fn pure_type_change_stages_through_temp() {
    let store = MemoryStore::new();
    let record_ids = seed_amount(&store);
    let view = store.add_artifact(
        ArtifactKind::SavedView,
        "invoice",
        "large invoices",
        "filter:amount > 500",
    );

    let old = store.attribute("invoice", "amount").expect("amount");
    let old_id = old.metadata_id;
    let migrator = Migrator::new(&store, ColmigConfig::default());
    let outcome = migrator
        .run(
            &old,
            "amount",
            Steps::ALL,
            Action::CHANGE_TYPE,
            Some(AttributeType::Float),
        )
        .expect("type change run");

    assert_eq!(
        outcome.executed,
        vec![
            "create_temp",
            "migrate_to_temp",
            "remove_existing_attribute",
            "create_new_attribute",
            "migrate_to_new_attribute",
            "remove_temp",
        ]
    );

    // Same name, new type, different physical attribute; temp is gone.
    let replaced = store.attribute("invoice", "amount").expect("amount");
    assert_eq!(replaced.value_type, AttributeType::Float);
    assert_ne!(replaced.metadata_id, old_id);
    assert!(store.attribute("invoice", "amount_tmp").is_none());

    // Data staged old -> temp -> new.
    for (i, id) in record_ids.iter().enumerate() {
        let record = store.record("invoice", *id).expect("record");
        assert_eq!(record.get("amount"), &Value::Integer(i as i64 * 100));
        assert!(record.get("amount_tmp").is_null());
    }

    // The artifact went through the temp name and back to the final one.
    let artifact = store.artifact(view).expect("view");
    assert_eq!(artifact.payload, "filter:amount > 500");
}

#[test]
fn case_only_rename_stages_through_temp() {
    let store = MemoryStore::new();
    store
        .add_attribute(
            "invoice",
            &AttributeDraft::new("duedate", AttributeType::Timestamp, "Due Date", false),
        )
        .expect("duedate");
    let id = store.insert_record("invoice", &[("duedate", Value::Timestamp(1_700_000_000))]);
    let form = store.add_artifact(
        ArtifactKind::Form,
        "invoice",
        "main",
        "<cell>duedate</cell>",
    );

    let old = store.attribute("invoice", "duedate").expect("duedate");
    let migrator = Migrator::new(&store, ColmigConfig::default());
    migrator
        .run(&old, "DueDate", Steps::ALL, Action::CHANGE_CASE, None)
        .expect("case change run");

    let renamed = store.attribute("invoice", "DueDate").expect("DueDate");
    assert_eq!(renamed.schema_name, "DueDate");
    assert_eq!(renamed.value_type, AttributeType::Timestamp);
    assert!(store.attribute("invoice", "duedate").is_none());
    assert!(store.attribute("invoice", "duedate_tmp").is_none());

    let record = store.record("invoice", id).expect("record");
    assert_eq!(record.get("DueDate"), &Value::Timestamp(1_700_000_000));

    let artifact = store.artifact(form).expect("form");
    assert_eq!(artifact.payload, "<cell>DueDate</cell>");
}

#[test]
fn case_change_with_type_change_combines_both() {
    let store = MemoryStore::new();
    seed_amount(&store);

    let old = store.attribute("invoice", "amount").expect("amount");
    let migrator = Migrator::new(&store, ColmigConfig::default());
    migrator
        .run(
            &old,
            "Amount",
            Steps::ALL,
            Action::CHANGE_CASE | Action::CHANGE_TYPE,
            Some(AttributeType::Float),
        )
        .expect("case+type run");

    let replaced = store.attribute("invoice", "Amount").expect("Amount");
    assert_eq!(replaced.value_type, AttributeType::Float);
    assert!(store.attribute("invoice", "amount").is_none());
}

#[test]
fn type_change_without_target_type_is_rejected() {
    let store = MemoryStore::new();
    seed_amount(&store);

    let old = store.attribute("invoice", "amount").expect("amount");
    let migrator = Migrator::new(&store, ColmigConfig::default());
    let err = migrator
        .run(&old, "amount", Steps::ALL, Action::CHANGE_TYPE, None)
        .expect_err("missing target type");
    assert_eq!(err.code_str(), "unsupported_action");
}
