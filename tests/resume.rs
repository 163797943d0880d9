use colmig::{
    Action, ArtifactKind, AttributeDraft, AttributeType, ColmigConfig, MemoryStore, Migrator,
    Steps, Value,
};
use uuid::Uuid;

fn seed(store: &MemoryStore, n: usize) -> Vec<Uuid> {
    store
        .add_attribute(
            "contact",
            &AttributeDraft::new("old_field", AttributeType::Text, "Old Field", false),
        )
        .expect("old_field");
    store.add_artifact(
        ArtifactKind::SavedView,
        "contact",
        "active",
        "filter:old_field != null",
    );
    (0..n)
        .map(|i| store.insert_record("contact", &[("old_field", Value::Text(format!("v{i}")))]))
        .collect()
}

fn final_shape(store: &MemoryStore, ids: &[Uuid], name: &str) -> Vec<Value> {
    assert!(store.attribute("contact", "old_field").is_none());
    assert!(store.attribute("contact", "old_field_tmp").is_none());
    assert!(store.attribute("contact", name).is_some());
    ids.iter()
        .map(|id| store.record("contact", *id).expect("record").get(name).clone())
        .collect()
}

#[test]
fn staged_rename_matches_a_single_full_run() {
    // One store takes the rename in a single run.
    let full = MemoryStore::new();
    let full_ids = seed(&full, 3);
    let old = full.attribute("contact", "old_field").expect("attribute");
    Migrator::new(&full, ColmigConfig::default())
        .run(&old, "new_field", Steps::ALL, Action::RENAME, None)
        .expect("full run");

    // The other takes it as two runs: create first, then the remainder.
    let staged = MemoryStore::new();
    let staged_ids = seed(&staged, 3);
    let old = staged.attribute("contact", "old_field").expect("attribute");
    let migrator = Migrator::new(&staged, ColmigConfig::default());
    migrator
        .run(&old, "new_field", Steps::CREATE_NEW_ATTRIBUTE, Action::RENAME, None)
        .expect("first stage");
    migrator
        .run(
            &old,
            "new_field",
            Steps::MIGRATE_TO_NEW_ATTRIBUTE | Steps::REMOVE_EXISTING_ATTRIBUTE,
            Action::RENAME,
            None,
        )
        .expect("second stage");

    assert_eq!(
        final_shape(&full, &full_ids, "new_field"),
        final_shape(&staged, &staged_ids, "new_field")
    );
}

#[test]
fn data_copy_failure_resumes_without_touching_copied_records() {
    let store = MemoryStore::new();
    let ids = seed(&store, 6);
    let old = store.attribute("contact", "old_field").expect("attribute");
    let config = ColmigConfig {
        batch_size: 2,
        ..ColmigConfig::sequential()
    };
    let migrator = Migrator::new(&store, config);

    // First attempt dies partway through the copy.
    store.fail_after_updates(3);
    migrator
        .run(&old, "new_field", Steps::ALL, Action::RENAME, None)
        .expect_err("injected copy failure");
    assert!(
        store.attribute("contact", "old_field").is_some(),
        "removal never ran"
    );

    // Operator fixes the condition and re-invokes with the remaining steps.
    store.clear_update_failure();
    let outcome = migrator
        .run(
            &old,
            "new_field",
            Steps::MIGRATE_TO_NEW_ATTRIBUTE | Steps::REMOVE_EXISTING_ATTRIBUTE,
            Action::RENAME,
            None,
        )
        .expect("resumed run");
    assert_eq!(outcome.records_copied, 3, "already-copied records skipped");

    let values = final_shape(&store, &ids, "new_field");
    for (i, value) in values.iter().enumerate() {
        assert_eq!(value, &Value::Text(format!("v{i}")));
    }
}

#[test]
fn interrupted_type_change_resumes_past_the_temp_stage() {
    let store = MemoryStore::new();
    store
        .add_attribute(
            "invoice",
            &AttributeDraft::new("amount", AttributeType::Integer, "Amount", false),
        )
        .expect("amount");
    let ids: Vec<_> = (0..3)
        .map(|i| store.insert_record("invoice", &[("amount", Value::Integer(i + 1))]))
        .collect();
    let chart = store.add_artifact(ArtifactKind::Chart, "invoice", "totals", "sum:amount");

    let old = store.attribute("invoice", "amount").expect("attribute");
    let migrator = Migrator::new(&store, ColmigConfig::default());

    // First run drives only the temp stage, as if the run died afterwards.
    migrator
        .run(
            &old,
            "amount",
            Steps::CREATE_TEMP | Steps::MIGRATE_TO_TEMP,
            Action::CHANGE_TYPE,
            Some(AttributeType::Float),
        )
        .expect("temp stage");
    assert!(store.attribute("invoice", "amount_tmp").is_some());
    assert_eq!(store.artifact(chart).expect("chart").payload, "sum:amount_tmp");

    // Re-invoking with the remaining steps finishes the migration.
    migrator
        .run(
            &old,
            "amount",
            Steps::REMOVE_EXISTING_ATTRIBUTE
                | Steps::CREATE_NEW_ATTRIBUTE
                | Steps::MIGRATE_TO_NEW_ATTRIBUTE
                | Steps::REMOVE_TEMP,
            Action::CHANGE_TYPE,
            Some(AttributeType::Float),
        )
        .expect("resumed run");

    let replaced = store.attribute("invoice", "amount").expect("amount");
    assert_eq!(replaced.value_type, AttributeType::Float);
    assert!(store.attribute("invoice", "amount_tmp").is_none());
    for (i, id) in ids.iter().enumerate() {
        let record = store.record("invoice", *id).expect("record");
        assert_eq!(record.get("amount"), &Value::Integer(i as i64 + 1));
    }
    assert_eq!(store.artifact(chart).expect("chart").payload, "sum:amount");
}

#[test]
fn resume_reuses_attribute_created_by_an_earlier_run() {
    let store = MemoryStore::new();
    seed(&store, 2);
    let old = store.attribute("contact", "old_field").expect("attribute");
    let migrator = Migrator::new(&store, ColmigConfig::default());

    migrator
        .run(&old, "new_field", Steps::CREATE_NEW_ATTRIBUTE, Action::RENAME, None)
        .expect("create");
    let created = store.attribute("contact", "new_field").expect("created");

    // A second run that still carries the remaining steps reuses the
    // attribute created by the first run instead of failing.
    migrator
        .run(
            &old,
            "new_field",
            Steps::MIGRATE_TO_NEW_ATTRIBUTE | Steps::REMOVE_EXISTING_ATTRIBUTE,
            Action::RENAME,
            None,
        )
        .expect("resume");
    let survived = store.attribute("contact", "new_field").expect("survived");
    assert_eq!(created.metadata_id, survived.metadata_id);
}
