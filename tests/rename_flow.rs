use colmig::{
    Action, ArtifactKind, AttributeDraft, AttributeType, ColmigConfig, MemoryStore, Migrator,
    Steps, Value,
};
use uuid::Uuid;

fn seed_contact(store: &MemoryStore) -> Vec<Uuid> {
    store
        .add_attribute(
            "contact",
            &AttributeDraft::new("old_field", AttributeType::Text, "Old Field", false),
        )
        .expect("old_field");
    store
        .add_attribute(
            "contact",
            &AttributeDraft::new("city", AttributeType::Text, "City", false),
        )
        .expect("city");
    (0..5)
        .map(|i| {
            store.insert_record(
                "contact",
                &[
                    ("old_field", Value::Text(format!("v{i}"))),
                    ("city", Value::Text("oslo".into())),
                ],
            )
        })
        .collect()
}

fn seed_artifacts(store: &MemoryStore) -> Vec<Uuid> {
    vec![
        store.add_artifact(
            ArtifactKind::Form,
            "contact",
            "main form",
            "<row><cell>old_field</cell><cell>city</cell></row>",
        ),
        store.add_artifact(
            ArtifactKind::SavedView,
            "contact",
            "active contacts",
            "columns:old_field,city;filter:old_field != null",
        ),
        store.add_artifact(
            ArtifactKind::Chart,
            "contact",
            "by field",
            "groupby:old_field",
        ),
        store.add_artifact(
            ArtifactKind::Workflow,
            "contact",
            "on change",
            "when old_field changes then notify",
        ),
        store.add_artifact(
            ArtifactKind::EventFilter,
            "contact",
            "update filter",
            "attributes:old_field",
        ),
        store.add_artifact(
            ArtifactKind::CalculatedField,
            "contact",
            "derived",
            "concat(old_field, city)",
        ),
    ]
}

#[test]
fn full_rename_moves_definition_data_and_references() {
    let store = MemoryStore::new();
    let record_ids = seed_contact(&store);
    let artifact_ids = seed_artifacts(&store);

    let old = store.attribute("contact", "old_field").expect("old attribute");
    let migrator = Migrator::new(&store, ColmigConfig::default());
    let outcome = migrator
        .run(&old, "new_field", Steps::ALL, Action::RENAME, None)
        .expect("rename run");

    assert_eq!(
        outcome.executed,
        vec![
            "create_new_attribute",
            "migrate_to_new_attribute",
            "remove_existing_attribute",
        ],
        "direct topology never touches temp steps"
    );
    assert_eq!(outcome.records_copied, 5);

    // Definition: new attribute carries the old value type, old one is gone.
    let new = store.attribute("contact", "new_field").expect("new attribute");
    assert_eq!(new.value_type, AttributeType::Text);
    assert!(store.attribute("contact", "old_field").is_none());
    assert!(store.attribute("contact", "old_field_tmp").is_none());

    // Data followed the rename.
    for (i, id) in record_ids.iter().enumerate() {
        let record = store.record("contact", *id).expect("record");
        assert_eq!(record.get("new_field"), &Value::Text(format!("v{i}")));
        assert_eq!(record.get("city"), &Value::Text("oslo".into()));
    }

    // Every artifact kind now references the new name and not the old one.
    for id in &artifact_ids {
        let artifact = store.artifact(*id).expect("artifact");
        assert!(
            artifact.payload.contains("new_field"),
            "{} should reference new_field: {}",
            artifact.name,
            artifact.payload
        );
        assert!(
            !artifact.payload.contains("old_field"),
            "{} should not reference old_field: {}",
            artifact.name,
            artifact.payload
        );
    }
    assert_eq!(outcome.artifacts_rewritten, 6);
}

#[test]
fn rename_with_type_change_uses_direct_topology_with_override() {
    let store = MemoryStore::new();
    seed_contact(&store);

    let old = store.attribute("contact", "old_field").expect("old attribute");
    let migrator = Migrator::new(&store, ColmigConfig::default());
    let outcome = migrator
        .run(
            &old,
            "new_field",
            Steps::ALL,
            Action::RENAME | Action::CHANGE_TYPE,
            Some(AttributeType::Memo),
        )
        .expect("rename+retype run");

    assert_eq!(outcome.executed.len(), 3);
    let new = store.attribute("contact", "new_field").expect("new attribute");
    assert_eq!(new.value_type, AttributeType::Memo);
    assert!(store.attribute("contact", "old_field").is_none());
}

#[test]
fn metadata_only_config_skips_the_data_copy() {
    let store = MemoryStore::new();
    let record_ids = seed_contact(&store);

    let old = store.attribute("contact", "old_field").expect("old attribute");
    let migrator = Migrator::new(&store, ColmigConfig::metadata_only());
    let outcome = migrator
        .run(&old, "new_field", Steps::ALL, Action::RENAME, None)
        .expect("metadata-only run");

    assert_eq!(outcome.records_copied, 0);
    // The old column and its values are gone, nothing was copied over.
    let record = store.record("contact", record_ids[0]).expect("record");
    assert!(record.get("new_field").is_null());
}

#[test]
fn requesting_a_step_subset_executes_only_those_steps() {
    let store = MemoryStore::new();
    seed_contact(&store);

    let old = store.attribute("contact", "old_field").expect("old attribute");
    let migrator = Migrator::new(&store, ColmigConfig::default());
    let outcome = migrator
        .run(
            &old,
            "new_field",
            Steps::CREATE_NEW_ATTRIBUTE,
            Action::RENAME,
            None,
        )
        .expect("create-only run");

    assert_eq!(outcome.executed, vec!["create_new_attribute"]);
    assert!(store.attribute("contact", "new_field").is_some());
    assert!(
        store.attribute("contact", "old_field").is_some(),
        "removal was not requested"
    );
}
