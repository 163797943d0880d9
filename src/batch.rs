use crate::config::ColmigConfig;
use crate::error::ColmigError;
use crate::model::{AttributeIdentity, RecordUpdate};
use crate::store::StoreClient;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub scanned: u64,
    pub copied: u64,
    pub skipped: u64,
}

fn flush(
    store: &dyn StoreClient,
    entity: &str,
    bulk: bool,
    batch: &mut Vec<RecordUpdate>,
) -> Result<(), ColmigError> {
    if batch.is_empty() {
        return Ok(());
    }
    debug!(entity, size = batch.len(), bulk, "flushing copy batch");
    if bulk {
        store.update_batch(entity, batch)?;
    } else {
        // No atomicity here; a mid-batch failure leaves a prefix migrated,
        // which is safe because equal values are skipped on re-run.
        for update in batch.iter() {
            store.update_record(entity, update)?;
        }
    }
    batch.clear();
    Ok(())
}

/// Copies every record's value from `from` into `to`, buffered into
/// fixed-size batches. Records whose destination already equals the source
/// and records with a null source are skipped, so re-running after a partial
/// failure never alters already-copied records.
pub fn copy_attribute_data(
    store: &dyn StoreClient,
    config: &ColmigConfig,
    from: &AttributeIdentity,
    to: &AttributeIdentity,
) -> Result<CopyStats, ColmigError> {
    let entity = &from.entity;
    let total = store.record_count(entity)?;
    info!(
        entity,
        from = %from.schema_name,
        to = %to.schema_name,
        total,
        "copying attribute data"
    );

    let records = store.records(entity, &[from.schema_name.as_str(), to.schema_name.as_str()])?;
    let mut stats = CopyStats::default();
    let mut batch: Vec<RecordUpdate> = Vec::with_capacity(config.batch_size);
    for record in &records {
        stats.scanned += 1;
        let source = record.get(&from.schema_name);
        if source.is_null() || source == record.get(&to.schema_name) {
            stats.skipped += 1;
            continue;
        }
        batch.push(RecordUpdate {
            record_id: record.id,
            column: to.schema_name.clone(),
            value: source.clone(),
        });
        stats.copied += 1;
        if batch.len() >= config.batch_size {
            flush(store, entity, config.bulk_update_available, &mut batch)?;
        }
    }
    flush(store, entity, config.bulk_update_available, &mut batch)?;
    info!(
        entity,
        copied = stats.copied,
        skipped = stats.skipped,
        "attribute data copy complete"
    );
    Ok(stats)
}
