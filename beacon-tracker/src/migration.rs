//! One-time move of rows from the legacy store into the current queue.

use std::time::Duration;

use beacon_core::constants::LEGACY_MIGRATION_BATCH;
use beacon_core::event::EventRecord;
use beacon_core::registry::Registry;
use beacon_core::requests::{DecodeRequest, EncodeRequest, EncodedPayload, QueueInsert};
use beacon_storage::legacy::{migrate_legacy, LegacyRow};
use beacon_storage::{LegacyMigrationReport, LegacyStore, MigrationBounds};
use tracing::{debug, warn};

use crate::context::TrackerContext;

/// Migrate a bounded slice of the legacy store, if one exists.
pub fn run_legacy_migration(ctx: &TrackerContext) -> Option<LegacyMigrationReport> {
    let config = ctx.config();
    let path = config.legacy_db_path();
    let legacy = match LegacyStore::open_existing(&path) {
        Ok(Some(store)) => store,
        Ok(None) => return None,
        Err(e) => {
            warn!(error = %e, path = %path.display(), "cannot open legacy store");
            return None;
        }
    };

    let bounds = MigrationBounds {
        batch_size: LEGACY_MIGRATION_BATCH,
        max_batches: config.storage.legacy_max_batches,
        budget: Duration::from_millis(config.storage.legacy_budget_ms),
    };
    let registry = ctx.registry();
    match migrate_legacy(ctx.queue(), legacy, bounds, |row| convert(registry, row)) {
        Ok(report) => Some(report),
        Err(e) => {
            warn!(error = %e, "legacy migration failed, will retry on next start");
            None
        }
    }
}

/// Decode a legacy row with the registered codec and re-encode it in the
/// current row format.
fn convert(registry: &Registry, row: &LegacyRow) -> Option<QueueInsert> {
    let record = match registry.execute::<DecodeRequest, EventRecord>(DecodeRequest(row.data.clone())) {
        Ok(record) => record,
        Err(e) => {
            debug!(error = %e, legacy_id = row.id, "legacy row undecodable");
            return None;
        }
    };
    let category = record.store_category();
    let policy = record.send_policy;
    let created_at = if row.created_at > 0 {
        row.created_at
    } else {
        record.timestamp
    };
    match registry.execute::<EncodeRequest, EncodedPayload>(EncodeRequest::One(record)) {
        Ok(payload) => Some(QueueInsert {
            category,
            policy,
            data: payload.bytes,
            created_at,
        }),
        Err(e) => {
            debug!(error = %e, legacy_id = row.id, "legacy row not re-encodable");
            None
        }
    }
}
