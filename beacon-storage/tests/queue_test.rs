//! Durable queue: ordering, limits, idempotent deletes, disk-full handling.

use std::sync::Arc;

use beacon_core::errors::StorageError;
use beacon_core::event::{SendPolicy, StoreCategory};
use beacon_core::registry::Registry;
use beacon_core::requests::{QueueCommand, QueueInsert, QueueReply};
use beacon_storage::{Database, EventQueue, QueueLimits, StorageModule};

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn limits(max_rows: usize) -> QueueLimits {
    QueueLimits {
        max_row_bytes: 1024,
        max_stored_rows: max_rows,
    }
}

fn memory_queue(max_rows: usize) -> EventQueue {
    EventQueue::new(Arc::new(Database::open_in_memory().unwrap()), limits(max_rows))
}

fn row(category: StoreCategory, policy: SendPolicy, tag: u8) -> QueueInsert {
    QueueInsert {
        category,
        policy,
        data: vec![tag; 8],
        created_at: chrono::Utc::now().timestamp_millis(),
    }
}

fn batch_row(tag: u8) -> QueueInsert {
    row(StoreCategory::Track, SendPolicy::Batch, tag)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[test]
fn row_ids_are_monotonic() {
    let queue = memory_queue(100);
    let ids: Vec<i64> = (0..5).map(|i| queue.insert(batch_row(i)).unwrap()).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(queue.count().unwrap(), 5);
}

#[test]
fn fetch_returns_oldest_first_within_limit() {
    let queue = memory_queue(100);
    for i in 1..=10 {
        queue.insert(batch_row(i)).unwrap();
    }
    let batch = queue.fetch_oldest(SendPolicy::Batch, 5, usize::MAX).unwrap();
    let tags: Vec<u8> = batch.rows.iter().map(|r| r.data[0]).collect();
    assert_eq!(tags, vec![1, 2, 3, 4, 5]);
    assert_eq!(batch.max_row_id, batch.rows[4].id);
    assert_eq!(batch.total_bytes, 40);
    assert_eq!(batch.category, Some(StoreCategory::Track));
}

#[test]
fn failed_send_leaves_rows_for_next_fetch() {
    let queue = memory_queue(100);
    for i in 1..=10 {
        queue.insert(batch_row(i)).unwrap();
    }
    let first = queue.fetch_oldest(SendPolicy::Batch, 5, usize::MAX).unwrap();
    // Transport failed: nothing deleted.
    let second = queue.fetch_oldest(SendPolicy::Batch, 5, usize::MAX).unwrap();
    assert_eq!(first, second);
}

#[test]
fn fetch_stays_within_oldest_category_and_policy() {
    let queue = memory_queue(100);
    queue.insert(row(StoreCategory::Autotrack, SendPolicy::Batch, 1)).unwrap();
    queue.insert(row(StoreCategory::Track, SendPolicy::Batch, 2)).unwrap();
    queue.insert(row(StoreCategory::Realtime, SendPolicy::Instant, 3)).unwrap();
    queue.insert(row(StoreCategory::Autotrack, SendPolicy::Batch, 4)).unwrap();

    let batch = queue.fetch_oldest(SendPolicy::Batch, 10, usize::MAX).unwrap();
    let tags: Vec<u8> = batch.rows.iter().map(|r| r.data[0]).collect();
    assert_eq!(tags, vec![1, 4]);
    assert_eq!(batch.category, Some(StoreCategory::Autotrack));

    let instant = queue.fetch_oldest(SendPolicy::Instant, 10, usize::MAX).unwrap();
    assert_eq!(instant.len(), 1);
    assert_eq!(instant.rows[0].policy, SendPolicy::Instant);
}

#[test]
fn fetch_respects_byte_ceiling() {
    let queue = memory_queue(100);
    for i in 0..4 {
        queue.insert(batch_row(i)).unwrap(); // 8 bytes each
    }
    let batch = queue.fetch_oldest(SendPolicy::Batch, 10, 20).unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(batch.total_bytes, 16);

    // A ceiling below one row still yields that row.
    let batch = queue.fetch_oldest(SendPolicy::Batch, 10, 1).unwrap();
    assert_eq!(batch.len(), 1);
}

#[test]
fn fetch_on_empty_queue_is_empty() {
    let queue = memory_queue(100);
    let batch = queue.fetch_oldest(SendPolicy::Batch, 10, usize::MAX).unwrap();
    assert!(batch.is_empty());
    assert_eq!(batch.category, None);
}

#[test]
fn delete_up_to_is_idempotent() {
    let queue = memory_queue(100);
    for i in 0..6 {
        queue.insert(batch_row(i)).unwrap();
    }
    let batch = queue.fetch_oldest(SendPolicy::Batch, 3, usize::MAX).unwrap();
    let category = batch.category.unwrap();

    assert_eq!(queue.delete_up_to(batch.max_row_id, SendPolicy::Batch, category).unwrap(), 3);
    assert_eq!(queue.delete_up_to(batch.max_row_id, SendPolicy::Batch, category).unwrap(), 0);
    assert_eq!(queue.count().unwrap(), 3);
}

#[test]
fn delete_up_to_spares_other_policies_and_later_rows() {
    let queue = memory_queue(100);
    let instant = queue
        .insert(row(StoreCategory::Track, SendPolicy::Instant, 0))
        .unwrap();
    let a = queue.insert(batch_row(1)).unwrap();
    let _b = queue.insert(batch_row(2)).unwrap();

    queue.delete_up_to(a, SendPolicy::Batch, StoreCategory::Track).unwrap();

    let remaining = queue.fetch_oldest(SendPolicy::Batch, 10, usize::MAX).unwrap();
    assert_eq!(remaining.rows.iter().map(|r| r.data[0]).collect::<Vec<_>>(), vec![2]);
    let still_instant = queue.fetch_oldest(SendPolicy::Instant, 10, usize::MAX).unwrap();
    assert_eq!(still_instant.rows[0].id, instant);
}

#[test]
fn oversized_insert_is_rejected_and_queue_unchanged() {
    let queue = memory_queue(100);
    queue.insert(batch_row(1)).unwrap();
    let mut big = batch_row(2);
    big.data = vec![0u8; 1025];

    let err = queue.insert(big).unwrap_err();
    assert!(matches!(err, StorageError::PayloadTooLarge { size: 1025, limit: 1024 }));
    assert_eq!(queue.count().unwrap(), 1);
}

#[test]
fn max_rows_keeps_only_newest() {
    let queue = memory_queue(100);
    let mut ids = Vec::new();
    for i in 0..150u32 {
        ids.push(queue.insert(batch_row((i % 256) as u8)).unwrap());
    }
    assert_eq!(queue.count().unwrap(), 100);

    let batch = queue.fetch_oldest(SendPolicy::Batch, 1000, usize::MAX).unwrap();
    let kept: Vec<i64> = batch.rows.iter().map(|r| r.id).collect();
    assert_eq!(kept, ids[50..].to_vec());
}

#[test]
fn stored_oversized_rows_are_purged_on_fetch() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let permissive = EventQueue::new(Arc::clone(&db), limits(100));
    let mut big = batch_row(9);
    big.data = vec![9; 1000];
    permissive.insert(big).unwrap();
    permissive.insert(batch_row(1)).unwrap();

    let strict = EventQueue::new(
        db,
        QueueLimits {
            max_row_bytes: 100,
            max_stored_rows: 100,
        },
    );
    let batch = strict.fetch_oldest(SendPolicy::Batch, 10, usize::MAX).unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch.rows[0].data[0], 1);
    assert_eq!(strict.count().unwrap(), 1);
}

#[test]
fn evict_stale_removes_old_rows_only() {
    let queue = memory_queue(100);
    let now = chrono::Utc::now().timestamp_millis();
    let mut old = batch_row(1);
    old.created_at = now - 10 * 86_400_000;
    queue.insert(old).unwrap();
    queue.insert(batch_row(2)).unwrap();

    assert_eq!(queue.evict_stale(7).unwrap(), 1);
    assert_eq!(queue.count().unwrap(), 1);
    assert_eq!(queue.delete_all().unwrap(), 1);
    assert_eq!(queue.count().unwrap(), 0);
}

#[test]
fn disk_full_disables_queue_for_process() {
    let queue = memory_queue(10_000);
    queue
        .database()
        .with_conn(|conn| {
            conn.pragma_update(None, "max_page_count", 8)
                .map_err(|e| StorageError::SqliteError { message: e.to_string() })
        })
        .unwrap();

    let mut saw_disk_full = false;
    for i in 0..2000u32 {
        let mut r = batch_row((i % 256) as u8);
        r.data = vec![7; 1000];
        match queue.insert(r) {
            Ok(_) => continue,
            Err(StorageError::DiskFull) => {
                saw_disk_full = true;
                break;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert!(saw_disk_full);
    assert!(queue.is_disabled());
    assert!(matches!(queue.count(), Err(StorageError::DiskFull)));
}

#[test]
fn two_connections_share_one_queue_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.db");
    let a = EventQueue::new(Arc::new(Database::open(&path, 5_000).unwrap()), limits(100));
    let b = EventQueue::new(Arc::new(Database::open(&path, 5_000).unwrap()), limits(100));

    let handles: Vec<_> = [a, b]
        .into_iter()
        .map(|q| {
            std::thread::spawn(move || {
                (0..50)
                    .map(|i| q.insert(batch_row(i)).unwrap())
                    .collect::<Vec<i64>>()
            })
        })
        .collect();
    let mut ids: Vec<i64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 100);

    let reader = EventQueue::new(Arc::new(Database::open(&path, 5_000).unwrap()), limits(1000));
    assert_eq!(reader.count().unwrap(), 100);
}

#[test]
fn registry_module_routes_queue_commands() {
    let queue = Arc::new(memory_queue(100));
    let mut registry = Registry::new();
    registry.install(&StorageModule::new(Arc::clone(&queue)));

    let reply = registry
        .execute::<QueueCommand, QueueReply>(QueueCommand::Insert(batch_row(1)))
        .unwrap();
    assert!(reply.inserted_id().is_some());

    let count = registry
        .execute::<QueueCommand, QueueReply>(QueueCommand::Count)
        .unwrap();
    assert_eq!(count, QueueReply::Count(1));
}
