//! v001: the event queue.

pub const MIGRATION_SQL: &str = "
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category INTEGER NOT NULL,
    policy INTEGER NOT NULL,
    data BLOB NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_policy_category
    ON events(policy, category, id);
CREATE INDEX IF NOT EXISTS idx_events_created_at
    ON events(created_at);
";
