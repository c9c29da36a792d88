//! v002: key/value table for counters, identifiers, and the legacy migration cursor.

pub const MIGRATION_SQL: &str = "
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    int_value INTEGER,
    text_value TEXT
) WITHOUT ROWID;
";
