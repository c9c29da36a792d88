const MILLIS_PER_DAY: i64 = 86_400_000;

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// UTC day number used to key the daily cellular budget.
pub(crate) fn day_index(millis: i64) -> i64 {
    millis.div_euclid(MILLIS_PER_DAY)
}
