//! Batch numbers: `BATCH-001` .. `BATCH-999`, then `BTH{6 digits}`.

pub const MAX_BATCH_SEQUENCE: u32 = 999;

/// `BATCH-{seq:03}`, or `None` once the three-digit space is used up.
pub fn format_batch_number(sequence: u32) -> Option<String> {
    (1..=MAX_BATCH_SEQUENCE)
        .contains(&sequence)
        .then(|| format!("BATCH-{:03}", sequence))
}

/// `BTH` followed by the last six digits of a millisecond timestamp.
pub fn fallback_batch_number(timestamp_millis: i64) -> String {
    format!("BTH{:06}", timestamp_millis.rem_euclid(1_000_000))
}
