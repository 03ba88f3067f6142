//! Lowest-free identifier allocation for new records.

use shared::Record;

/// Smallest positive integer not present in `existing`.
///
/// Walks the ascending identifiers from 1 and returns the first gap, or one
/// past the last when there is none. Input order and duplicates do not matter;
/// non-positive identifiers are ignored.
pub fn next_identifier<I>(existing: I) -> i64
where
    I: IntoIterator<Item = i64>,
{
    let mut ids: Vec<i64> = existing.into_iter().filter(|id| *id > 0).collect();
    ids.sort_unstable();
    ids.dedup();

    for (position, id) in ids.iter().enumerate() {
        let candidate = position as i64 + 1;
        if *id != candidate {
            return candidate;
        }
    }
    ids.len() as i64 + 1
}

/// Next free identifier among `records`
pub fn next_record_identifier<R: Record>(records: &[R]) -> i64 {
    next_identifier(records.iter().map(Record::id))
}
