//! Column ordering and search over record collections.
//!
//! Both work on the display form of a record's attribute, so numbers compare
//! as text: `"10"` sorts before `"9"`.

use shared::{Record, RecordError, Value};

fn displayed_attribute<R: Record>(record: &R, column: usize) -> Result<String, RecordError> {
    let attributes = record.attributes();
    attributes
        .get(column)
        .map(Value::to_string)
        .ok_or(RecordError::UnknownColumn {
            table: R::TABLE,
            index: column,
        })
}

/// Stable ascending sort of `(id, displayed)` pairs; returns the ids in order
pub fn sort_by_column(rows: &[(i64, String)]) -> Vec<i64> {
    let mut sorted: Vec<&(i64, String)> = rows.iter().collect();
    sorted.sort_by(|a, b| a.1.cmp(&b.1));
    sorted.into_iter().map(|(id, _)| *id).collect()
}

/// Reorder `records` by the displayed value of attribute `column`.
///
/// Records tied on the column keep their relative order.
pub fn sort_records<R: Record>(records: &[R], column: usize) -> Result<Vec<R>, RecordError> {
    let rows = records
        .iter()
        .map(|record| Ok((record.id(), displayed_attribute(record, column)?)))
        .collect::<Result<Vec<_>, RecordError>>()?;

    let mut remaining: Vec<Option<&R>> = records.iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(records.len());
    for id in sort_by_column(&rows) {
        // Take the first record still unclaimed with this id
        if let Some(slot) = remaining
            .iter_mut()
            .find(|slot| slot.map(|record| record.id() == id).unwrap_or(false))
        {
            if let Some(record) = slot.take() {
                ordered.push(record.clone());
            }
        }
    }
    Ok(ordered)
}

/// Records whose attribute `column` contains `query`, ignoring case
pub fn search_records<R: Record>(
    records: &[R],
    column: usize,
    query: &str,
) -> Result<Vec<R>, RecordError> {
    let needle = query.to_lowercase();
    let mut matches = Vec::new();
    for record in records {
        if displayed_attribute(record, column)?.to_lowercase().contains(&needle) {
            matches.push(record.clone());
        }
    }
    Ok(matches)
}
