//! Combining records from several backends.

use super::Record;
use crate::extract::tally::IpTally;
use serde_json::Value;
use std::collections::HashMap;

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Merges per-backend record lists into one record per `query`.
///
/// `batches` is in backend priority order: on a conflicting key the earlier
/// backend keeps its value unless that value is null or an empty string.
/// Records keep the order in which their address was first seen; records
/// without a `query` are dropped.
pub fn merge_records(batches: Vec<Vec<Record>>) -> Vec<Record> {
    let mut merged: Vec<Record> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in batches.into_iter().flatten() {
        let Some(query) = record.get("query").and_then(Value::as_str).map(str::to_string) else {
            continue;
        };

        match index.get(&query).copied() {
            Some(position) => {
                let target = &mut merged[position];
                for (key, value) in record {
                    let keep = target.get(&key).is_some_and(|existing| !is_blank(existing));
                    if !keep {
                        target.insert(key, value);
                    }
                }
            }
            None => {
                index.insert(query, merged.len());
                merged.push(record);
            }
        }
    }

    merged
}

/// Sets `count` on every record whose address is in `tally`.
pub fn attach_counts(records: &mut [Record], tally: &IpTally) {
    for record in records.iter_mut() {
        let count = record
            .get("query")
            .and_then(Value::as_str)
            .and_then(|query| tally.get(query));
        if let Some(count) = count {
            record.insert("count".into(), count.into());
        }
    }
}
