//! JSON and JSON-lines output.

use crate::resolvers::Record;
use anyhow::Result;
use serde_json::Value;
use std::io::Write;

/// Restricts each record to `headers`, in header order; missing keys become
/// null. With no headers the records are returned unchanged.
pub fn select_headers(records: &[Record], headers: &[String]) -> Vec<Record> {
    if headers.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .map(|record| {
            headers
                .iter()
                .map(|h| (h.clone(), record.get(h).cloned().unwrap_or(Value::Null)))
                .collect()
        })
        .collect()
}

/// Writes one array (`lines == false`) or one object per line.
pub fn write_json<W: Write>(
    mut writer: W,
    records: &[Record],
    headers: &[String],
    lines: bool,
) -> Result<()> {
    let rows = select_headers(records, headers);

    if lines {
        for row in &rows {
            serde_json::to_writer(&mut writer, row)?;
            writer.write_all(b"\n")?;
        }
    } else {
        serde_json::to_writer_pretty(&mut writer, &rows)?;
        writer.write_all(b"\n")?;
    }

    writer.flush()?;
    Ok(())
}
