//! CSV output.
//!
//! Cells are flat, so structured values are flattened first: lists become a
//! `" | "`-joined string and objects expand into one `column.key` column per
//! key, appended to the header row.

use super::resolve_headers;
use crate::resolvers::Record;
use anyhow::Result;
use serde_json::Value;
use std::io::Write;

pub const LIST_SEPARATOR: &str = " | ";

/// Text of a single cell. Null is empty; nested objects inside lists are
/// written as JSON.
pub fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(items) => items.iter().map(cell).collect::<Vec<_>>().join(LIST_SEPARATOR),
        Value::Object(_) => value.to_string(),
    }
}

/// Flattens list and object columns named in `headers`. Returns the rows and
/// the header row extended with every `column.key` column seen.
pub fn flatten_records(records: &[Record], headers: &[String]) -> (Vec<Record>, Vec<String>) {
    let mut headers = headers.to_vec();
    let mut rows = Vec::with_capacity(records.len());
    let base_len = headers.len();

    for record in records {
        let mut row = record.clone();
        for header in headers[..base_len].to_vec() {
            match record.get(&header) {
                Some(list @ Value::Array(_)) => {
                    row.insert(header, Value::String(cell(list)));
                }
                Some(Value::Object(map)) => {
                    for (key, value) in map {
                        let column = format!("{}.{}", header, key);
                        if !headers.contains(&column) {
                            headers.push(column.clone());
                        }
                        row.insert(column, value.clone());
                    }
                }
                _ => {}
            }
        }
        rows.push(row);
    }

    (rows, headers)
}

/// Writes a header row and one row per record; only header columns are
/// written.
pub fn write_csv<W: Write>(writer: W, records: &[Record], headers: &[String]) -> Result<()> {
    let headers = resolve_headers(records, headers);
    let mut writer = ::csv::Writer::from_writer(writer);
    if headers.is_empty() {
        writer.flush()?;
        return Ok(());
    }

    let (rows, headers) = flatten_records(records, &headers);
    writer.write_record(&headers)?;
    for row in &rows {
        writer.write_record(headers.iter().map(|h| row.get(h).map(cell).unwrap_or_default()))?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn headers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_cells() {
        assert_eq!(cell(&Value::Null), "");
        assert_eq!(cell(&json!(true)), "true");
        assert_eq!(cell(&json!(37.751)), "37.751");
        assert_eq!(cell(&json!(["a.example", "b.example"])), "a.example | b.example");
    }

    #[test]
    fn test_flatten_lists_and_objects() {
        let records = vec![
            record(json!({
                "query": "8.8.8.8",
                "resolutions": ["dns.google", "a.example"],
                "whois": {"OtherRemarks": "", "NetRange": "8.8.8.0 - 8.8.8.255"}
            })),
            record(json!({"query": "1.1.1.1", "whois": {"Country": "AU"}})),
        ];

        let (rows, headers) =
            flatten_records(&records, &headers(&["query", "resolutions", "whois"]));
        assert_eq!(
            headers,
            vec![
                "query",
                "resolutions",
                "whois",
                "whois.OtherRemarks",
                "whois.NetRange",
                "whois.Country"
            ]
        );
        assert_eq!(rows[0]["resolutions"], "dns.google | a.example");
        assert_eq!(rows[0]["whois.NetRange"], "8.8.8.0 - 8.8.8.255");
        assert_eq!(rows[1]["whois.Country"], "AU");
    }

    #[test]
    fn test_write_csv_only_header_columns() {
        let records = vec![
            record(json!({"query": "8.8.8.8", "country": "United States", "lat": 37.751})),
            record(json!({"query": "1.1.1.1", "mobile": false})),
        ];

        let mut out = Vec::new();
        write_csv(&mut out, &records, &headers(&["query", "country", "mobile"])).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "query,country,mobile\n8.8.8.8,United States,\n1.1.1.1,,false\n"
        );
    }

    #[test]
    fn test_default_headers_from_first_record() {
        let records = vec![record(json!({"query": "8.8.8.8", "count": 3}))];
        let mut out = Vec::new();
        write_csv(&mut out, &records, &[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "query,count\n8.8.8.8,3\n");
    }

    #[test]
    fn test_empty_report() {
        let mut out = Vec::new();
        write_csv(&mut out, &[], &[]).unwrap();
        assert!(out.is_empty());
    }
}
