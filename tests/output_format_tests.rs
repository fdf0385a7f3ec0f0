/// Tests that the CSV and JSON writers describe the same records
use ip_context_tools::output::{write_records, write_to, Destination, OutputFormat};
use ip_context_tools::resolvers::Record;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use tempfile::TempDir;

fn sample_records() -> Vec<Record> {
    let rows = vec![
        json!({"query": "8.8.8.8", "count": 3, "country": "United States", "as": "AS15169 Google LLC", "proxy": false}),
        json!({"query": "1.1.1.1", "count": 1, "country": "Australia", "as": "AS13335 Cloudflare, Inc.", "proxy": false}),
        json!({"query": "2001:4860:4860::8888", "count": 7, "country": "United States", "as": "AS15169 Google LLC", "proxy": true}),
    ];
    rows.into_iter()
        .map(|row| match row {
            Value::Object(map) => map,
            _ => unreachable!(),
        })
        .collect()
}

fn headers() -> Vec<String> {
    ["query", "count", "country", "as", "proxy"]
        .iter()
        .map(|h| h.to_string())
        .collect()
}

/// Renders a JSON value the way it appears in a CSV cell
fn as_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

type Row = BTreeMap<String, String>;

fn rows_from_csv(content: &str) -> Vec<Row> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let headers = reader.headers().unwrap().clone();
    reader
        .records()
        .map(|record| {
            let record = record.unwrap();
            headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect()
        })
        .collect()
}

fn rows_from_json(values: &[Value]) -> Vec<Row> {
    values
        .iter()
        .map(|value| {
            value
                .as_object()
                .unwrap()
                .iter()
                .map(|(k, v)| (k.clone(), as_cell(v)))
                .collect()
        })
        .collect()
}

#[test]
fn test_csv_and_json_describe_same_records() {
    let records = sample_records();
    let headers = headers();

    let mut csv_out = Vec::new();
    write_to(&mut csv_out, &records, &headers, OutputFormat::Csv).unwrap();
    let mut json_out = Vec::new();
    write_to(&mut json_out, &records, &headers, OutputFormat::Json).unwrap();
    let mut jsonl_out = Vec::new();
    write_to(&mut jsonl_out, &records, &headers, OutputFormat::Jsonl).unwrap();

    let from_csv = rows_from_csv(&String::from_utf8(csv_out).unwrap());
    let json_values: Vec<Value> = serde_json::from_slice(&json_out).unwrap();
    let jsonl_values: Vec<Value> = String::from_utf8(jsonl_out)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(from_csv.len(), 3);
    assert_eq!(from_csv, rows_from_json(&json_values));
    assert_eq!(json_values, jsonl_values);
}

#[test]
fn test_header_subset_and_order() {
    let records = sample_records();
    let headers = vec!["country".to_string(), "query".to_string(), "missing".to_string()];

    let mut json_out = Vec::new();
    write_to(&mut json_out, &records, &headers, OutputFormat::Jsonl).unwrap();
    let first = String::from_utf8(json_out).unwrap().lines().next().unwrap().to_string();
    assert_eq!(
        first,
        r#"{"country":"United States","query":"8.8.8.8","missing":null}"#
    );

    let mut csv_out = Vec::new();
    write_to(&mut csv_out, &records, &headers, OutputFormat::Csv).unwrap();
    let csv_text = String::from_utf8(csv_out).unwrap();
    assert_eq!(csv_text.lines().next().unwrap(), "country,query,missing");
    assert_eq!(csv_text.lines().nth(1).unwrap(), "United States,8.8.8.8,");
}

#[test]
fn test_write_records_to_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.csv");

    write_records(
        &sample_records(),
        &headers(),
        OutputFormat::Csv,
        &Destination::File(path.clone()),
    )
    .unwrap();

    let rows = rows_from_csv(&fs::read_to_string(&path).unwrap());
    assert_eq!(rows[1]["as"], "AS13335 Cloudflare, Inc.");
    assert_eq!(rows[2]["proxy"], "true");
}

#[test]
fn test_write_records_bad_destination() {
    let result = write_records(
        &sample_records(),
        &headers(),
        OutputFormat::Json,
        &Destination::File("/nonexistent/dir/report.json".into()),
    );
    assert!(result.is_err());
}
