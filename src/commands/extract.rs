//! Extraction-only command.
//!
//! Finds and counts IP addresses without contacting any lookup service.
//! Every distinct address becomes one record:
//!
//! ```json
//! {"query": "8.8.8.8", "count": 3, "message": "No resolve"}
//! ```
//!
//! # Usage
//!
//! ```bash
//! ip-context extract /var/log/nginx -t csv -w addresses.csv
//! zcat auth.log.gz | ip-context extract --include-bogon
//! ```

use super::{CommonArgs, Settings};
use crate::extract::sources::extract_all;
use crate::extract::tally::IpTally;
use crate::output::{write_records, Destination};
use crate::resolvers::Record;
use crate::utils::format::format_number;
use anyhow::{Context, Result};
use clap::Args;
use log::warn;

/// Options of the `extract` command.
#[derive(Debug, Clone, Default, Args)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

pub const DEFAULT_FIELDS: &[&str] = &["query", "count", "message"];

/// One `{query, count, message}` record per address, in first-seen order.
pub fn tally_records(tally: &IpTally) -> Vec<Record> {
    tally
        .iter()
        .map(|(ip, count)| {
            let mut record = Record::new();
            record.insert("query".into(), ip.into());
            record.insert("count".into(), count.into());
            record.insert("message".into(), "No resolve".into());
            record
        })
        .collect()
}

pub fn run(settings: &Settings) -> Result<()> {
    let tally = extract_all(&settings.sources, &settings.extract_options())
        .context("Failed to extract IP addresses")?;
    if tally.is_empty() {
        warn!("No IP addresses found in the input");
    }

    let headers: Vec<String> = if settings.fields.is_empty() {
        DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect()
    } else {
        settings.fields.clone()
    };
    write_records(
        &tally_records(&tally),
        &headers,
        settings.output_format,
        &settings.destination,
    )?;

    eprintln!();
    eprintln!("=== Summary ===");
    eprintln!("Unique addresses: {}", format_number(tally.len()));
    eprintln!("Total occurrences: {}", format_number(tally.total()));
    if let Destination::File(path) = &settings.destination {
        eprintln!(
            "{} written to: {}",
            settings.output_format.to_string().to_uppercase(),
            path.display()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_records() {
        let mut tally = IpTally::new();
        tally.record("8.8.8.8");
        tally.record("1.1.1.1");
        tally.record("8.8.8.8");

        let records = tally_records(&tally);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["query"], "8.8.8.8");
        assert_eq!(records[0]["count"], 2);
        assert_eq!(records[0]["message"], "No resolve");
        assert_eq!(records[1]["query"], "1.1.1.1");
        assert_eq!(records[1]["count"], 1);
    }
}
