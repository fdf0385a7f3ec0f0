//! Windows event log parser. The XML rendering of every record is scanned,
//! which covers both system and event data fields.

use super::{scan_text, IpParser};
use crate::extract::tally::IpTally;
use crate::extract::ExtractError;
use log::warn;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct EvtxParser {
    ignore_bogon: bool,
}

impl EvtxParser {
    pub fn new(ignore_bogon: bool) -> Self {
        Self { ignore_bogon }
    }
}

impl IpParser for EvtxParser {
    fn name(&self) -> &'static str {
        "evtx"
    }

    fn parse_path(&self, path: &Path, tally: &mut IpTally) -> Result<(), ExtractError> {
        let mut log = evtx::EvtxParser::from_path(path).map_err(|e| ExtractError::Evtx {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let rendered = log.records().map(|record| record.map(|r| r.data));
        let skipped = scan_records(rendered, self.ignore_bogon, tally);
        if skipped > 0 {
            warn!(
                "Skipped {} unreadable records in {}",
                skipped,
                path.display()
            );
        }
        Ok(())
    }

    fn parse_reader(
        &self,
        _reader: Box<dyn Read + Send>,
        _tally: &mut IpTally,
    ) -> Result<(), ExtractError> {
        Err(ExtractError::StreamUnsupported {
            parser: self.name(),
        })
    }
}

/// Scans rendered record XML and returns how many records could not be read.
fn scan_records<I, E>(records: I, ignore_bogon: bool, tally: &mut IpTally) -> usize
where
    I: IntoIterator<Item = Result<String, E>>,
{
    let mut skipped = 0;
    for record in records {
        match record {
            Ok(xml) => scan_text(&xml, ignore_bogon, tally),
            Err(_) => skipped += 1,
        }
    }
    skipped
}
