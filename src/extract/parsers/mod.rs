//! Input parsers.
//!
//! Each parser turns one kind of input into IP occurrences. They all share
//! [`scan_text`], so validation and bogon filtering behave the same whether
//! an address came from a log line, a spreadsheet cell or an event record.

mod evtx;
mod plain_text;
mod xlsx;

pub use self::evtx::EvtxParser;
pub use self::plain_text::PlainTextParser;
pub use self::xlsx::XlsxParser;

use super::bogon::is_bogon;
use super::patterns::find_ips;
use super::tally::IpTally;
use super::ExtractError;
use std::io::Read;
use std::path::Path;

/// A reader of one input format.
pub trait IpParser: Send + Sync {
    /// Short format name used in log messages.
    fn name(&self) -> &'static str;

    /// Scans the file at `path`, adding every address found to `tally`.
    fn parse_path(&self, path: &Path, tally: &mut IpTally) -> Result<(), ExtractError>;

    /// Scans an already open stream such as stdin.
    fn parse_reader(
        &self,
        reader: Box<dyn Read + Send>,
        tally: &mut IpTally,
    ) -> Result<(), ExtractError>;
}

/// Records every valid address in `text`, skipping bogons when
/// `ignore_bogon` is set.
pub fn scan_text(text: &str, ignore_bogon: bool, tally: &mut IpTally) {
    for ip in find_ips(text) {
        if ignore_bogon && is_bogon(ip) {
            continue;
        }
        tally.record(ip.to_string());
    }
}

/// Picks a parser from the file extension: `.xlsx`, `.evtx`, anything else
/// is read as (possibly compressed) text.
pub fn parser_for(path: &Path, ignore_bogon: bool) -> Box<dyn IpParser> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "xlsx" => Box::new(XlsxParser::new(ignore_bogon)),
        "evtx" => Box::new(EvtxParser::new(ignore_bogon)),
        _ => Box::new(PlainTextParser::new(ignore_bogon)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_text_filters_bogons() {
        let text = "from 10.0.0.5 to 8.8.8.8, then ::1 and 2001:4860:4860::8888";

        let mut public_only = IpTally::new();
        scan_text(text, true, &mut public_only);
        assert_eq!(public_only.ips(), vec!["8.8.8.8", "2001:4860:4860::8888"]);

        let mut everything = IpTally::new();
        scan_text(text, false, &mut everything);
        assert_eq!(
            everything.ips(),
            vec!["10.0.0.5", "8.8.8.8", "::1", "2001:4860:4860::8888"]
        );
    }

    #[test]
    fn test_parser_for_extension() {
        assert_eq!(parser_for(Path::new("report.XLSX"), true).name(), "xlsx");
        assert_eq!(parser_for(Path::new("Security.evtx"), true).name(), "evtx");
        assert_eq!(parser_for(Path::new("access.log.gz"), true).name(), "plain text");
        assert_eq!(parser_for(Path::new("README"), true).name(), "plain text");
    }
}
