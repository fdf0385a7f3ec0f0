//! Plain text parser: logs, CSV, JSON and anything else made of lines.
//! Gzip and zstd input is decompressed on the fly.

use super::{scan_text, IpParser};
use crate::extract::tally::IpTally;
use crate::extract::ExtractError;
use crate::utils::reader::{open_file, open_stream};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct PlainTextParser {
    ignore_bogon: bool,
}

impl PlainTextParser {
    pub fn new(ignore_bogon: bool) -> Self {
        Self { ignore_bogon }
    }

    fn scan_lines<R: Read>(&self, reader: R, tally: &mut IpTally) -> std::io::Result<()> {
        let mut reader = BufReader::new(reader);
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                return Ok(());
            }
            scan_text(&String::from_utf8_lossy(&line), self.ignore_bogon, tally);
        }
    }
}

impl IpParser for PlainTextParser {
    fn name(&self) -> &'static str {
        "plain text"
    }

    fn parse_path(&self, path: &Path, tally: &mut IpTally) -> Result<(), ExtractError> {
        let read_error = |message: String| ExtractError::Read {
            path: path.to_path_buf(),
            message,
        };
        let reader = open_file(path).map_err(|e| read_error(format!("{:#}", e)))?;
        self.scan_lines(reader, tally)
            .map_err(|e| read_error(e.to_string()))
    }

    fn parse_reader(
        &self,
        reader: Box<dyn Read + Send>,
        tally: &mut IpTally,
    ) -> Result<(), ExtractError> {
        let reader = open_stream(reader).map_err(|e| ExtractError::Stream(format!("{:#}", e)))?;
        self.scan_lines(reader, tally)
            .map_err(|e| ExtractError::Stream(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "\
2020-01-07 12:00:01 accepted 8.8.8.8 port 443
2020-01-07 12:00:02 rejected 999.1.1.1 and 1.2.3 and 10.1.1.1
2020-01-07 12:00:03 accepted 8.8.8.8 via 2001:4860:4860::8888
2020-01-07 12:00:04 bad 2001:4860:4860::88888:1 ok 1.1.1.1
";

    #[test]
    fn test_mixed_tokens_yield_valid_deduplicated_ips() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(SAMPLE.as_bytes()).unwrap();
        temp.flush().unwrap();

        let mut tally = IpTally::new();
        PlainTextParser::new(true)
            .parse_path(temp.path(), &mut tally)
            .unwrap();

        assert_eq!(
            tally.ips(),
            vec!["8.8.8.8", "2001:4860:4860::8888", "1.1.1.1"]
        );
        assert_eq!(tally.get("8.8.8.8"), Some(2));
        assert_eq!(tally.get("10.1.1.1"), None);
    }

    #[test]
    fn test_include_bogon() {
        let mut tally = IpTally::new();
        PlainTextParser::new(false)
            .parse_reader(Box::new(Cursor::new(SAMPLE.as_bytes().to_vec())), &mut tally)
            .unwrap();
        assert_eq!(tally.get("10.1.1.1"), Some(1));
    }

    #[test]
    fn test_gzip_file() {
        let temp = NamedTempFile::new().unwrap();
        let mut encoder = GzEncoder::new(
            std::fs::File::create(temp.path()).unwrap(),
            flate2::Compression::default(),
        );
        encoder.write_all(SAMPLE.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let mut tally = IpTally::new();
        PlainTextParser::new(true)
            .parse_path(temp.path(), &mut tally)
            .unwrap();
        assert_eq!(tally.len(), 3);
    }

    #[test]
    fn test_invalid_utf8_is_tolerated() {
        let mut data = b"\xff\xfe garbage 8.8.4.4\n".to_vec();
        data.extend_from_slice(b"1.0.0.1\n");

        let mut tally = IpTally::new();
        PlainTextParser::new(true)
            .parse_reader(Box::new(Cursor::new(data)), &mut tally)
            .unwrap();
        assert_eq!(tally.ips(), vec!["8.8.4.4", "1.0.0.1"]);
    }

    #[test]
    fn test_missing_file() {
        let mut tally = IpTally::new();
        let result = PlainTextParser::new(true)
            .parse_path(Path::new("/nonexistent/access.log"), &mut tally);
        assert!(matches!(result, Err(ExtractError::Read { .. })));
    }
}
