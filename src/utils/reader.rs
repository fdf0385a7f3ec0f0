//! Smart file reader with automatic decompression support.
//!
//! Provides transparent decompression for gzip and zstd input so that rotated
//! or archived logs can be scanned without manual extraction.
//!
//! # Supported Formats
//!
//! - Plain text files
//! - Gzip compressed files (magic `1f 8b`, or `.gz` extension), including
//!   files made of several concatenated gzip members
//! - Zstandard compressed files (magic `28 b5 2f fd`, or `.zst` extension)
//!
//! # Examples
//!
//! ```no_run
//! use ip_context_tools::utils::reader::open_file;
//! use std::io::{BufRead, BufReader};
//!
//! // Automatically handles gzip, zstd, or plain text
//! let reader = open_file("access.log.gz").unwrap();
//! let buf_reader = BufReader::new(reader);
//!
//! for line in buf_reader.lines() {
//!     let line = line.unwrap();
//!     // Scan line...
//! }
//! ```

use anyhow::{Context, Result};
use flate2::bufread::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

/// Compression detected on an input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Zstd,
}

/// Identifies the compression of a stream from its leading bytes.
pub fn sniff_compression(head: &[u8]) -> Compression {
    if head.starts_with(&GZIP_MAGIC) {
        Compression::Gzip
    } else if head.starts_with(&ZSTD_MAGIC) {
        Compression::Zstd
    } else {
        Compression::None
    }
}

fn compression_from_extension(path: &Path) -> Compression {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "gz" => Compression::Gzip,
        "zst" => Compression::Zstd,
        _ => Compression::None,
    }
}

/// Opens a file with automatic decompression.
///
/// The leading bytes decide first; the extension is only consulted when the
/// content carries no known signature.
pub fn open_file(path: impl AsRef<Path>) -> Result<Box<dyn Read + Send>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;

    let mut buffered = BufReader::new(file);
    let sniffed = sniff_compression(buffered.fill_buf()?);
    let compression = match sniffed {
        Compression::None => compression_from_extension(path),
        other => other,
    };

    wrap(buffered, compression)
        .with_context(|| format!("Failed to create decoder for: {}", path.display()))
}

/// Wraps an arbitrary stream (stdin, sockets) with decompression detected
/// from its first bytes.
pub fn open_stream<R: Read + Send + 'static>(stream: R) -> Result<Box<dyn Read + Send>> {
    let mut buffered = BufReader::new(stream);
    let compression = sniff_compression(buffered.fill_buf()?);
    wrap(buffered, compression)
}

fn wrap<R: BufRead + Send + 'static>(
    reader: R,
    compression: Compression,
) -> Result<Box<dyn Read + Send>> {
    match compression {
        Compression::Gzip => Ok(Box::new(MultiGzDecoder::new(reader))),
        Compression::Zstd => {
            let decoder = zstd::Decoder::with_buffer(reader)?;
            Ok(Box::new(decoder))
        }
        Compression::None => Ok(Box::new(reader)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use tempfile::NamedTempFile;

    #[test]
    fn test_plain_file() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "GET / from 8.8.8.8").unwrap();
        writeln!(temp, "GET / from 1.1.1.1").unwrap();
        temp.flush().unwrap();

        let reader = open_file(temp.path()).unwrap();
        let lines: Vec<String> = BufReader::new(reader)
            .lines()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(lines, vec!["GET / from 8.8.8.8", "GET / from 1.1.1.1"]);
    }

    #[test]
    fn test_gzip_detected_without_extension() {
        use flate2::write::GzEncoder;

        let mut temp = NamedTempFile::new().unwrap();
        {
            let mut encoder = GzEncoder::new(&mut temp, flate2::Compression::default());
            writeln!(encoder, "compressed 2.2.2.2").unwrap();
            encoder.finish().unwrap();
        }
        temp.flush().unwrap();

        let mut contents = String::new();
        open_file(temp.path())
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "compressed 2.2.2.2\n");
    }

    #[test]
    fn test_concatenated_gzip_members() {
        use flate2::write::GzEncoder;

        let mut bytes = Vec::new();
        for line in ["first 8.8.8.8\n", "second 1.1.1.1\n"] {
            let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(line.as_bytes()).unwrap();
            bytes.extend(encoder.finish().unwrap());
        }

        let mut temp = NamedTempFile::with_suffix(".log.gz").unwrap();
        temp.write_all(&bytes).unwrap();
        temp.flush().unwrap();

        let reader = open_file(temp.path()).unwrap();
        let lines: Vec<String> = BufReader::new(reader)
            .lines()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(lines, vec!["first 8.8.8.8", "second 1.1.1.1"]);
    }

    #[test]
    fn test_zstd_file() {
        let mut temp = NamedTempFile::with_suffix(".zst").unwrap();
        {
            let mut encoder = zstd::Encoder::new(&mut temp, 3).unwrap();
            writeln!(encoder, "zstd line 4.4.4.4").unwrap();
            encoder.finish().unwrap();
        }
        temp.flush().unwrap();

        let reader = open_file(temp.path()).unwrap();
        let lines: Vec<String> = BufReader::new(reader)
            .lines()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(lines, vec!["zstd line 4.4.4.4"]);
    }

    #[test]
    fn test_open_stream_plain_and_gzip() {
        use flate2::write::GzEncoder;

        let mut plain = String::new();
        open_stream(std::io::Cursor::new(b"9.9.9.9\n".to_vec()))
            .unwrap()
            .read_to_string(&mut plain)
            .unwrap();
        assert_eq!(plain, "9.9.9.9\n");

        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"9.9.9.9\n").unwrap();
        let bytes = encoder.finish().unwrap();

        let mut unpacked = String::new();
        open_stream(std::io::Cursor::new(bytes))
            .unwrap()
            .read_to_string(&mut unpacked)
            .unwrap();
        assert_eq!(unpacked, "9.9.9.9\n");
    }

    #[test]
    fn test_sniff_compression() {
        assert_eq!(sniff_compression(&[0x1f, 0x8b, 0x08]), Compression::Gzip);
        assert_eq!(sniff_compression(&ZSTD_MAGIC), Compression::Zstd);
        assert_eq!(sniff_compression(b"plain"), Compression::None);
        assert_eq!(sniff_compression(&[]), Compression::None);
    }
}
