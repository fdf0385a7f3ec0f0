//! Logger initialisation.
//!
//! Log records go to stderr and are appended to a log file. Stdout is left
//! untouched so reports can be piped.

use anyhow::{Context, Result};
use log::LevelFilter;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

/// Default log file name, created in the working directory.
pub const DEFAULT_LOG_FILE: &str = "ip-context.log";

/// Writer that copies every write to stderr and an optional file.
pub struct TeeWriter {
    file: Option<Mutex<File>>,
}

impl TeeWriter {
    pub fn new(file: Option<File>) -> Self {
        Self {
            file: file.map(Mutex::new),
        }
    }
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        if let Some(file) = &self.file {
            if let Ok(mut f) = file.lock() {
                f.write_all(buf)?;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        if let Some(file) = &self.file {
            if let Ok(mut f) = file.lock() {
                f.flush()?;
            }
        }
        Ok(())
    }
}

/// Level used when `RUST_LOG` is not set.
pub fn default_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Installs the global logger.
///
/// `RUST_LOG` takes precedence over `verbose`. Calling this twice is not an
/// error; the second call keeps the first logger.
pub fn init(log_path: Option<&Path>, verbose: bool) -> Result<()> {
    let file = match log_path {
        Some(path) => Some(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?,
        ),
        None => None,
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(default_level(verbose))
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {} {}:{} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or("ip_context"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(TeeWriter::new(file))));

    // Tests and library callers may have installed a logger already.
    let _ = builder.try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_level() {
        assert_eq!(default_level(true), LevelFilter::Debug);
        assert_eq!(default_level(false), LevelFilter::Info);
    }

    #[test]
    fn test_tee_writer_appends_to_file() {
        let temp = NamedTempFile::new().unwrap();
        let file = OpenOptions::new().append(true).open(temp.path()).unwrap();
        let mut tee = TeeWriter::new(Some(file));
        tee.write_all(b"first line\n").unwrap();
        tee.write_all(b"second line\n").unwrap();
        tee.flush().unwrap();

        let mut contents = String::new();
        File::open(temp.path())
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "first line\nsecond line\n");
    }
}
