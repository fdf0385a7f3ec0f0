//! XLSX workbook parser. Only string cells are scanned; formulas and numbers
//! cannot hold an address.

use super::{scan_text, IpParser};
use crate::extract::tally::IpTally;
use crate::extract::ExtractError;
use calamine::{open_workbook, Data, Reader, Xlsx};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct XlsxParser {
    ignore_bogon: bool,
}

impl XlsxParser {
    pub fn new(ignore_bogon: bool) -> Self {
        Self { ignore_bogon }
    }
}

impl IpParser for XlsxParser {
    fn name(&self) -> &'static str {
        "xlsx"
    }

    fn parse_path(&self, path: &Path, tally: &mut IpTally) -> Result<(), ExtractError> {
        let xlsx_error = |message: String| ExtractError::Xlsx {
            path: path.to_path_buf(),
            message,
        };

        let mut workbook: Xlsx<BufReader<File>> =
            open_workbook(path).map_err(|e: calamine::XlsxError| xlsx_error(e.to_string()))?;

        for sheet in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&sheet)
                .map_err(|e| xlsx_error(format!("sheet {}: {}", sheet, e)))?;
            for row in range.rows() {
                for cell in row {
                    if let Data::String(value) = cell {
                        scan_text(value, self.ignore_bogon, tally);
                    }
                }
            }
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
