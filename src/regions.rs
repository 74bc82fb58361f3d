//! Region reference file loader.
//!
//! The reference file is a CSV table in a legacy 8-bit encoding (CP949 by
//! default). It maps ISO alpha-3 codes to a continent/region name.

use crate::error::{EtlError, Result};
use crate::models::RegionMap;
use csv::ReaderBuilder;
use encoding_rs::Encoding;
use std::path::{Path, PathBuf};

/// Header of the code column in the published reference file.
pub const CODE_COLUMN: &str = "국제표준화기구(ISO)(alpha3)";
/// Header of the region column in the published reference file.
pub const REGION_COLUMN: &str = "대륙명_공통 대륙코드";

/// Loads a [`RegionMap`] from disk.
#[derive(Debug, Clone)]
pub struct RegionLoader {
    path: PathBuf,
    encoding: &'static Encoding,
}

impl RegionLoader {
    /// Loader for `path` using the default `windows-949` encoding.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            encoding: encoding_rs::EUC_KR,
        }
    }

    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and decode the file.
    ///
    /// ### Errors
    /// - [`EtlError::MissingReferenceFile`] if the file does not exist
    /// - [`EtlError::Decode`] on bytes that are invalid in the configured
    ///   encoding, or on malformed CSV
    pub fn load(&self) -> Result<RegionMap> {
        let bytes = std::fs::read(&self.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EtlError::MissingReferenceFile {
                    path: self.path.clone(),
                }
            } else {
                self.decode_error(e.to_string())
            }
        })?;

        let (text, had_errors) = self.encoding.decode_without_bom_handling(&bytes);
        if had_errors {
            return Err(self.decode_error(format!(
                "invalid byte sequence for {}",
                self.encoding.name()
            )));
        }

        let map = parse_region_table(&text).map_err(|e| self.decode_error(e.to_string()))?;
        log::debug!(
            "loaded {} region codes from {}",
            map.len(),
            self.path.display()
        );
        Ok(map)
    }

    fn decode_error(&self, reason: String) -> EtlError {
        EtlError::Decode {
            path: self.path.clone(),
            reason,
        }
    }
}

/// Parse already-decoded CSV text into a [`RegionMap`].
///
/// Uses the named reference columns when the header has them, otherwise the
/// first two columns. Rows with an empty code are skipped.
pub fn parse_region_table(text: &str) -> std::result::Result<RegionMap, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = rdr.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h == name);
    let (code_idx, region_idx) = match (position(CODE_COLUMN), position(REGION_COLUMN)) {
        (Some(c), Some(r)) => (c, r),
        _ => (0, 1),
    };

    let mut pairs = Vec::new();
    for row in rdr.records() {
        let row = row?;
        let code = row.get(code_idx).unwrap_or_default();
        let region = row.get(region_idx).unwrap_or_default();
        // Blank regions fall through to `Unknown` at lookup time.
        if code.is_empty() || region.is_empty() {
            continue;
        }
        pairs.push((code.to_string(), region.to_string()));
    }
    Ok(pairs.into_iter().collect())
}
