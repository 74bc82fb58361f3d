use std::path::PathBuf;
use thiserror::Error;

/// Boxed source for sink failures, which may come from the filesystem,
/// the JSON encoder, or SQLite.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every way a run can abort.
///
/// Each stage maps its failures onto exactly one of these variants; the
/// pipeline stops at the first one it sees.
#[derive(Debug, Error)]
pub enum EtlError {
    /// The region reference file does not exist.
    #[error("region reference file not found: {}", path.display())]
    MissingReferenceFile { path: PathBuf },

    /// The region reference file exists but could not be decoded or parsed.
    #[error("cannot decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    /// The API could not be reached or answered with a non-success status.
    #[error("request to {url} failed")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered, but not with the shape we expect.
    #[error("unexpected response from {url}: {detail}")]
    Schema { url: String, detail: String },

    /// Appending a batch to a sink failed. Rows already written stay written.
    #[error("cannot write to {target}")]
    Write {
        target: String,
        #[source]
        source: BoxError,
    },

    /// Reading persisted runs back from a sink failed.
    #[error("cannot read from {target}")]
    Read {
        target: String,
        #[source]
        source: BoxError,
    },
}

impl EtlError {
    pub(crate) fn write(target: impl Into<String>, source: impl Into<BoxError>) -> Self {
        EtlError::Write {
            target: target.into(),
            source: source.into(),
        }
    }

    pub(crate) fn read(target: impl Into<String>, source: impl Into<BoxError>) -> Self {
        EtlError::Read {
            target: target.into(),
            source: source.into(),
        }
    }

    pub(crate) fn schema(url: impl Into<String>, detail: impl Into<String>) -> Self {
        EtlError::Schema {
            url: url.into(),
            detail: detail.into(),
        }
    }
}

pub type Result<T, E = EtlError> = std::result::Result<T, E>;
