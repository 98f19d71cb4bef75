use std::path::PathBuf;
use thiserror::Error;

/// Recoverable failures while resolving a single remote resource. Callers log
/// these and carry on without the resource embedded.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("malformed resource reference `{reference}`: {reason}")]
    MalformedReference { reference: String, reason: String },

    #[error("failed to fetch {url} - status: {status}")]
    Fetch {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("request for {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("asset cache I/O on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures that abort the whole run before an output file is written.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("missing source file {}: {source}", .path.display())]
    InputMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("output file must be different from input file ({})", .path.display())]
    OutputCollision { path: PathBuf },

    #[error("cannot prepare asset cache directory {}: {source}", .path.display())]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("cannot write output {}: {source}", .path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
