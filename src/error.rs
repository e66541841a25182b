//! Error types shared by the record reader, the partitioner and the multiscale builders.
//!
//! Public operations return [`anyhow::Result`]; the variants below are the typed
//! failures that callers may want to match on after downcasting.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed line {line} in '{}': {reason}", .path.display())]
    MalformedLine {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("unknown compressor '{0}'")]
    UnknownCompressor(String),
    #[error("unknown entropy algorithm '{0}'")]
    UnknownEntropyAlgorithm(String),
    #[error("invalid scale range: {0}")]
    InvalidScaleRange(String),
    #[error("metric input '{}' does not exist", .0.display())]
    MissingScaleFile(PathBuf),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
