use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("cannot read {path}: {source}")]
    Walk {
        path: String,
        #[source]
        source: walkdir::Error,
    },
    #[error("cannot read metadata for {path}: {source}")]
    Metadata {
        path: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("environment variable {0} is not set")]
    MissingCredential(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("advisor returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("advisor returned no suggestions")]
    EmptyResponse,
    #[error("malformed advisor response: {0}")]
    Malformed(String),
    #[error("unusable suggestion: {0}")]
    InvalidSuggestion(String),
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("source does not exist: {0}")]
    MissingSource(String),
    #[error("destination already exists: {0}")]
    DestinationExists(String),
    #[error("destination directory does not exist: {0}")]
    MissingParent(String),
    #[error("cannot {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: String,
        #[source]
        source: io::Error,
    },
}
