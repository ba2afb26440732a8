//! Error taxonomy for document processing.
//!
//! Everything here is recoverable at the document level: folder mode logs the
//! error and moves on to the next document. Only configuration loading, which
//! goes through `anyhow` in `main`, is fatal to the process.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PodcastError {
    #[error("failed to read document {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("failed to fingerprint {path}: {source}")]
    Hashing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("document {path} contains no readable text")]
    EmptyContent { path: PathBuf },

    #[error("synthesis failed for chunk {index}: {message}")]
    Synthesis { index: usize, message: String },

    #[error("TTS API error{}: {message}", status_code.map(|c| format!(" (HTTP {})", c)).unwrap_or_default())]
    Api {
        message: String,
        status_code: Option<u16>,
    },

    #[error("playback failed for {path}: {message}")]
    Playback { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PodcastError>;
