//! Change detection via content fingerprints.
//!
//! A fingerprint is the SHA-256 digest of the full raw bytes of the source
//! document, stored as lowercase hex in `<stem>_hash.txt` next to the audio
//! artifacts. The record is committed only after every chunk of a run
//! synthesized successfully, so a matching record means the existing
//! artifacts are complete and current.

use crate::error::{PodcastError, Result};
use log::warn;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Compute the fingerprint of a file's full contents.
///
/// An unreadable file is a `Hashing` error, which callers must not conflate
/// with "the document changed".
pub fn fingerprint(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| PodcastError::Hashing {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Path of the fingerprint record for a stem: `<output_dir>/<stem>_hash.txt`.
pub fn record_path(output_dir: &Path, stem: &str) -> PathBuf {
    output_dir.join(format!("{}_hash.txt", stem))
}

/// Read the stored fingerprint for a stem, if any.
///
/// An unreadable record is treated as absent (with a warning), which makes
/// the caller regenerate rather than trust stale state.
pub fn read_record(output_dir: &Path, stem: &str) -> Option<String> {
    let path = record_path(output_dir, stem);
    if !path.exists() {
        return None;
    }

    match fs::read_to_string(&path) {
        Ok(contents) => Some(contents.trim().to_string()),
        Err(e) => {
            warn!("Could not read hash record {}: {}. Regenerating.", path.display(), e);
            None
        }
    }
}

/// Write (or overwrite) the fingerprint record for a stem.
pub fn write_record(output_dir: &Path, stem: &str, fingerprint: &str) -> Result<()> {
    fs::write(record_path(output_dir, stem), fingerprint)?;
    Ok(())
}

/// True iff a freshly computed fingerprint matches `stored` byte-for-byte.
pub fn is_unchanged(path: &Path, stored: &str) -> Result<bool> {
    Ok(fingerprint(path)? == stored)
}
