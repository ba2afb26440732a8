//! Sequential playback of a document's audio artifacts.

use crate::error::{PodcastError, Result};
use crate::pipeline::OutputBase;
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Discover the audio artifacts for an output base, ordered by chunk index.
///
/// Artifact filenames carry a 1-based index without zero-padding, so they are
/// sorted by the parsed numeric index rather than lexicographically (a name
/// sort would put `_10` before `_2`).
pub fn find_artifacts(base: &OutputBase) -> Result<Vec<PathBuf>> {
    static INDEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^_(\d+)\.mp3$").expect("valid regex"));

    let mut indexed: Vec<(u64, PathBuf)> = Vec::new();

    for entry in fs::read_dir(&base.dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(suffix) = name.strip_prefix(base.stem.as_str()) else {
            continue;
        };
        if let Some(caps) = INDEX.captures(suffix) {
            if let Ok(index) = caps[1].parse::<u64>() {
                indexed.push((index, path));
            }
        }
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, path)| path).collect())
}

/// Play one audio file, blocking until the sink drains.
pub fn play_file(path: &Path) -> Result<()> {
    let playback_err = |message: String| PodcastError::Playback {
        path: path.to_path_buf(),
        message,
    };

    let stream = rodio::OutputStreamBuilder::open_default_stream()
        .map_err(|e| playback_err(format!("no audio output: {}", e)))?;
    let sink = rodio::Sink::connect_new(stream.mixer());

    let file = File::open(path).map_err(|e| playback_err(e.to_string()))?;
    let source = rodio::Decoder::new(BufReader::new(file))
        .map_err(|e| playback_err(format!("decode failed: {}", e)))?;

    sink.append(source);
    sink.sleep_until_end();
    Ok(())
}

/// Play every artifact for a base in order.
///
/// A playback error on one file is logged and playback moves on to the next;
/// only an empty artifact list is reported to the caller.
pub fn play_sequence(base: &OutputBase) -> Result<()> {
    let artifacts = find_artifacts(base)?;
    if artifacts.is_empty() {
        return Err(PodcastError::Playback {
            path: base.dir.clone(),
            message: format!("no audio files found with base name {}", base.stem),
        });
    }

    let total = artifacts.len();
    for (i, artifact) in artifacts.iter().enumerate() {
        eprintln!("Playing chunk {}/{}: {}", i + 1, total, artifact.display());
        if let Err(e) = play_file(artifact) {
            warn!("{}", e);
        }
    }

    Ok(())
}

/// Play a decorative cue sound, best-effort. Cues live under
/// `~/.config/doc2pod/cues/` and are simply skipped when absent.
pub fn play_cue(name: &str) {
    let Ok(config_path) = crate::config::Config::config_path() else {
        return;
    };
    let Some(config_dir) = config_path.parent() else {
        return;
    };

    let cue = config_dir.join("cues").join(format!("{}.mp3", name));
    if !cue.exists() {
        return;
    }
    if let Err(e) = play_file(&cue) {
        warn!("Cue playback failed: {}", e);
    }
}
