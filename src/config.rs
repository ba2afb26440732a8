//! doc2pod configuration management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Character budget per TTS request. The API rejects inputs over 4096
/// characters; 4050 leaves headroom.
pub const DEFAULT_CHUNK_SIZE: usize = 4050;

const DEFAULT_OUTPUT_DIR: &str = "audio_output";
const DEFAULT_VOICE: &str = "nova";
const DEFAULT_MODEL: &str = "gpt-4o-mini-tts";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// OpenAI API key. The only required field.
    pub api_key: String,

    /// Directory where audio files and fingerprint records are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Default voice (alloy, echo, fable, onyx, nova, shimmer, ...)
    #[serde(default = "default_voice")]
    pub voice: String,

    /// TTS model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Character budget per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_voice() -> String {
    DEFAULT_VOICE.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Config {
    /// Get the config file path: ~/.config/doc2pod/config.toml
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("doc2pod")
            .join("config.toml"))
    }

    /// Load config from file. A missing file or missing `api_key` is fatal.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            anyhow::bail!(
                "Config file not found: {}\n\
                 Create it with at least:\n\n\
                 \x20 api_key = \"sk-...\"",
                path.display()
            );
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }
}
