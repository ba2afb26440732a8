//! TTS backend trait and factory.

pub mod openai;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// A text-to-speech engine that writes audio for one chunk of text.
#[async_trait]
pub trait TtsBackend: Send + Sync {
    /// Synthesize `text` to an audio file at `output_path`.
    ///
    /// May leave a partial file behind on failure; the caller is responsible
    /// for cleanup.
    async fn synthesize(&self, text: &str, output_path: &Path, voice: &str) -> Result<()>;
}

/// Create the default backend for the given API credential and model.
pub fn create_backend(api_key: String, model: String) -> Box<dyn TtsBackend> {
    Box::new(openai::OpenAiBackend::new(api_key, model))
}
