//! Synthesis orchestration: the per-document state machine.
//!
//! A document run ends in one of four states: Skipped (fingerprint record
//! matches, artifacts reused), Completed (every chunk synthesized, record
//! committed), PartiallyFailed (some chunks failed, record left untouched),
//! or Aborted (surfaced as an error before any synthesis).

use crate::error::{PodcastError, Result};
use crate::extract::extract_text;
use crate::hash;
use crate::text::{chunk_document, TextChunk};
use crate::tts::TtsBackend;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// The identity under which a document's artifacts are grouped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBase {
    pub dir: PathBuf,
    pub stem: String,
}

impl OutputBase {
    /// Path of the artifact for a 1-based chunk index: `<stem>_<index>.mp3`.
    pub fn artifact_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}_{}.mp3", self.stem, index))
    }
}

/// Terminal state of a document run that produced (or reused) output.
#[derive(Debug)]
pub enum Outcome {
    /// Document unchanged; existing artifacts reused without synthesis.
    Skipped(OutputBase),
    /// Every chunk synthesized; fingerprint record committed.
    Completed(OutputBase),
    /// Some chunks failed; the fingerprint record was not updated.
    PartiallyFailed {
        base: OutputBase,
        succeeded: usize,
        total: usize,
    },
}

impl Outcome {
    pub fn base(&self) -> &OutputBase {
        match self {
            Outcome::Skipped(base) | Outcome::Completed(base) => base,
            Outcome::PartiallyFailed { base, .. } => base,
        }
    }
}

/// Optional notifier invoked when synthesis is about to start. Decorative
/// (cue sounds); not part of the document state machine.
type CueFn = Box<dyn Fn() + Send + Sync>;

/// Drives extraction, chunking, synthesis, and fingerprint commits for one
/// document at a time.
pub struct Pipeline<'a> {
    backend: &'a dyn TtsBackend,
    output_dir: PathBuf,
    voice: String,
    chunk_size: usize,
    force: bool,
    cue: Option<CueFn>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        backend: &'a dyn TtsBackend,
        output_dir: PathBuf,
        voice: String,
        chunk_size: usize,
        force: bool,
    ) -> Self {
        Self {
            backend,
            output_dir,
            voice,
            chunk_size,
            force,
            cue: None,
        }
    }

    /// Attach a notifier fired once per document, just before synthesis
    /// begins. Skipped and aborted documents never fire it.
    pub fn with_cue(mut self, cue: impl Fn() + Send + Sync + 'static) -> Self {
        self.cue = Some(Box::new(cue));
        self
    }

    /// Process one document. `fixed_stem` overrides the stem derived from the
    /// source filename.
    ///
    /// Errors returned here correspond to the Aborted state: nothing was
    /// synthesized and no artifacts should be played.
    pub async fn process_document(
        &self,
        doc_path: &Path,
        fixed_stem: Option<&str>,
    ) -> Result<Outcome> {
        // Fingerprint first; an unreadable source aborts unless forced.
        let doc_fingerprint = match hash::fingerprint(doc_path) {
            Ok(fp) => Some(fp),
            Err(e) if self.force => {
                warn!("{}; continuing because --force is set", e);
                None
            }
            Err(e) => return Err(e),
        };

        let stem = match fixed_stem {
            Some(name) => name.to_string(),
            None => doc_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".to_string()),
        };
        let base = OutputBase {
            dir: self.output_dir.clone(),
            stem,
        };

        fs::create_dir_all(&self.output_dir)?;

        // Unchanged document with a committed record: reuse existing output.
        if !self.force && doc_fingerprint.is_some() {
            if let Some(stored) = hash::read_record(&self.output_dir, &base.stem) {
                if hash::is_unchanged(doc_path, &stored)? {
                    eprintln!("Document unchanged, using existing audio files.");
                    return Ok(Outcome::Skipped(base));
                }
            }
        }

        eprintln!("Extracting content from {}", doc_path.display());
        let content = extract_text(doc_path)?;
        if content.trim().is_empty() {
            return Err(PodcastError::EmptyContent {
                path: doc_path.to_path_buf(),
            });
        }

        let chunks = chunk_document(&content, self.chunk_size);
        if chunks.is_empty() {
            return Err(PodcastError::EmptyContent {
                path: doc_path.to_path_buf(),
            });
        }
        eprintln!("Document split into {} chunks", chunks.len());

        if let Some(cue) = &self.cue {
            cue();
        }

        let succeeded = self.synthesize_chunks(&base, &chunks).await?;
        let total = chunks.len();

        if succeeded == total {
            if let Some(fp) = doc_fingerprint {
                hash::write_record(&self.output_dir, &base.stem, &fp)?;
                eprintln!("All {} chunks generated successfully. Hash saved.", total);
            } else {
                eprintln!("All {} chunks generated (no fingerprint to save).", total);
            }
            Ok(Outcome::Completed(base))
        } else {
            warn!("Only {}/{} chunks generated successfully; hash not updated.", succeeded, total);
            if hash::read_record(&self.output_dir, &base.stem).is_some() {
                warn!(
                    "Existing hash record for '{}' may be stale; remove {} to force regeneration without --force",
                    base.stem,
                    hash::record_path(&self.output_dir, &base.stem).display()
                );
            }
            Ok(Outcome::PartiallyFailed {
                base,
                succeeded,
                total,
            })
        }
    }

    /// Synthesize each chunk in order, returning the number that ended up
    /// with a non-empty artifact on disk.
    async fn synthesize_chunks(&self, base: &OutputBase, chunks: &[TextChunk]) -> Result<usize> {
        let pb = ProgressBar::new(chunks.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let mut succeeded = 0;

        for chunk in chunks {
            let artifact = base.artifact_path(chunk.index);
            pb.set_message(
                artifact
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            );

            // Presence-only resume heuristic for runs that failed partway.
            if !self.force && artifact.exists() {
                succeeded += 1;
                pb.inc(1);
                continue;
            }

            match self.backend.synthesize(&chunk.text, &artifact, &self.voice).await {
                Ok(()) => {}
                Err(e) => {
                    error!(
                        "{}",
                        PodcastError::Synthesis {
                            index: chunk.index,
                            message: e.to_string(),
                        }
                    );
                    remove_partial_artifact(&artifact);
                    pb.inc(1);
                    continue;
                }
            }

            // A call that returned success but left a missing or empty file
            // still counts as a failed chunk.
            if artifact_is_valid(&artifact) {
                succeeded += 1;
            } else {
                error!(
                    "{}",
                    PodcastError::Synthesis {
                        index: chunk.index,
                        message: format!(
                            "audio file {} was not created or is empty",
                            artifact.display()
                        ),
                    }
                );
            }
            pb.inc(1);
        }

        pb.finish_and_clear();
        Ok(succeeded)
    }
}

/// Existence plus non-zero size is the sole validity check for artifacts.
fn artifact_is_valid(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

fn remove_partial_artifact(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!("Could not remove partial file {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// A configurable TTS backend that records every synthesized chunk.
    struct MockBackend {
        call_count: AtomicUsize,
        /// 1-based chunk indices (by call order) that fail
        fail_on_calls: HashSet<usize>,
        /// When true, "successful" calls write zero bytes
        write_empty: bool,
    }

    impl MockBackend {
        fn always_succeeds() -> Self {
            Self {
                call_count: AtomicUsize::new(0),
                fail_on_calls: HashSet::new(),
                write_empty: false,
            }
        }

        fn fails_on_calls(calls: &[usize]) -> Self {
            Self {
                fail_on_calls: calls.iter().copied().collect(),
                ..Self::always_succeeds()
            }
        }

        fn writes_empty_files() -> Self {
            Self {
                write_empty: true,
                ..Self::always_succeeds()
            }
        }

        fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TtsBackend for MockBackend {
        async fn synthesize(&self, _text: &str, output_path: &Path, _voice: &str) -> Result<()> {
            let call_num = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on_calls.contains(&call_num) {
                // Simulate a partial write before the failure
                fs::write(output_path, b"partial").unwrap();
                return Err(PodcastError::Api {
                    message: "mock failure".to_string(),
                    status_code: Some(500),
                });
            }

            let bytes: &[u8] = if self.write_empty { b"" } else { b"mock audio" };
            fs::write(output_path, bytes).unwrap();
            Ok(())
        }
    }

    fn write_doc(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn pipeline<'a>(backend: &'a MockBackend, dir: &TempDir, force: bool) -> Pipeline<'a> {
        Pipeline::new(
            backend,
            dir.path().join("out"),
            "nova".to_string(),
            5,
            force,
        )
    }

    #[tokio::test]
    async fn test_full_success_commits_record() {
        let dir = TempDir::new().unwrap();
        let doc = write_doc(&dir, "doc.txt", "a bb ccc dddd");
        let backend = MockBackend::always_succeeds();

        let outcome = pipeline(&backend, &dir, false)
            .process_document(&doc, None)
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::Completed(_)));
        assert_eq!(backend.call_count(), 3);

        let out = dir.path().join("out");
        for i in 1..=3 {
            assert!(out.join(format!("doc_{}.mp3", i)).exists());
        }
        let record = hash::read_record(&out, "doc").unwrap();
        assert_eq!(record, hash::fingerprint(&doc).unwrap());
    }

    #[tokio::test]
    async fn test_unchanged_document_is_skipped_without_synthesis() {
        let dir = TempDir::new().unwrap();
        let doc = write_doc(&dir, "doc.txt", "a bb ccc dddd");
        let backend = MockBackend::always_succeeds();
        let p = pipeline(&backend, &dir, false);

        p.process_document(&doc, None).await.unwrap();
        assert_eq!(backend.call_count(), 3);

        let outcome = p.process_document(&doc, None).await.unwrap();
        assert!(matches!(outcome, Outcome::Skipped(_)));
        assert_eq!(backend.call_count(), 3, "skip path must not synthesize");
    }

    #[tokio::test]
    async fn test_changed_document_regenerates() {
        let dir = TempDir::new().unwrap();
        let doc = write_doc(&dir, "doc.txt", "a bb ccc dddd");
        let backend = MockBackend::always_succeeds();
        let p = pipeline(&backend, &dir, false);

        p.process_document(&doc, None).await.unwrap();
        fs::write(&doc, "a bb ccc eeee").unwrap();

        let outcome = p.process_document(&doc, None).await.unwrap();
        assert!(matches!(outcome, Outcome::Completed(_)));
        // Artifacts existed from the first run, but the third one differs
        // only in content; presence-based resume skips all three. The record
        // must still be refreshed to the new fingerprint.
        let record = hash::read_record(&dir.path().join("out"), "doc").unwrap();
        assert_eq!(record, hash::fingerprint(&doc).unwrap());
    }

    #[tokio::test]
    async fn test_partial_failure_does_not_commit_record() {
        let dir = TempDir::new().unwrap();
        let doc = write_doc(&dir, "doc.txt", "a bb ccc dddd");
        let backend = MockBackend::fails_on_calls(&[2]);

        let outcome = pipeline(&backend, &dir, false)
            .process_document(&doc, None)
            .await
            .unwrap();

        match outcome {
            Outcome::PartiallyFailed { succeeded, total, .. } => {
                assert_eq!(succeeded, 2);
                assert_eq!(total, 3);
            }
            other => panic!("expected PartiallyFailed, got {:?}", other),
        }

        let out = dir.path().join("out");
        assert!(hash::read_record(&out, "doc").is_none());
        // The failed chunk's partial file was cleaned up
        assert!(!out.join("doc_2.mp3").exists());
        assert!(out.join("doc_1.mp3").exists());
        assert!(out.join("doc_3.mp3").exists());
    }

    #[tokio::test]
    async fn test_partial_failure_leaves_existing_record_untouched() {
        let dir = TempDir::new().unwrap();
        let doc = write_doc(&dir, "doc.txt", "a bb ccc dddd");
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        hash::write_record(&out, "doc", "stale-fingerprint").unwrap();

        let backend = MockBackend::fails_on_calls(&[1, 2, 3]);
        let outcome = pipeline(&backend, &dir, false)
            .process_document(&doc, None)
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::PartiallyFailed { succeeded: 0, .. }));
        assert_eq!(
            hash::read_record(&out, "doc"),
            Some("stale-fingerprint".to_string())
        );
    }

    #[tokio::test]
    async fn test_empty_artifact_counts_as_failure() {
        let dir = TempDir::new().unwrap();
        let doc = write_doc(&dir, "doc.txt", "hello");
        let backend = MockBackend::writes_empty_files();

        let outcome = pipeline(&backend, &dir, false)
            .process_document(&doc, None)
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            Outcome::PartiallyFailed { succeeded: 0, total: 1, .. }
        ));
        assert!(hash::read_record(&dir.path().join("out"), "doc").is_none());
    }

    #[tokio::test]
    async fn test_existing_artifacts_resumed_without_calls() {
        let dir = TempDir::new().unwrap();
        let doc = write_doc(&dir, "doc.txt", "a bb ccc dddd");
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("doc_1.mp3"), b"existing audio").unwrap();

        let backend = MockBackend::always_succeeds();
        let outcome = pipeline(&backend, &dir, false)
            .process_document(&doc, None)
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::Completed(_)));
        assert_eq!(backend.call_count(), 2, "chunk 1 should be reused");
    }

    #[tokio::test]
    async fn test_force_regenerates_existing_artifacts() {
        let dir = TempDir::new().unwrap();
        let doc = write_doc(&dir, "doc.txt", "a bb ccc dddd");
        let backend = MockBackend::always_succeeds();
        let p = pipeline(&backend, &dir, true);

        p.process_document(&doc, None).await.unwrap();
        let outcome = p.process_document(&doc, None).await.unwrap();

        assert!(matches!(outcome, Outcome::Completed(_)));
        assert_eq!(backend.call_count(), 6, "force must resynthesize everything");
    }

    #[tokio::test]
    async fn test_empty_document_aborts() {
        let dir = TempDir::new().unwrap();
        let doc = write_doc(&dir, "doc.txt", "   \n\t  ");
        let backend = MockBackend::always_succeeds();

        let err = pipeline(&backend, &dir, false)
            .process_document(&doc, None)
            .await
            .unwrap_err();

        assert!(matches!(err, PodcastError::EmptyContent { .. }));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_document_aborts_without_force() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::always_succeeds();

        let err = pipeline(&backend, &dir, false)
            .process_document(&dir.path().join("missing.txt"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, PodcastError::Hashing { .. }));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cue_fires_before_synthesis_but_not_on_skip() {
        let dir = TempDir::new().unwrap();
        let doc = write_doc(&dir, "doc.txt", "a bb ccc dddd");
        let backend = MockBackend::always_succeeds();

        let cue_count = std::sync::Arc::new(AtomicUsize::new(0));
        let counter = cue_count.clone();
        let p = pipeline(&backend, &dir, false)
            .with_cue(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        let outcome = p.process_document(&doc, None).await.unwrap();
        assert!(matches!(outcome, Outcome::Completed(_)));
        assert_eq!(cue_count.load(Ordering::SeqCst), 1);

        // Unchanged document: skipped, so the cue stays quiet.
        let outcome = p.process_document(&doc, None).await.unwrap();
        assert!(matches!(outcome, Outcome::Skipped(_)));
        assert_eq!(cue_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cue_not_fired_on_abort() {
        let dir = TempDir::new().unwrap();
        let doc = write_doc(&dir, "doc.txt", "   ");
        let backend = MockBackend::always_succeeds();

        let cue_count = std::sync::Arc::new(AtomicUsize::new(0));
        let counter = cue_count.clone();
        let p = pipeline(&backend, &dir, false)
            .with_cue(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        assert!(p.process_document(&doc, None).await.is_err());
        assert_eq!(cue_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fixed_stem_overrides_filename() {
        let dir = TempDir::new().unwrap();
        let doc = write_doc(&dir, "doc.txt", "hello world");
        let backend = MockBackend::always_succeeds();

        let outcome = pipeline(&backend, &dir, false)
            .process_document(&doc, Some("episode_1"))
            .await
            .unwrap();

        assert_eq!(outcome.base().stem, "episode_1");
        let out = dir.path().join("out");
        assert!(out.join("episode_1_1.mp3").exists());
        assert!(out.join("episode_1_hash.txt").exists());
    }
}
