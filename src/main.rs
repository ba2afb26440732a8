//! doc2pod - Convert text and Word documents into spoken audio ("podcasts")
//! using the OpenAI speech API.

mod config;
mod error;
mod extract;
mod hash;
mod pipeline;
mod player;
mod text;
mod tts;

use anyhow::{Context, Result};
use clap::Parser;
use config::Config;
use log::{error, warn};
use pipeline::{Outcome, Pipeline};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "doc2pod")]
#[command(about = "Convert documents (.docx, .txt) into spoken audio", long_about = None)]
#[command(version)]
struct Args {
    /// Path to a Word document or text file to convert
    #[arg(long, conflicts_with = "folder")]
    document: Option<PathBuf>,

    /// Path to a folder of documents to convert (non-recursive)
    #[arg(long)]
    folder: Option<PathBuf>,

    /// Directory to save the generated audio files (default from config)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Force regeneration even if the document hasn't changed
    #[arg(long)]
    force: bool,

    /// Only generate audio files, no playback
    #[arg(long)]
    download_only: bool,

    /// Voice to use for TTS (alloy, echo, fable, onyx, nova, shimmer, ...)
    #[arg(long)]
    voice: Option<String>,

    /// Don't play cue sounds between phases
    #[arg(long)]
    silent: bool,

    /// Fixed filename prefix for the audio output
    #[arg(long)]
    fixed_filename: Option<String>,
}

/// Logger setup: operator-facing warnings must be visible in a default
/// invocation, so the filter floor is `warn` rather than env_logger's
/// `error`. `RUST_LOG` still overrides.
fn log_builder() -> env_logger::Builder {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
}

#[tokio::main]
async fn main() -> Result<()> {
    log_builder().init();
    let args = Args::parse();

    // Configuration problems are the only fatal errors.
    let config = Config::load().context("Failed to load configuration")?;

    let output_dir = args.output_dir.clone().unwrap_or(config.output_dir.clone());
    let voice = args.voice.clone().unwrap_or(config.voice.clone());

    eprintln!("Document to Podcast Converter ({})", config.model);

    let backend = tts::create_backend(config.api_key.clone(), config.model.clone());
    let mut pipeline = Pipeline::new(
        backend.as_ref(),
        output_dir,
        voice,
        config.chunk_size,
        args.force,
    );
    if !args.silent {
        pipeline = pipeline.with_cue(|| player::play_cue("generate"));
    }

    if let Some(ref doc_path) = args.document {
        if !doc_path.exists() {
            anyhow::bail!("Document not found: {}", doc_path.display());
        }
        run_document(&pipeline, doc_path, args.fixed_filename.as_deref(), &args).await;
    } else if let Some(ref folder) = args.folder {
        run_folder(&pipeline, folder, &args).await?;
    } else {
        anyhow::bail!(
            "Please provide either a document path (--document) or a folder path (--folder). \
             Run 'doc2pod --help' for usage."
        );
    }

    eprintln!("All done!");
    Ok(())
}

/// Process one document and play its artifacts. Document-level failures are
/// reported, never propagated.
async fn run_document(
    pipeline: &Pipeline<'_>,
    doc_path: &Path,
    fixed_stem: Option<&str>,
    args: &Args,
) {
    eprintln!("Processing: {}", doc_path.display());

    let outcome = match pipeline.process_document(doc_path, fixed_stem).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Skipping {}: {}", doc_path.display(), e);
            return;
        }
    };

    if let Outcome::PartiallyFailed { succeeded, total, .. } = outcome {
        warn!(
            "{}: only {}/{} chunks generated; re-run to retry the failures",
            doc_path.display(),
            succeeded,
            total
        );
    }

    if !args.download_only {
        if let Err(e) = player::play_sequence(outcome.base()) {
            warn!("{}", e);
        }
    }
}

/// Process every `.docx`/`.txt` document in a folder, in listing order.
async fn run_folder(pipeline: &Pipeline<'_>, folder: &Path, args: &Args) -> Result<()> {
    if !folder.is_dir() {
        anyhow::bail!("{} is not a directory", folder.display());
    }

    let doc_files = collect_documents(folder)?;

    if doc_files.is_empty() {
        anyhow::bail!(
            "No Word documents (.docx) or text files (.txt) found in {}",
            folder.display()
        );
    }

    for (idx, doc_file) in doc_files.iter().enumerate() {
        // With a fixed prefix and several documents, suffix each stem with a
        // 1-based index so they don't overwrite one another.
        let fixed_stem = match (&args.fixed_filename, doc_files.len()) {
            (Some(prefix), n) if n > 1 => Some(format!("{}_{}", prefix, idx + 1)),
            (Some(prefix), _) => Some(prefix.clone()),
            (None, _) => None,
        };

        run_document(pipeline, doc_file, fixed_stem.as_deref(), args).await;
    }

    Ok(())
}

/// List the convertible documents in a folder: all `.docx` files, then all
/// `.txt` files, each group alphabetical. Group order determines which
/// document gets which `PREFIX_<N>` stem under `--fixed-filename`.
fn collect_documents(folder: &Path) -> Result<Vec<PathBuf>> {
    fn has_ext(path: &Path, ext: &str) -> bool {
        path.extension()
            .map(|e| e.eq_ignore_ascii_case(ext))
            .unwrap_or(false)
    }

    let mut doc_files: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && (has_ext(path, "docx") || has_ext(path, "txt")))
        .collect();
    doc_files.sort_by_key(|path| (has_ext(path, "txt"), path.clone()));

    Ok(doc_files)
}
