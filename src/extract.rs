//! Content extraction: turn a source document into a single string.
//!
//! Plain text files are read as UTF-8. Word documents are zip archives; the
//! body text lives in `word/document.xml` as `<w:t>` runs grouped into
//! `<w:p>` paragraphs. Table cells contain paragraphs of their own, so the
//! paragraph walk picks up table text as well.

use crate::error::{PodcastError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

static TEXT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>").expect("valid regex"));

/// Extract the text content of a `.docx` or `.txt` document.
pub fn extract_text(path: &Path) -> Result<String> {
    let is_docx = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("docx"))
        .unwrap_or(false);

    if is_docx {
        extract_docx(path)
    } else {
        extract_plain_text(path)
    }
}

fn extract_plain_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| PodcastError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn extract_docx(path: &Path) -> Result<String> {
    let read_err = |message: String| PodcastError::Read {
        path: path.to_path_buf(),
        message,
    };

    let file = File::open(path).map_err(|e| read_err(e.to_string()))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| read_err(format!("not a docx archive: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| read_err(format!("missing document body: {}", e)))?
        .read_to_string(&mut xml)
        .map_err(|e| read_err(e.to_string()))?;

    Ok(document_xml_to_text(&xml))
}

/// Collect `<w:t>` runs from the document XML, one output line per `<w:p>`
/// paragraph.
fn document_xml_to_text(xml: &str) -> String {
    let mut lines = Vec::new();

    for paragraph in xml.split("</w:p>") {
        let mut line = String::new();
        for run in TEXT_RUN.captures_iter(paragraph) {
            line.push_str(&unescape_xml(&run[1]));
        }
        if !line.trim().is_empty() {
            lines.push(line);
        }
    }

    lines.join("\n")
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
