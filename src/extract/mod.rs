//! Source extraction: turns a file, URL, or in-memory string into raw text.
//!
//! Extraction is the only blocking step before playback and runs off the
//! timeline. A cancelled extraction always yields an empty string so a
//! half-read document never reaches the tokenizer.

mod epub;
mod web;

use crate::cancellation::{CancellationToken, is_cancellation};
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    Url(String),
    Text(String),
}

impl Source {
    /// Classify a command-line argument as a URL or a path.
    pub fn from_arg(arg: &str) -> Self {
        let lowered = arg.trim().to_ascii_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            Source::Url(arg.trim().to_string())
        } else {
            Source::File(PathBuf::from(arg))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Source::File(path) => path.display().to_string(),
            Source::Url(url) => url.clone(),
            Source::Text(text) => format!("<{} bytes of text>", text.len()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    PlainText,
    Html,
    Epub,
    Pdf,
}

fn file_kind(path: &Path) -> FileKind {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("html" | "htm" | "xhtml") => FileKind::Html,
        Some("epub") => FileKind::Epub,
        Some("pdf") => FileKind::Pdf,
        _ => FileKind::PlainText,
    }
}

/// Extract raw text for `source`. Returns `Ok("")` when `cancel` fires.
pub fn extract_text(source: &Source, cancel: &CancellationToken) -> Result<String> {
    match extract_uncancelled(source, cancel) {
        Ok(_) if cancel.is_cancelled() => {
            info!(source = %source.describe(), "Extraction cancelled after completion");
            Ok(String::new())
        }
        Ok(text) => {
            info!(
                source = %source.describe(),
                total_chars = text.len(),
                "Finished extracting source"
            );
            Ok(text)
        }
        Err(err) if is_cancellation(&err) => {
            info!(source = %source.describe(), "Extraction cancelled: {err}");
            Ok(String::new())
        }
        Err(err) => Err(err),
    }
}

fn extract_uncancelled(source: &Source, cancel: &CancellationToken) -> Result<String> {
    cancel.check_cancelled("extract-start")?;
    match source {
        Source::Text(text) => Ok(text.clone()),
        Source::Url(url) => web::fetch_page_text(url, cancel),
        Source::File(path) => match file_kind(path) {
            FileKind::PlainText => {
                info!(path = %path.display(), "Loading plain text content");
                fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))
            }
            FileKind::Html => {
                info!(path = %path.display(), "Loading HTML content");
                let bytes =
                    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
                cancel.check_cancelled("html-convert")?;
                web::html_to_text(&bytes)
            }
            FileKind::Epub => epub::load_epub_text(path, cancel),
            FileKind::Pdf => bail!(
                "PDF extraction is not supported for {}; convert it to text first",
                path.display()
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("speed-reader-extract-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    #[test]
    fn arguments_are_classified() {
        assert_eq!(
            Source::from_arg("https://example.com/a"),
            Source::Url("https://example.com/a".into())
        );
        assert_eq!(
            Source::from_arg("HTTP://example.com"),
            Source::Url("HTTP://example.com".into())
        );
        assert_eq!(
            Source::from_arg("book.txt"),
            Source::File(PathBuf::from("book.txt"))
        );
    }

    #[test]
    fn in_memory_text_passes_through() {
        let text = extract_text(&Source::Text("one two".into()), &CancellationToken::new()).unwrap();
        assert_eq!(text, "one two");
    }

    #[test]
    fn plain_text_file_is_read_verbatim() {
        let path = temp_file("plain.txt", b"first line\r\nsecond line");
        let text = extract_text(&Source::File(path), &CancellationToken::new()).unwrap();
        assert_eq!(text, "first line\r\nsecond line");
    }

    #[test]
    fn unknown_extension_reads_as_text() {
        let path = temp_file("notes.md", b"# heading\nbody");
        let text = extract_text(&Source::File(path), &CancellationToken::new()).unwrap();
        assert!(text.contains("body"));
    }

    #[test]
    fn html_file_loses_markup() {
        let path = temp_file(
            "page.html",
            b"<html><body><h1>Title</h1><p>Some <b>bold</b> words.</p></body></html>",
        );
        let text = extract_text(&Source::File(path), &CancellationToken::new()).unwrap();
        assert!(text.contains("Title"));
        assert!(text.contains("bold"));
        assert!(!text.contains("<p>"));
    }

    #[test]
    fn pdf_is_rejected() {
        let path = temp_file("scan.pdf", b"%PDF-1.4");
        let err = extract_text(&Source::File(path), &CancellationToken::new()).unwrap_err();
        assert!(err.to_string().contains("PDF"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = std::env::temp_dir().join("speed-reader-does-not-exist.txt");
        assert!(extract_text(&Source::File(path), &CancellationToken::new()).is_err());
    }

    #[test]
    fn cancelled_extraction_is_empty_not_partial() {
        let path = temp_file("cancelled.txt", b"plenty of words here");
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(extract_text(&Source::File(path), &token).unwrap(), "");
        assert_eq!(extract_text(&Source::Text("abc".into()), &token).unwrap(), "");
    }
}
