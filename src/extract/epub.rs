use super::web::html_to_text;
use crate::cancellation::CancellationToken;
use anyhow::{Context, Result};
use ::epub::doc::EpubDoc;
use std::path::Path;
use tracing::{debug, info, warn};

/// Walk the spine and join every chapter's text, checking for cancellation
/// before each chapter.
pub(super) fn load_epub_text(path: &Path, cancel: &CancellationToken) -> Result<String> {
    info!(path = %path.display(), "Loading EPUB content");
    let mut doc =
        EpubDoc::new(path).with_context(|| format!("Failed to open EPUB at {}", path.display()))?;

    let mut combined = String::new();
    let mut chapters = 0usize;

    loop {
        cancel.check_cancelled("epub-chapter")?;
        if let Some((chapter, _mime)) = doc.get_current_str() {
            chapters += 1;
            let plain = match html_to_text(chapter.as_bytes()) {
                Ok(clean) => clean,
                Err(err) => {
                    warn!(chapter = chapters, "html2text failed: {err:#}");
                    chapter
                }
            };
            if !plain.trim().is_empty() {
                if !combined.is_empty() {
                    combined.push_str("\n\n");
                }
                combined.push_str(plain.trim_end());
            }
            debug!(chapter = chapters, added_chars = plain.len(), "Parsed chapter");
        }

        if !doc.go_next() {
            break;
        }
    }

    info!(
        chapters,
        total_chars = combined.len(),
        "Finished loading EPUB content"
    );
    Ok(combined)
}
