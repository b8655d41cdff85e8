use crate::cancellation::CancellationToken;
use anyhow::{Context, Result};
use std::io::Read;
use std::time::Duration;
use tracing::info;

/// Wide enough that html2text never hard-wraps a paragraph.
const HTML_WRAP_WIDTH: usize = 10_000;
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const BODY_CHUNK: usize = 16 * 1024;
const USER_AGENT: &str = concat!("speed-reader/", env!("CARGO_PKG_VERSION"));

pub(super) fn html_to_text(html: &[u8]) -> Result<String> {
    html2text::from_read(html, HTML_WRAP_WIDTH).context("Failed to convert HTML to text")
}

pub(super) fn fetch_page_text(url: &str, cancel: &CancellationToken) -> Result<String> {
    info!(url, "Fetching web page");
    let client = reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")?;

    let response = client
        .get(url)
        .send()
        .with_context(|| format!("Failed to fetch {url}"))?
        .error_for_status()
        .with_context(|| format!("Server rejected request for {url}"))?;
    cancel.check_cancelled("fetch-headers")?;

    let body = read_body(response, cancel)
        .with_context(|| format!("Failed to read response body from {url}"))?;
    cancel.check_cancelled("html-convert")?;
    info!(url, bytes = body.len(), "Fetched web page");
    html_to_text(&body)
}

/// Read `reader` to the end, checking `cancel` between chunks.
fn read_body(mut reader: impl Read, cancel: &CancellationToken) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    let mut chunk = vec![0; BODY_CHUNK];
    loop {
        cancel.check_cancelled("fetch-body")?;
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            return Ok(body);
        }
        body.extend_from_slice(&chunk[..read]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::is_cancellation;
    use std::io::Cursor;

    /// Cancels its token once the first chunk has been handed out.
    struct CancelAfterFirstChunk {
        inner: Cursor<Vec<u8>>,
        cancel: CancellationToken,
    }

    impl Read for CancelAfterFirstChunk {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let read = self.inner.read(buf)?;
            self.cancel.cancel();
            Ok(read)
        }
    }

    #[test]
    fn body_is_read_in_full() {
        let payload = vec![b'x'; BODY_CHUNK * 2 + 7];
        let body = read_body(Cursor::new(payload.clone()), &CancellationToken::new()).unwrap();
        assert_eq!(body, payload);
    }

    #[test]
    fn body_read_stops_between_chunks_once_cancelled() {
        let cancel = CancellationToken::new();
        let reader = CancelAfterFirstChunk {
            inner: Cursor::new(vec![b'x'; BODY_CHUNK * 4]),
            cancel: cancel.clone(),
        };
        let err = read_body(reader, &cancel).unwrap_err();
        assert!(is_cancellation(&err));
    }

    #[test]
    fn paragraphs_stay_on_their_own_lines() {
        let text = html_to_text(b"<p>First paragraph.</p><p>Second one.</p>").unwrap();
        let first = text.find("First").unwrap();
        let second = text.find("Second").unwrap();
        assert!(text[first..second].contains('\n'));
    }

    #[test]
    fn long_paragraphs_are_not_wrapped() {
        let sentence = "word ".repeat(200);
        let text = html_to_text(format!("<p>{sentence}</p>").as_bytes()).unwrap();
        assert_eq!(text.trim().lines().count(), 1);
    }
}
