//! Document text extraction.

use async_trait::async_trait;
use compass_core::{AppError, AppResult};
use std::path::Path;

/// Turns a document on disk into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> AppResult<String>;
}

/// Document formats recognized by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Markdown,
    Html,
    PlainText,
    Unsupported,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("pdf") => DocumentKind::Pdf,
            Some("md") | Some("markdown") => DocumentKind::Markdown,
            Some("html") | Some("htm") => DocumentKind::Html,
            Some("txt") | Some("text") | Some("rst") => DocumentKind::PlainText,
            _ => DocumentKind::Unsupported,
        }
    }
}

/// Extractor for PDF, Markdown, HTML and plain text files.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileExtractor;

impl FileExtractor {
    pub fn new() -> Self {
        Self
    }

    async fn extract_pdf(path: &Path) -> AppResult<String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::ExtractionFailed(format!("Failed to read {:?}: {}", path, e)))?;

        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| AppError::ExtractionFailed(format!("Task join error: {}", e)))?
            .map_err(|e| AppError::ExtractionFailed(format!("PDF extraction error for {:?}: {}", path, e)))
    }

    async fn read_text(path: &Path) -> AppResult<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::ExtractionFailed(format!("Failed to read {:?}: {}", path, e)))
    }
}

#[async_trait]
impl TextExtractor for FileExtractor {
    async fn extract(&self, path: &Path) -> AppResult<String> {
        let kind = DocumentKind::from_path(path);
        tracing::debug!("Extracting {:?} as {:?}", path, kind);

        let text = match kind {
            DocumentKind::Pdf => Self::extract_pdf(path).await?,
            DocumentKind::Markdown | DocumentKind::PlainText => Self::read_text(path).await?,
            DocumentKind::Html => strip_html(&Self::read_text(path).await?),
            DocumentKind::Unsupported => {
                return Err(AppError::UnsupportedFormat(format!(
                    "{:?} (supported: pdf, md, html, txt)",
                    path
                )))
            }
        };

        if text.trim().is_empty() {
            tracing::warn!("No text extracted from {:?}", path);
        }

        Ok(text)
    }
}

/// Remove tags, `<script>` and `<style>` bodies, and decode common entities.
fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let lower = html.to_ascii_lowercase();
    let mut i = 0;

    while i < html.len() {
        let rest = &html[i..];
        if rest.starts_with('<') {
            let skip_until = if lower[i..].starts_with("<script") {
                Some("</script>")
            } else if lower[i..].starts_with("<style") {
                Some("</style>")
            } else {
                None
            };

            let end = match skip_until {
                Some(closing) => lower[i..].find(closing).map(|p| p + closing.len()),
                None => rest.find('>').map(|p| p + 1),
            };

            match end {
                Some(len) => {
                    i += len;
                    out.push(' ');
                }
                None => break,
            }
        } else {
            let next = rest.find('<').unwrap_or(rest.len());
            out.push_str(&rest[..next]);
            i += next;
        }
    }

    let decoded = out
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    decoded
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
