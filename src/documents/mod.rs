// Document loading module
// Reads the optional FAQ text file and PDF resume into in-memory documents


use std::any::Any;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::panic;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::SourcesConfig;

/// A loaded piece of source text, immutable once created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMetadata {
    /// Path the document was read from
    pub source: String,
    pub content_type: String,
    /// 1-based page number for paginated sources
    pub page: Option<usize>,
}

/// A configured knowledge base source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Text(PathBuf),
    Pdf(PathBuf),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("source not found: {0}")]
    Missing(PathBuf),
    #[error("source {path} is too large: {size} bytes (limit {limit})")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to extract text from {path}: {message}")]
    Pdf { path: PathBuf, message: String },
}

/// A source that contributed nothing to the knowledge base
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSource {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of loading every configured source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub documents: Vec<Document>,
    pub skipped: Vec<SkippedSource>,
}

impl LoadReport {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentSource {
    #[inline]
    pub fn path(&self) -> &Path {
        match self {
            Self::Text(path) | Self::Pdf(path) => path,
        }
    }

    /// Load this source. Blank documents and pages are dropped.
    #[inline]
    pub fn load(&self, max_file_size: u64) -> Result<Vec<Document>, LoadError> {
        let path = self.path();
        check_size(path, max_file_size)?;

        let documents = match self {
            Self::Text(path) => load_text(path)?,
            Self::Pdf(path) => load_pdf(path)?,
        };

        Ok(documents
            .into_iter()
            .filter(|doc| !doc.content.trim().is_empty())
            .collect())
    }
}

impl fmt::Display for DocumentSource {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(path) => write!(f, "text:{}", path.display()),
            Self::Pdf(path) => write!(f, "pdf:{}", path.display()),
        }
    }
}

/// The FAQ file followed by the resume, in that order
#[inline]
pub fn configured_sources(config: &SourcesConfig) -> Vec<DocumentSource> {
    vec![
        DocumentSource::Text(config.faq_path.clone()),
        DocumentSource::Pdf(config.resume_path.clone()),
    ]
}

/// Load every source independently. A failing source is logged and recorded
/// in `skipped`; it never aborts the others.
#[inline]
pub fn load_documents(sources: &[DocumentSource], max_file_size: u64) -> LoadReport {
    let mut report = LoadReport::default();

    for source in sources {
        match source.load(max_file_size) {
            Ok(documents) if documents.is_empty() => {
                warn!("Source {} contained no text, skipping", source);
                report.skipped.push(SkippedSource {
                    path: source.path().to_path_buf(),
                    reason: "no extractable text".to_string(),
                });
            }
            Ok(documents) => {
                debug!("Loaded {} document(s) from {}", documents.len(), source);
                report.documents.extend(documents);
            }
            Err(e) => {
                warn!("Skipping source {}: {}", source, e);
                report.skipped.push(SkippedSource {
                    path: source.path().to_path_buf(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "Loaded {} document(s), skipped {} source(s)",
        report.documents.len(),
        report.skipped.len()
    );

    report
}

fn check_size(path: &Path, limit: u64) -> Result<(), LoadError> {
    let meta = fs::metadata(path).map_err(|e| io_error(path, e))?;
    if meta.len() > limit {
        return Err(LoadError::FileTooLarge {
            path: path.to_path_buf(),
            size: meta.len(),
            limit,
        });
    }
    Ok(())
}

fn load_text(path: &Path) -> Result<Vec<Document>, LoadError> {
    let content = fs::read_to_string(path).map_err(|e| io_error(path, e))?;

    Ok(vec![Document {
        content,
        metadata: DocumentMetadata {
            source: path.display().to_string(),
            content_type: "text/plain".to_string(),
            page: None,
        },
    }])
}

fn load_pdf(path: &Path) -> Result<Vec<Document>, LoadError> {
    // pdf-extract panics on some malformed content streams
    let extracted = panic::catch_unwind(|| pdf_extract::extract_text_by_pages(path))
        .map_err(|payload| LoadError::Pdf {
            path: path.to_path_buf(),
            message: panic_message(payload.as_ref()),
        })?;
    let pages = extracted.map_err(|e| LoadError::Pdf {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let source = path.display().to_string();
    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(i, content)| Document {
            content,
            metadata: DocumentMetadata {
                source: source.clone(),
                content_type: "application/pdf".to_string(),
                page: Some(i + 1),
            },
        })
        .collect())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("extraction panicked: {detail}")
}

fn io_error(path: &Path, error: std::io::Error) -> LoadError {
    if error.kind() == ErrorKind::NotFound {
        LoadError::Missing(path.to_path_buf())
    } else {
        LoadError::Io {
            path: path.to_path_buf(),
            source: error,
        }
    }
}
