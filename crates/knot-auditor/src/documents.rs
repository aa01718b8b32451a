/// Document selection and encoding.
///
/// Selection is filtered at the edge: only `.pdf` paths are accepted and at most
/// [`MAX_DOCUMENTS`] are kept. Reading happens only at submission time, all documents
/// concurrently, and the batch fails as a whole if any single read fails.
use std::path::{Path, PathBuf};

use base64::Engine;
use futures::future::try_join_all;
use schemars::JsonSchema;
use serde::Serialize;
use tracing::debug;

use crate::error::AppError;

pub const MAX_DOCUMENTS: usize = 2;
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// A selected, not yet read, document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct DocumentRef {
    pub name: String,
    #[schemars(with = "String")]
    pub path: PathBuf,
}

impl DocumentRef {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            return Err(AppError::UnsupportedDocument(path.display().to_string()));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            path: path.to_path_buf(),
        })
    }
}

/// Document bytes ready for the analysis service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedDocument {
    pub name: String,
    pub mime_type: &'static str,
    /// Standard base64 of the original bytes.
    pub data: String,
}

/// Result of filtering a batch of candidate paths.
#[derive(Debug, Default)]
pub struct Selection {
    pub accepted: Vec<DocumentRef>,
    pub rejected: Vec<String>,
}

pub fn select_documents<P: AsRef<Path>>(paths: &[P]) -> Selection {
    let mut selection = Selection::default();
    for path in paths {
        match DocumentRef::from_path(path) {
            Ok(doc) => selection.accepted.push(doc),
            Err(_) => selection
                .rejected
                .push(path.as_ref().display().to_string()),
        }
    }
    selection
}

/// Read and encode every document concurrently.
pub async fn encode_all(documents: &[DocumentRef]) -> Result<Vec<EncodedDocument>, AppError> {
    try_join_all(documents.iter().map(encode_one)).await
}

async fn encode_one(document: &DocumentRef) -> Result<EncodedDocument, AppError> {
    let bytes = tokio::fs::read(&document.path)
        .await
        .map_err(|source| AppError::Document {
            path: document.path.display().to_string(),
            source,
        })?;
    debug!(name = %document.name, bytes = bytes.len(), "document read");
    Ok(EncodedDocument {
        name: document.name.clone(),
        mime_type: PDF_MIME_TYPE,
        data: base64::engine::general_purpose::STANDARD.encode(&bytes),
    })
}
