//! Envelope types shared by every endpoint.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Acknowledgement carrying an optional success flag and message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessageResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A single-item response that may or may not be wrapped in `{ "data": ... }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MaybeWrapped<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> MaybeWrapped<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } => data,
            Self::Bare(inner) => inner,
        }
    }
}

/// Acknowledgement returned by the bulk upload endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    /// Identifier of the server-side import job.
    #[serde(rename = "jobId", default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Spreadsheet downloaded from an export endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    /// Name suggested by `Content-Disposition`, or the endpoint's fallback.
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl ExportedFile {
    /// Write the file under `dir`, returning the full path.
    pub async fn save_to(
        &self,
        dir: impl AsRef<std::path::Path>,
    ) -> std::io::Result<std::path::PathBuf> {
        let path = dir.as_ref().join(&self.filename);
        tokio::fs::write(&path, &self.bytes).await?;
        Ok(path)
    }
}
