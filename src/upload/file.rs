use bytes::Bytes;
use std::path::Path;

use crate::core::MultipartFile;
use crate::error::{RequestError, SouthbayResult};

/// MIME type of `.xlsx` workbooks.
pub const XLSX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A file chosen for upload: name, declared MIME type and contents.
#[derive(Clone)]
pub struct UploadFile {
    pub name: String,
    /// Declared type; empty when unknown.
    pub mime_type: String,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk. The MIME type is inferred from the extension
    /// and left empty when unknown.
    pub async fn from_path(path: impl AsRef<Path>) -> SouthbayResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| RequestError::InvalidArgument {
                message: format!("ruta sin nombre de archivo: {}", path.display()),
            })?
            .to_string();
        let bytes = tokio::fs::read(path).await.map_err(|e| RequestError::InvalidArgument {
            message: format!("no se pudo leer {}: {}", path.display(), e),
        })?;

        let mime_type = match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xlsx") => XLSX_MIME_TYPE.to_string(),
            Some(ext) if ext.eq_ignore_ascii_case("csv") => mime::TEXT_CSV.to_string(),
            _ => String::new(),
        };

        Ok(Self::new(name, mime_type, bytes))
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Multipart part under the `file` field.
    pub fn into_multipart(self) -> MultipartFile {
        let content_type = if self.mime_type.is_empty() {
            mime::APPLICATION_OCTET_STREAM.to_string()
        } else {
            self.mime_type
        };
        MultipartFile {
            field: "file".to_string(),
            filename: self.name,
            content_type,
            bytes: self.bytes,
        }
    }
}

impl std::fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}
