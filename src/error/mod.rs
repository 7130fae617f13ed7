//! Southbay Error Types
//!
//! Error hierarchy for the admin client. Server failures are carried as
//! [`ApiErrorResponse`] payloads so callers can surface the backend's own
//! (Spanish) messages to operators.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Message shown when neither the server nor the client produced one.
pub const DEFAULT_ERROR_MESSAGE: &str = "Ocurrió un error. Por favor intenta nuevamente.";

/// Root error type for the Southbay admin client.
#[derive(Error, Debug)]
pub enum SouthbayError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Authentication error: {0}")]
    Authentication(#[from] AuthenticationError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    UploadValidation(#[from] UploadValidationError),

    #[error("{0}")]
    Request(#[from] RequestError),
}

impl SouthbayError {
    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "SOUTHBAY_CONFIG",
            Self::Authentication(_) => "SOUTHBAY_AUTH",
            Self::Network(_) => "SOUTHBAY_NETWORK",
            Self::Api(_) => "SOUTHBAY_API",
            Self::Protocol(_) => "SOUTHBAY_PROTOCOL",
            Self::Storage(_) => "SOUTHBAY_STORAGE",
            Self::UploadValidation(_) => "SOUTHBAY_UPLOAD",
            Self::Request(_) => "SOUTHBAY_REQUEST",
        }
    }

    /// Check if error is retryable.
    ///
    /// Only transport failures and 5xx responses are retried; validation,
    /// authentication and 4xx failures never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_retryable(),
            Self::Api(e) => e.is_server_error(),
            _ => false,
        }
    }

    /// HTTP status of the failure, when it came from the server.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api(e) => Some(e.status),
            _ => None,
        }
    }

    /// Check if error requires the user to sign in again.
    pub fn needs_reauth(&self) -> bool {
        matches!(self, Self::Api(e) if e.status == 401)
    }

    /// Normalize any failure into the uniform error payload.
    pub fn normalize(&self) -> ApiErrorResponse {
        match self {
            Self::Api(e) => e.payload.clone(),
            Self::UploadValidation(e) => ApiErrorResponse::from_message(e.to_string()),
            Self::Request(e) => ApiErrorResponse::from_message(e.to_string()),
            other => ApiErrorResponse::from_message(other.to_string()),
        }
    }

    /// Message suitable for display to an operator.
    pub fn user_message(&self) -> String {
        self.normalize().user_message()
    }
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid base URL: {url}")]
    InvalidBaseUrl { url: String },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Session and credential error.
#[derive(Error, Debug)]
pub enum AuthenticationError {
    #[error("Login response did not contain an access token")]
    MissingAccessToken,
}

/// Network/transport error.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Failed to build request: {message}")]
    RequestBuild { message: String },
}

impl NetworkError {
    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::RequestBuild { .. })
    }
}

/// Non-2xx response from the Southbay API.
#[derive(Error, Debug, Clone)]
#[error("HTTP {status}: {}", .payload.user_message())]
pub struct ApiError {
    /// HTTP status code.
    pub status: u16,
    /// Normalized server payload.
    pub payload: ApiErrorResponse,
}

impl ApiError {
    /// Build an error from a raw response. Bodies that carry neither
    /// `message` nor `messages` fall back to the status alone.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let payload = match serde_json::from_slice::<ApiErrorResponse>(body) {
            Ok(payload) if payload.has_message() => ApiErrorResponse {
                status_code: payload.status_code.or(Some(status)),
                ..payload
            },
            _ => ApiErrorResponse {
                status_code: Some(status),
                ..Default::default()
            },
        };
        Self { status, payload }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

/// Protocol/response parsing error.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },

    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },
}

/// Local storage or cookie jar error.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Read failed: {message}")]
    ReadFailed { message: String },

    #[error("Write failed: {message}")]
    WriteFailed { message: String },

    #[error("Corrupted data: {message}")]
    CorruptedData { message: String },
}

/// Spreadsheet rejected before upload. Display strings are shown verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadValidationError {
    #[error("El archivo debe tener extensión .xlsx")]
    InvalidExtension,

    #[error("Tipo de archivo no válido. Debe ser un Excel (.xlsx)")]
    InvalidMimeType { mime_type: String },

    #[error("El archivo está vacío")]
    EmptyFile,

    #[error("El archivo supera el tamaño máximo de {max_mb} MB")]
    TooLarge { size: usize, max_mb: u64 },

    #[error("El archivo no es un Excel válido")]
    InvalidWorkbook { reason: String },

    #[error("El archivo no contiene hojas")]
    NoSheets,

    #[error("El archivo no contiene datos")]
    NoData,

    #[error(
        "Encabezados inválidos. Se requieren las columnas: {} (en ese orden).",
        .expected.join(", ")
    )]
    InvalidHeaders {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("El archivo solo contiene encabezados, no hay filas de datos")]
    HeadersOnly,
}

/// Request rejected on the client side.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("La contraseña no cumple la política: {}", .unmet.join(", "))]
    WeakPassword { unmet: Vec<String> },

    #[error("{message}")]
    InvalidArgument { message: String },

    #[error("{message}")]
    ExportFailed { message: String },
}

/// Result type for Southbay operations.
pub type SouthbayResult<T> = Result<T, SouthbayError>;

/// Uniform error payload (wire field `statusCode`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiErrorResponse {
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Default::default()
        }
    }

    fn has_message(&self) -> bool {
        self.message.as_deref().is_some_and(|m| !m.is_empty())
            || self.messages.as_ref().is_some_and(|m| !m.is_empty())
    }

    /// Joined `messages`, else `message`, else the default message.
    pub fn user_message(&self) -> String {
        let messages: Vec<&str> = self
            .messages
            .iter()
            .flatten()
            .map(String::as_str)
            .filter(|m| !m.is_empty())
            .collect();
        if !messages.is_empty() {
            return messages.join(", ");
        }
        match self.message.as_deref() {
            Some(message) if !message.is_empty() => message.to_string(),
            _ => DEFAULT_ERROR_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_retryable() {
        assert!(SouthbayError::Network(NetworkError::Timeout {
            timeout: Duration::from_secs(30)
        })
        .is_retryable());
        assert!(SouthbayError::Api(ApiError::from_response(503, b"")).is_retryable());
        assert!(!SouthbayError::Api(ApiError::from_response(400, b"")).is_retryable());
        assert!(!SouthbayError::UploadValidation(UploadValidationError::EmptyFile).is_retryable());
    }

    #[test]
    fn test_needs_reauth() {
        assert!(SouthbayError::Api(ApiError::from_response(401, b"")).needs_reauth());
        assert!(
            !SouthbayError::Authentication(AuthenticationError::MissingAccessToken).needs_reauth()
        );
        assert!(!SouthbayError::Api(ApiError::from_response(403, b"")).needs_reauth());
    }

    #[test]
    fn test_from_response_keeps_server_status_code() {
        let error = ApiError::from_response(
            400,
            br#"{"message":"Nombre requerido","statusCode":422,"code":"VALIDATION"}"#,
        );
        assert_eq!(error.status, 400);
        assert_eq!(error.payload.status_code, Some(422));
        assert_eq!(error.payload.code.as_deref(), Some("VALIDATION"));
        assert_eq!(error.payload.user_message(), "Nombre requerido");
    }

    #[test]
    fn test_from_response_fills_missing_status_code() {
        let error = ApiError::from_response(409, br#"{"messages":["a","","b"]}"#);
        assert_eq!(error.payload.status_code, Some(409));
        assert_eq!(error.payload.user_message(), "a, b");
    }

    #[test]
    fn test_unparseable_body_uses_default_message() {
        let error = SouthbayError::Api(ApiError::from_response(502, b"<html>bad gateway</html>"));
        assert_eq!(error.status_code(), Some(502));
        assert_eq!(error.user_message(), DEFAULT_ERROR_MESSAGE);
    }

    #[test]
    fn test_validation_message_is_shown_verbatim() {
        let error = SouthbayError::from(UploadValidationError::InvalidHeaders {
            expected: vec!["Nombre".into(), "ID Externo".into(), "Estado".into()],
            found: vec![],
        });
        assert_eq!(
            error.user_message(),
            "Encabezados inválidos. Se requieren las columnas: Nombre, ID Externo, Estado (en ese orden)."
        );
    }
}
