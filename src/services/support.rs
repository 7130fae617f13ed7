//! Helpers shared by the resource services: spreadsheet export and upload,
//! and lenient decoding of acknowledgement bodies.

use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::core::HttpResponse;
use crate::error::{RequestError, SouthbayResult};
use crate::pipeline::{ApiRequest, AuthPipeline};
use crate::resilience::RetryPolicy;
use crate::types::{ExportedFile, UploadReceipt};
use crate::upload::{UploadFile, UploadValidator};

static FILENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)filename\*=UTF-8''([^;]+)|filename="?([^";]+)"?"#).expect("valid pattern")
});

/// Extract the file name from a `Content-Disposition` value.
///
/// The first `filename*=UTF-8''…` or `filename=…` parameter is used. The
/// name is percent-decoded when it decodes to valid UTF-8 and used raw
/// otherwise.
pub fn content_disposition_filename(disposition: Option<&str>, fallback: &str) -> String {
    let raw = disposition.and_then(|value| {
        let captures = FILENAME.captures(value)?;
        captures
            .get(1)
            .or_else(|| captures.get(2))
            .map(|m| m.as_str().to_string())
    });

    match raw {
        Some(raw) if !raw.is_empty() => match percent_decode_str(&raw).decode_utf8() {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => raw,
        },
        _ => fallback.to_string(),
    }
}

/// Decode a JSON body, falling back to `T::default()` for empty or
/// unexpected payloads.
pub(crate) fn decode_or_default<T: DeserializeOwned + Default>(response: &HttpResponse) -> T {
    if response.body.is_empty() {
        return T::default();
    }
    match serde_json::from_slice(&response.body) {
        Ok(value) => value,
        Err(error) => {
            debug!(error = %error, "unexpected acknowledgement body, ignoring");
            T::default()
        }
    }
}

/// Download a spreadsheet. Any failure is reported as
/// [`RequestError::ExportFailed`] carrying the operator-facing message.
pub(crate) async fn export_file(
    pipeline: &AuthPipeline,
    path: &str,
    fallback_name: &str,
) -> SouthbayResult<ExportedFile> {
    let request = ApiRequest::get(path)
        .header("accept", "*/*")
        .retry(RetryPolicy::none());

    let response = match pipeline.execute(&request).await {
        Ok(response) => response,
        Err(error) => {
            warn!(path = path, error = %error, "export failed");
            return Err(RequestError::ExportFailed {
                message: error.user_message(),
            }
            .into());
        }
    };

    let filename =
        content_disposition_filename(response.header("content-disposition"), fallback_name);
    info!(filename = %filename, size = response.body.len(), "export downloaded");
    Ok(ExportedFile {
        filename,
        content_type: response.header("content-type").map(str::to_string),
        bytes: response.body,
    })
}

/// Validate a spreadsheet locally, then post it as `multipart/form-data`.
/// Nothing is sent when validation fails.
pub(crate) async fn upload_file(
    pipeline: &AuthPipeline,
    path: &str,
    file: UploadFile,
    required_headers: &[&str],
) -> SouthbayResult<UploadReceipt> {
    UploadValidator::new(pipeline.config().max_upload_bytes()).validate(&file, required_headers)?;

    let request = ApiRequest::post(path)
        .multipart(file.into_multipart())
        .retry(RetryPolicy::none());
    let response = pipeline.execute(&request).await?;

    let receipt: UploadReceipt = decode_or_default(&response);
    info!(job_id = ?receipt.job_id, "upload accepted");
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_star_is_decoded() {
        let name = content_disposition_filename(
            Some("attachment; filename*=UTF-8''tiendas%20activas.xlsx; filename=\"fallback.xlsx\""),
            "stores.xlsx",
        );
        assert_eq!(name, "tiendas activas.xlsx");
    }

    #[test]
    fn test_quoted_filename() {
        let name = content_disposition_filename(
            Some(r#"attachment; filename="people.xlsx""#),
            "beneficiary.xlsx",
        );
        assert_eq!(name, "people.xlsx");
    }

    #[test]
    fn test_unquoted_filename_is_case_insensitive() {
        let name = content_disposition_filename(Some("attachment; FILENAME=export.xlsx"), "x.xlsx");
        assert_eq!(name, "export.xlsx");
    }

    #[test]
    fn test_missing_header_uses_fallback() {
        assert_eq!(content_disposition_filename(None, "stores.xlsx"), "stores.xlsx");
        assert_eq!(content_disposition_filename(Some("inline"), "stores.xlsx"), "stores.xlsx");
    }

    #[test]
    fn test_undecodable_name_is_kept_raw() {
        let name = content_disposition_filename(
            Some("attachment; filename*=UTF-8''bad%FF.xlsx"),
            "x.xlsx",
        );
        assert_eq!(name, "bad%FF.xlsx");
    }

    #[test]
    fn test_filename_pattern_is_shared_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                std::thread::spawn(move || {
                    let header = format!("attachment; filename=\"export-{}.xlsx\"", i);
                    content_disposition_filename(Some(&header), "x.xlsx")
                })
            })
            .collect();

        let names: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(
            names,
            vec!["export-0.xlsx", "export-1.xlsx", "export-2.xlsx", "export-3.xlsx"]
        );
    }

    #[test]
    fn test_decode_or_default_tolerates_odd_bodies() {
        let receipt: UploadReceipt = decode_or_default(&HttpResponse::new(202, ""));
        assert_eq!(receipt, UploadReceipt::default());

        let receipt: UploadReceipt = decode_or_default(&HttpResponse::new(200, "\"queued\""));
        assert_eq!(receipt, UploadReceipt::default());

        let receipt: UploadReceipt = decode_or_default(&HttpResponse::new(
            200,
            r#"{"jobId":"42","message":"ok"}"#,
        ));
        assert_eq!(receipt.job_id.as_deref(), Some("42"));
    }
}
