//! Spreadsheet validation.
//!
//! Checks run in a fixed order and stop at the first failure; the error's
//! display string is the message shown to the operator.

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use std::io::Cursor;
use tracing::debug;

use crate::error::UploadValidationError;

use super::file::{UploadFile, XLSX_MIME_TYPE};

/// Column headers of the stores template.
pub const STORE_UPLOAD_HEADERS: &[&str] = &["Nombre", "ID Externo", "Estado"];

/// Column headers of the people template.
pub const PEOPLE_UPLOAD_HEADERS: &[&str] = &[
    "first_name",
    "last_name",
    "email",
    "document_number",
    "phone_number",
    "segmentation",
    "status",
    "allocated_amount",
    "expires_at",
];

/// Upload validator with a size limit.
#[derive(Debug, Clone, Copy)]
pub struct UploadValidator {
    max_bytes: usize,
}

impl UploadValidator {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// Validate `file` against `required_headers`, which must appear in
    /// order at the start of the first sheet's first row. Comparison trims
    /// and ignores case; extra trailing columns are allowed.
    pub fn validate(
        &self,
        file: &UploadFile,
        required_headers: &[&str],
    ) -> Result<(), UploadValidationError> {
        if !file.name.to_lowercase().ends_with(".xlsx") {
            return Err(UploadValidationError::InvalidExtension);
        }

        if !file.mime_type.is_empty() && file.mime_type != XLSX_MIME_TYPE {
            return Err(UploadValidationError::InvalidMimeType {
                mime_type: file.mime_type.clone(),
            });
        }

        if file.bytes.is_empty() {
            return Err(UploadValidationError::EmptyFile);
        }

        if file.bytes.len() > self.max_bytes {
            return Err(UploadValidationError::TooLarge {
                size: file.bytes.len(),
                max_mb: (self.max_bytes as u64).div_ceil(1024 * 1024),
            });
        }

        let rows = read_first_sheet(file)?;
        let Some((header, data)) = rows.split_first() else {
            return Err(UploadValidationError::NoData);
        };

        let found: Vec<String> = header.iter().map(|cell| normalize(cell)).collect();
        let matches = found.len() >= required_headers.len()
            && required_headers
                .iter()
                .zip(&found)
                .all(|(expected, actual)| normalize(expected) == *actual);
        if !matches {
            return Err(UploadValidationError::InvalidHeaders {
                expected: required_headers.iter().map(|h| h.to_string()).collect(),
                found: header.clone(),
            });
        }

        let data_rows = data
            .iter()
            .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
            .count();
        if data_rows == 0 {
            return Err(UploadValidationError::HeadersOnly);
        }

        debug!(file = %file.name, data_rows = data_rows, "upload file validated");
        Ok(())
    }
}

/// Validate with the given limit; see [`UploadValidator::validate`].
pub fn validate(
    file: &UploadFile,
    required_headers: &[&str],
    max_bytes: usize,
) -> Result<(), UploadValidationError> {
    UploadValidator::new(max_bytes).validate(file, required_headers)
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Rows of the first sheet as text, aligned so index 0 is column A.
fn read_first_sheet(file: &UploadFile) -> Result<Vec<Vec<String>>, UploadValidationError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(file.bytes.clone())).map_err(
        |e: calamine::XlsxError| UploadValidationError::InvalidWorkbook {
            reason: e.to_string(),
        },
    )?;

    let Some(sheet) = workbook.sheet_names().first().cloned() else {
        return Err(UploadValidationError::NoSheets);
    };

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| UploadValidationError::InvalidWorkbook {
            reason: e.to_string(),
        })?;

    let leading_columns = range.start().map_or(0, |(_, col)| col as usize);
    let rows = range
        .rows()
        .map(|row| {
            std::iter::repeat(String::new())
                .take(leading_columns)
                .chain(row.iter().map(cell_text))
                .collect::<Vec<_>>()
        })
        .collect();
    Ok(rows)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.clone(),
        other => other.to_string(),
    }
}
