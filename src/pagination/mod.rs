//! Pagination handling for list endpoints.
//!
//! Callers count pages from 1; the API counts from 0. Older deployments
//! answer list calls with a bare array instead of the envelope, so both
//! shapes are accepted and normalized into [`Page`].

use serde::Deserialize;

use crate::config::DEFAULT_PAGE_SIZE;
use crate::pipeline::ApiRequest;
use crate::types::EntityStatus;

/// A normalized page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
    /// One-based page number.
    pub page: u32,
    pub page_size: u32,
    pub total_pages: Option<u32>,
    pub last: Option<bool>,
}

impl<T> Page<T> {
    /// Returns true if a later page exists.
    pub fn has_next(&self) -> bool {
        match self.last {
            Some(last) => !last,
            None => u64::from(self.page) * u64::from(self.page_size) < self.total,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Maps the items in this page to a different type.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
            last: self.last,
        }
    }
}

/// Query parameters shared by list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    /// One-based page number.
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub status: Vec<EntityStatus>,
    /// Free-text filter; sent under the endpoint's own key.
    pub search: Option<String>,
    /// Role filter, honoured by the users endpoint only.
    pub roles: Vec<String>,
}

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_status(mut self, status: EntityStatus) -> Self {
        self.status.push(status);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Zero-based page as sent on the wire.
    pub fn zero_based_page(&self) -> u32 {
        self.page.unwrap_or(1).saturating_sub(1)
    }

    /// Add the parameters to a request. Blank search text is dropped.
    pub fn apply(&self, request: ApiRequest, search_key: &str) -> ApiRequest {
        let mut request = request
            .query("page", self.zero_based_page())
            .query_opt("size", self.size);

        if !self.status.is_empty() {
            let joined = self
                .status
                .iter()
                .map(EntityStatus::as_str)
                .collect::<Vec<_>>()
                .join(",");
            request = request.query("status", joined);
        }

        if let Some(search) = self.search.as_deref() {
            if !search.trim().is_empty() {
                request = request.query(search_key, search.trim());
            }
        }

        if !self.roles.is_empty() {
            request = request.query("roles", self.roles.join(","));
        }

        request
    }
}

/// Envelope form of a list response.
#[derive(Debug, Clone, Deserialize)]
pub struct ListEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub total: Option<u64>,
    /// Zero-based.
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub last: Option<bool>,
}

/// Either list response shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    Legacy(Vec<T>),
    Envelope(ListEnvelope<T>),
}

impl<T> ListResponse<T> {
    /// Normalize against the parameters the request was made with.
    pub fn into_page(self, params: &ListParams) -> Page<T> {
        match self {
            Self::Legacy(data) => {
                let page_size = non_zero(params.size.unwrap_or(data.len() as u32));
                Page {
                    total: data.len() as u64,
                    page: params.page.unwrap_or(1),
                    page_size,
                    total_pages: None,
                    last: None,
                    data,
                }
            }
            Self::Envelope(envelope) => {
                let page_size = non_zero(
                    envelope
                        .size
                        .or(envelope.page_size)
                        .or(params.size)
                        .unwrap_or(envelope.data.len() as u32),
                );
                Page {
                    total: envelope.total.unwrap_or(envelope.data.len() as u64),
                    page: envelope.page.unwrap_or_else(|| params.zero_based_page()) + 1,
                    page_size,
                    total_pages: envelope.total_pages,
                    last: envelope.last,
                    data: envelope.data,
                }
            }
        }
    }
}

fn non_zero(size: u32) -> u32 {
    if size == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        size
    }
}
