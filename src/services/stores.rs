//! Store operations service.

use serde::Serialize;
use tracing::instrument;

use crate::error::SouthbayResult;
use crate::pagination::{ListParams, ListResponse, Page};
use crate::pipeline::{ApiRequest, AuthPipeline};
use crate::resilience::RetryPolicy;
use crate::types::{ExportedFile, MaybeWrapped, Store, StorePayload, UploadReceipt};
use crate::upload::{UploadFile, STORE_UPLOAD_HEADERS};

use super::support::{export_file, upload_file};

/// File name used when the export response does not suggest one.
pub const STORES_EXPORT_FALLBACK: &str = "stores.xlsx";

/// Service for store operations.
pub struct StoresService<'a> {
    pipeline: &'a AuthPipeline,
}

impl<'a> StoresService<'a> {
    pub fn new(pipeline: &'a AuthPipeline) -> Self {
        Self { pipeline }
    }

    /// Lists stores; the search text filters by name.
    #[instrument(name = "southbay.stores.list", skip_all)]
    pub async fn list(&self, params: &ListParams) -> SouthbayResult<Page<Store>> {
        let request = params.apply(
            ApiRequest::get(self.pipeline.config().endpoints.stores.as_str()),
            "name",
        );
        let response: ListResponse<Store> = self.pipeline.execute_json(&request).await?;
        Ok(response.into_page(params))
    }

    pub async fn create(&self, payload: &StorePayload) -> SouthbayResult<Store> {
        let request = ApiRequest::post(self.pipeline.config().endpoints.stores.as_str())
            .json(payload)?
            .retry(RetryPolicy::none());
        let store: MaybeWrapped<Store> = self.pipeline.execute_json(&request).await?;
        Ok(store.into_inner())
    }

    /// Updates a store. The API takes the id in the body, not the path.
    pub async fn update(&self, id: u64, payload: &StorePayload) -> SouthbayResult<Store> {
        let request = ApiRequest::put(self.pipeline.config().endpoints.stores.as_str())
            .json(&WithId { id, payload })?
            .retry(RetryPolicy::none());
        let store: MaybeWrapped<Store> = self.pipeline.execute_json(&request).await?;
        Ok(store.into_inner())
    }

    pub async fn delete(&self, id: u64) -> SouthbayResult<()> {
        let request = ApiRequest::delete(self.pipeline.config().endpoints.store(id))
            .retry(RetryPolicy::none());
        self.pipeline.execute_empty(&request).await
    }

    /// Downloads every store as a spreadsheet.
    pub async fn export(&self) -> SouthbayResult<ExportedFile> {
        export_file(
            self.pipeline,
            &self.pipeline.config().endpoints.stores_export,
            STORES_EXPORT_FALLBACK,
        )
        .await
    }

    /// Uploads a stores spreadsheet for bulk creation. The file is checked
    /// against the stores template before it is sent.
    #[instrument(name = "southbay.stores.upload", skip_all, fields(file = %file.name))]
    pub async fn upload(&self, file: UploadFile) -> SouthbayResult<UploadReceipt> {
        upload_file(
            self.pipeline,
            &self.pipeline.config().endpoints.stores_upload,
            file,
            STORE_UPLOAD_HEADERS,
        )
        .await
    }
}

/// Payload with the target id merged in.
#[derive(Serialize)]
pub(crate) struct WithId<'a, T: Serialize> {
    pub id: u64,
    #[serde(flatten)]
    pub payload: &'a T,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SouthbayConfig;
    use crate::core::{HttpResponse, MockHttpTransport};
    use crate::error::{RequestError, SouthbayError, UploadValidationError};
    use crate::storage::{InMemoryCookieJar, InMemoryLocalStorage, NoopNavigator};
    use crate::token::{HttpTokenRefresher, RefreshCoordinator, TokenStore};
    use crate::types::{EntityStatus, StoredAuthTokens};
    use std::sync::Arc;

    fn pipeline(transport: Arc<MockHttpTransport>) -> AuthPipeline {
        let config = Arc::new(
            SouthbayConfig::builder()
                .base_url("http://api.test")
                .build()
                .unwrap(),
        );
        let store = Arc::new(TokenStore::new(
            Arc::new(InMemoryLocalStorage::new()),
            Arc::new(InMemoryCookieJar::new()),
            false,
        ));
        store
            .write(&StoredAuthTokens {
                token: "abc".into(),
                refresh_token: Some("r1".into()),
                expires_at: None,
                token_type: "Bearer".into(),
            })
            .unwrap();
        let refresher = Arc::new(HttpTokenRefresher::new(config.clone(), transport.clone()));
        let coordinator = Arc::new(RefreshCoordinator::new(store.clone(), refresher));
        AuthPipeline::new(config, transport, store, coordinator, Arc::new(NoopNavigator))
    }

    fn store_json(id: u64, name: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "external_id": format!("EXT-{}", id),
            "name": name,
            "status": "ACTIVE"
        })
    }

    #[tokio::test]
    async fn test_list_sends_zero_based_page_and_name_filter() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.on_path_json(
            "/v1/stores",
            200,
            &serde_json::json!({
                "data": [store_json(1, "Centro")],
                "total": 11,
                "page": 1,
                "size": 10
            }),
        );
        let pipeline = pipeline(transport.clone());

        let page = StoresService::new(&pipeline)
            .list(&ListParams::new().with_page(2).with_size(10).with_search("Centro"))
            .await
            .unwrap();

        assert_eq!(page.page, 2);
        assert_eq!(page.total, 11);
        assert_eq!(page.data[0].status, EntityStatus::Active);
        let url = transport.get_last_request().unwrap().url;
        assert_eq!(url, "http://api.test/v1/stores?page=1&size=10&name=Centro");
    }

    #[tokio::test]
    async fn test_list_accepts_legacy_array() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.on_path_json(
            "/v1/stores",
            200,
            &serde_json::json!([store_json(1, "A"), store_json(2, "B")]),
        );
        let pipeline = pipeline(transport);

        let page = StoresService::new(&pipeline).list(&ListParams::new()).await.unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 2);
    }

    #[tokio::test]
    async fn test_update_merges_id_into_body() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.on_path_json("/v1/stores", 200, &store_json(7, "Norte"));
        let pipeline = pipeline(transport.clone());

        let payload = StorePayload {
            external_id: "EXT-7".into(),
            name: "Norte".into(),
            status: Some(EntityStatus::Inactive),
        };
        let store = StoresService::new(&pipeline).update(7, &payload).await.unwrap();

        assert_eq!(store.id, 7);
        let sent = transport.get_last_request().unwrap();
        assert_eq!(sent.method.as_str(), "PUT");
        let body = sent.body.as_json().unwrap();
        assert_eq!(body["id"], 7);
        assert_eq!(body["name"], "Norte");
        assert_eq!(body["status"], "INACTIVE");
    }

    #[tokio::test]
    async fn test_delete_targets_item_path() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.on_path("/v1/stores/3", HttpResponse::new(204, ""));
        let pipeline = pipeline(transport.clone());

        StoresService::new(&pipeline).delete(3).await.unwrap();

        assert_eq!(transport.requests_to("/v1/stores/3").len(), 1);
    }

    #[tokio::test]
    async fn test_export_reads_content_disposition() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.on_path(
            "/v1/stores/export",
            HttpResponse::new(200, &b"PK\x03\x04"[..])
                .with_header("Content-Disposition", "attachment; filename=\"tiendas_2026.xlsx\""),
        );
        let pipeline = pipeline(transport);

        let file = StoresService::new(&pipeline).export().await.unwrap();

        assert_eq!(file.filename, "tiendas_2026.xlsx");
        assert_eq!(&file.bytes[..], b"PK\x03\x04");
    }

    #[tokio::test]
    async fn test_export_failure_carries_api_message() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.on_path(
            "/v1/stores/export",
            HttpResponse::new(500, r#"{"message":"Exportación no disponible"}"#),
        );
        let pipeline = pipeline(transport.clone());

        let error = StoresService::new(&pipeline).export().await.unwrap_err();

        match error {
            SouthbayError::Request(RequestError::ExportFailed { message }) => {
                assert_eq!(message, "Exportación no disponible")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.requests_to("/v1/stores/export").len(), 1);
    }

    #[tokio::test]
    async fn test_upload_of_csv_never_reaches_network() {
        let transport = Arc::new(MockHttpTransport::new());
        let pipeline = pipeline(transport.clone());

        let file = UploadFile::new("stores.csv", "text/csv", &b"Nombre,ID Externo,Estado\n"[..]);
        let error = StoresService::new(&pipeline).upload(file).await.unwrap_err();

        assert!(matches!(
            error,
            SouthbayError::UploadValidation(UploadValidationError::InvalidExtension)
        ));
        assert_eq!(transport.request_count(), 0);
    }
}
