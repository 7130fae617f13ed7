//! People (program beneficiaries) service.

use tracing::instrument;

use crate::error::SouthbayResult;
use crate::pagination::{ListParams, ListResponse, Page};
use crate::pipeline::{ApiRequest, AuthPipeline};
use crate::resilience::RetryPolicy;
use crate::types::{Beneficiary, BeneficiaryRequest, ExportedFile, MaybeWrapped, UploadReceipt};
use crate::upload::{UploadFile, PEOPLE_UPLOAD_HEADERS};

use super::support::{export_file, upload_file};

pub const PEOPLE_EXPORT_FALLBACK: &str = "beneficiary.xlsx";

/// Service for the people registered in the discount program.
pub struct PeopleService<'a> {
    pipeline: &'a AuthPipeline,
}

impl<'a> PeopleService<'a> {
    pub fn new(pipeline: &'a AuthPipeline) -> Self {
        Self { pipeline }
    }

    /// Lists people; the search text is matched server-side against name,
    /// email and document.
    #[instrument(name = "southbay.people.list", skip_all)]
    pub async fn list(&self, params: &ListParams) -> SouthbayResult<Page<Beneficiary>> {
        let request = params.apply(
            ApiRequest::get(self.pipeline.config().endpoints.people.as_str()),
            "text",
        );
        let response: ListResponse<Beneficiary> = self.pipeline.execute_json(&request).await?;
        Ok(response.into_page(params))
    }

    pub async fn create(&self, payload: &BeneficiaryRequest) -> SouthbayResult<Beneficiary> {
        let request = ApiRequest::post(self.pipeline.config().endpoints.people.as_str())
            .json(payload)?
            .retry(RetryPolicy::none());
        let person: MaybeWrapped<Beneficiary> = self.pipeline.execute_json(&request).await?;
        Ok(person.into_inner())
    }

    /// Updates a person. The request goes to the collection path with `id`
    /// overriding the payload's own.
    pub async fn update(
        &self,
        id: u64,
        payload: &BeneficiaryRequest,
    ) -> SouthbayResult<Beneficiary> {
        let body = BeneficiaryRequest {
            id,
            ..payload.clone()
        };
        let request = ApiRequest::put(self.pipeline.config().endpoints.people.as_str())
            .json(&body)?
            .retry(RetryPolicy::none());
        let person: MaybeWrapped<Beneficiary> = self.pipeline.execute_json(&request).await?;
        Ok(person.into_inner())
    }

    pub async fn delete(&self, id: u64) -> SouthbayResult<()> {
        let request = ApiRequest::delete(self.pipeline.config().endpoints.person(id))
            .retry(RetryPolicy::none());
        self.pipeline.execute_empty(&request).await
    }

    pub async fn export(&self) -> SouthbayResult<ExportedFile> {
        export_file(
            self.pipeline,
            &self.pipeline.config().endpoints.people_export,
            PEOPLE_EXPORT_FALLBACK,
        )
        .await
    }

    /// Uploads a people spreadsheet, checked against the people template
    /// first.
    #[instrument(name = "southbay.people.upload", skip_all, fields(file = %file.name))]
    pub async fn upload(&self, file: UploadFile) -> SouthbayResult<UploadReceipt> {
        upload_file(
            self.pipeline,
            &self.pipeline.config().endpoints.people_upload,
            file,
            PEOPLE_UPLOAD_HEADERS,
        )
        .await
    }
}
