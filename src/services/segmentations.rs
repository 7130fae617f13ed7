//! Segmentation operations service.

use crate::error::SouthbayResult;
use crate::pagination::{ListParams, ListResponse, Page};
use crate::pipeline::{ApiRequest, AuthPipeline};
use crate::resilience::RetryPolicy;
use crate::types::{MaybeWrapped, Segmentation, SegmentationPayload};

/// Service for beneficiary segmentations.
pub struct SegmentationsService<'a> {
    pipeline: &'a AuthPipeline,
}

impl<'a> SegmentationsService<'a> {
    pub fn new(pipeline: &'a AuthPipeline) -> Self {
        Self { pipeline }
    }

    /// Lists segmentations filtered by name. Items the API sends without an
    /// id get their position in the page instead.
    pub async fn list(&self, params: &ListParams) -> SouthbayResult<Page<Segmentation>> {
        let request = params.apply(
            ApiRequest::get(self.pipeline.config().endpoints.segmentations.as_str()),
            "name",
        );
        let response: ListResponse<Segmentation> = self.pipeline.execute_json(&request).await?;

        let mut page = response.into_page(params);
        for (index, item) in page.data.iter_mut().enumerate() {
            item.id.get_or_insert(index as u64);
        }
        Ok(page)
    }

    pub async fn create(&self, payload: &SegmentationPayload) -> SouthbayResult<Segmentation> {
        let request = ApiRequest::post(self.pipeline.config().endpoints.segmentations.as_str())
            .json(payload)?
            .retry(RetryPolicy::none());
        let segmentation: MaybeWrapped<Segmentation> = self.pipeline.execute_json(&request).await?;
        Ok(segmentation.into_inner())
    }

    pub async fn update(
        &self,
        id: u64,
        payload: &SegmentationPayload,
    ) -> SouthbayResult<Segmentation> {
        let request = ApiRequest::put(self.pipeline.config().endpoints.segmentation(id))
            .json(payload)?
            .retry(RetryPolicy::none());
        let segmentation: MaybeWrapped<Segmentation> = self.pipeline.execute_json(&request).await?;
        Ok(segmentation.into_inner())
    }

    pub async fn delete(&self, id: u64) -> SouthbayResult<()> {
        let request =
            ApiRequest::delete(self.pipeline.config().endpoints.segmentation(id))
                .retry(RetryPolicy::none());
        self.pipeline.execute_empty(&request).await
    }
}
