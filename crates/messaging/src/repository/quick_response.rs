use futures::StreamExt;

use super::MessageRepository;
use super::query::Projection;
use crate::error::{MessagingResult, ensure_present};
use crate::ids::QuickResponseId;
use crate::types::QuickResponse;

impl MessageRepository {
    pub async fn add_quick_response(
        &self,
        band_member_id: impl Into<String>,
        content: impl Into<String>,
        category: impl Into<String>,
    ) -> MessagingResult<QuickResponse> {
        let band_member_id = band_member_id.into();
        let content = content.into();
        ensure_present(&content, "add-quick-response", "content")?;
        ensure_present(&band_member_id, "add-quick-response", "band_member_id")?;

        let _writer = self.writer.lock().await;

        let quick_response = QuickResponse::new(band_member_id, content, category);
        let mut responses = self.quick_responses.get().as_ref().clone();
        responses.push(quick_response.clone());
        self.quick_responses.replace(responses);

        tracing::debug!(
            quick_response_id = %quick_response.id,
            band_member_id = %quick_response.band_member_id,
            "quick response added"
        );
        Ok(quick_response)
    }

    pub async fn delete_quick_response(&self, response_id: QuickResponseId) {
        let _writer = self.writer.lock().await;

        let current = self.quick_responses.get();
        if !current.iter().any(|response| response.id == response_id) {
            tracing::debug!(%response_id, "delete for unknown quick response ignored");
            return;
        }

        let responses = current
            .iter()
            .filter(|response| response.id != response_id)
            .cloned()
            .collect();
        self.quick_responses.replace(responses);
    }

    pub fn quick_responses_for_band_member(
        &self,
        band_member_id: impl Into<String>,
    ) -> Projection<QuickResponse> {
        let band_member_id = band_member_id.into();
        self.quick_responses
            .subscribe()
            .map(move |snapshot| owned_by(&snapshot, &band_member_id))
            .boxed()
    }

    pub fn quick_responses_for_band_member_snapshot(
        &self,
        band_member_id: &str,
    ) -> Vec<QuickResponse> {
        owned_by(&self.quick_responses.get(), band_member_id)
    }
}

fn owned_by(responses: &[QuickResponse], band_member_id: &str) -> Vec<QuickResponse> {
    responses
        .iter()
        .filter(|response| response.band_member_id == band_member_id)
        .cloned()
        .collect()
}
