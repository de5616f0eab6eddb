//! Stage-description operations on the service.

use crate::description::StageDescriptions;
use crate::error::ApiAuditResult;
use crate::state::AuditState;

impl super::service::ApiAuditService {
    /// Overwrite a stage's description, snapshotting the prior value.
    pub async fn set_stage_description(
        &self,
        state: &mut AuditState,
        rest_api_id: &str,
        stage_name: &str,
        description: &str,
    ) -> ApiAuditResult<()> {
        StageDescriptions::new(&self.stages)
            .set(
                rest_api_id,
                stage_name,
                description,
                &mut state.stage_descriptions,
            )
            .await
    }

    /// Put the snapshotted description back; returns whether one existed.
    pub async fn reset_stage_description(
        &self,
        state: &mut AuditState,
        rest_api_id: &str,
        stage_name: &str,
    ) -> ApiAuditResult<bool> {
        StageDescriptions::new(&self.stages)
            .reset(rest_api_id, stage_name, &mut state.stage_descriptions)
            .await
    }
}
