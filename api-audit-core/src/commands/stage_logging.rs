//! Stage-logging operations on the service: enable, restore, list.

use log::{info, warn};

use crate::aws::sts::caller_identity;
use crate::error::ApiAuditResult;
use crate::stage_logging::StageLoggingReconciler;
use crate::state::AuditState;

impl super::service::ApiAuditService {
    /// Enable verbose logging on every stage of the given REST APIs and
    /// start tracking them.
    ///
    /// An already-tracked API is skipped so its original snapshots are not
    /// overwritten with the verbose profile. Returns the number of stages
    /// patched.
    pub async fn enable_logging(
        &self,
        state: &mut AuditState,
        rest_api_ids: &[String],
    ) -> ApiAuditResult<usize> {
        let identity = caller_identity(&self.sts).await?;
        let reconciler =
            StageLoggingReconciler::new(&self.stages, &self.region, &identity.account_id);

        let mut patched = 0;
        for rest_api_id in rest_api_ids {
            if state.rest_api_ids.contains(rest_api_id) {
                warn!("REST API '{rest_api_id}' is already tracked, skipping");
                continue;
            }
            let count = reconciler
                .apply(rest_api_id, &mut state.rest_api_states)
                .await?;
            state.rest_api_ids.insert(rest_api_id.clone());
            info!("Enabled verbose logging on {count} stage(s) of REST API '{rest_api_id}'");
            patched += count;
        }
        Ok(patched)
    }

    /// Restore the snapshotted logging configuration of the given REST APIs
    /// and stop tracking them. With no ids, restores everything tracked.
    /// Returns the number of stages restored.
    pub async fn restore_logging(
        &self,
        state: &mut AuditState,
        rest_api_ids: &[String],
    ) -> ApiAuditResult<usize> {
        let ids: Vec<String> = if rest_api_ids.is_empty() {
            state.rest_api_ids.iter().cloned().collect()
        } else {
            rest_api_ids.to_vec()
        };

        let identity = caller_identity(&self.sts).await?;
        let reconciler =
            StageLoggingReconciler::new(&self.stages, &self.region, &identity.account_id);

        let mut restored = 0;
        for rest_api_id in &ids {
            let count = reconciler
                .restore(rest_api_id, &mut state.rest_api_states)
                .await?;
            state.rest_api_ids.remove(rest_api_id);
            info!("Restored {count} stage(s) of REST API '{rest_api_id}'");
            restored += count;
        }
        Ok(restored)
    }

    /// Stage names of one REST API.
    pub async fn list_stage_names(&self, rest_api_id: &str) -> ApiAuditResult<Vec<String>> {
        use crate::aws::apigateway::StageApi;
        Ok(self
            .stages
            .list_stages(rest_api_id)
            .await?
            .into_iter()
            .map(|stage| stage.name)
            .collect())
    }
}
