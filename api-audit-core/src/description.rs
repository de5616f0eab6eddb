//! Stage description management: overwrite a stage's description while
//! keeping the prior value so it can be put back.

use std::collections::BTreeMap;

use log::warn;

use crate::aws::apigateway::{PatchOp, StageApi, StageSummary};
use crate::error::{ApiAuditError, ApiAuditResult};

const PATH_DESCRIPTION: &str = "/description";

/// Store key for a snapshotted description.
fn description_key(rest_api_id: &str, stage_name: &str) -> String {
    format!("{rest_api_id}_{stage_name}")
}

pub struct StageDescriptions<'a, C: StageApi> {
    stages: &'a C,
}

impl<'a, C: StageApi> StageDescriptions<'a, C> {
    pub fn new(stages: &'a C) -> Self {
        Self { stages }
    }

    async fn find_stage(&self, rest_api_id: &str, stage_name: &str) -> ApiAuditResult<StageSummary> {
        self.stages
            .list_stages(rest_api_id)
            .await?
            .into_iter()
            .find(|s| s.name == stage_name)
            .ok_or_else(|| ApiAuditError::StageNotFound {
                rest_api_id: rest_api_id.to_string(),
                stage_name: stage_name.to_string(),
            })
    }

    /// Set a stage's description, snapshotting the current value first.
    ///
    /// Only the first `set` for a stage takes a snapshot; later calls keep
    /// the original pre-set value so `reset` always returns to it.
    pub async fn set(
        &self,
        rest_api_id: &str,
        stage_name: &str,
        description: &str,
        store: &mut BTreeMap<String, String>,
    ) -> ApiAuditResult<()> {
        let key = description_key(rest_api_id, stage_name);
        if !store.contains_key(&key) {
            let current = self.find_stage(rest_api_id, stage_name).await?;
            store.insert(key, current.description);
        }
        self.stages
            .update_stage(
                rest_api_id,
                stage_name,
                vec![PatchOp::replace(PATH_DESCRIPTION, description)],
            )
            .await?;
        Ok(())
    }

    /// Put the snapshotted description back and drop the snapshot.
    ///
    /// A stage with no snapshot is skipped with a warning; returns whether a
    /// restore actually happened.
    pub async fn reset(
        &self,
        rest_api_id: &str,
        stage_name: &str,
        store: &mut BTreeMap<String, String>,
    ) -> ApiAuditResult<bool> {
        let key = description_key(rest_api_id, stage_name);
        let Some(prior) = store.get(&key).cloned() else {
            warn!("No description snapshot for '{key}', leaving the stage as-is");
            return Ok(false);
        };
        self.stages
            .update_stage(
                rest_api_id,
                stage_name,
                vec![PatchOp::replace(PATH_DESCRIPTION, prior)],
            )
            .await?;
        store.remove(&key);
        Ok(true)
    }
}
