//! API Gateway stage client wrapper.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_apigateway::types::{MethodSetting, Op, PatchOperation, Stage};
use aws_sdk_apigateway::Client as ApiGatewayClient;

use crate::aws::{AwsError, AwsResult};
use crate::state::AccessLogs;

/// Method-settings key covering every resource and method of a stage.
pub(crate) const ALL_METHODS: &str = "*/*";

/// A JSON-Patch-style instruction applied to a stage's configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOp {
    Replace { path: String, value: String },
    Remove { path: String },
}

impl PatchOp {
    pub fn replace(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Replace {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self::Remove { path: path.into() }
    }
}

/// Current configuration of one deployment stage, as read from the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSummary {
    pub name: String,
    pub trace_enabled: bool,
    pub logging_level: String,
    pub access_logs: AccessLogs,
    pub description: String,
}

/// Typed handle over the stage-configuration API.
///
/// The reconcilers take this as an explicit dependency so they can be
/// exercised against an in-memory implementation in tests.
#[async_trait]
pub trait StageApi {
    /// List every stage of a REST API.
    async fn list_stages(&self, rest_api_id: &str) -> AwsResult<Vec<StageSummary>>;

    /// Apply a sequence of patch operations to one stage.
    async fn update_stage(
        &self,
        rest_api_id: &str,
        stage_name: &str,
        ops: Vec<PatchOp>,
    ) -> AwsResult<()>;
}

/// [`StageApi`] implementation over the AWS SDK client.
#[derive(Debug, Clone)]
pub struct AwsStageClient {
    client: ApiGatewayClient,
}

impl AwsStageClient {
    pub fn new(client: ApiGatewayClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StageApi for AwsStageClient {
    async fn list_stages(&self, rest_api_id: &str) -> AwsResult<Vec<StageSummary>> {
        let response = self
            .client
            .get_stages()
            .rest_api_id(rest_api_id)
            .send()
            .await
            .map_err(|e| {
                AwsError::ApiGatewayError(format!(
                    "Failed to list stages for REST API '{rest_api_id}': {e:?}"
                ))
            })?;

        Ok(response
            .item
            .unwrap_or_default()
            .into_iter()
            .filter_map(summarize_stage)
            .collect())
    }

    async fn update_stage(
        &self,
        rest_api_id: &str,
        stage_name: &str,
        ops: Vec<PatchOp>,
    ) -> AwsResult<()> {
        let mut request = self
            .client
            .update_stage()
            .rest_api_id(rest_api_id)
            .stage_name(stage_name);
        for op in ops {
            request = request.patch_operations(into_patch_operation(op));
        }
        request.send().await.map_err(|e| {
            AwsError::ApiGatewayError(format!(
                "Failed to update stage '{stage_name}' of REST API '{rest_api_id}': {e:?}"
            ))
        })?;
        Ok(())
    }
}

fn into_patch_operation(op: PatchOp) -> PatchOperation {
    match op {
        PatchOp::Replace { path, value } => PatchOperation::builder()
            .op(Op::Replace)
            .path(path)
            .value(value)
            .build(),
        PatchOp::Remove { path } => PatchOperation::builder().op(Op::Remove).path(path).build(),
    }
}

fn summarize_stage(stage: Stage) -> Option<StageSummary> {
    let name = stage.stage_name?;
    // A stage that has never had its method settings configured carries no
    // "*/*" entry; it reads as trace off, logging off.
    let (trace_enabled, logging_level) = method_logging(stage.method_settings.as_ref());
    let access_logs = stage.access_log_settings.map_or(AccessLogs::Disabled, |s| {
        AccessLogs::Enabled {
            format: s.format.unwrap_or_default(),
            destination_arn: s.destination_arn.unwrap_or_default(),
        }
    });
    Some(StageSummary {
        name,
        trace_enabled,
        logging_level,
        access_logs,
        description: stage.description.unwrap_or_default(),
    })
}

fn method_logging(settings: Option<&HashMap<String, MethodSetting>>) -> (bool, String) {
    settings
        .and_then(|m| m.get(ALL_METHODS))
        .map_or((false, "OFF".to_string()), |s| {
            (
                s.data_trace_enabled,
                s.logging_level.clone().unwrap_or_else(|| "OFF".to_string()),
            )
        })
}
