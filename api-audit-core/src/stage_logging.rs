//! Stage-logging reconciliation: snapshot a REST API's stage logging
//! configuration, apply a verbose-logging profile, and restore the prior
//! configuration later.
//!
//! Stages are reconciled independently and sequentially: there is no
//! atomicity across the stages of one REST API and no rollback if a later
//! stage's patch fails after an earlier one succeeded. The first error
//! aborts the remaining work of the call.

use log::warn;

use crate::aws::apigateway::{PatchOp, StageApi};
use crate::error::{ApiAuditError, ApiAuditResult};
use crate::state::{AccessLogs, StageKey, StageLogState, StateStore};

/// Logging level applied to every stage.
pub const VERBOSE_LOG_LEVEL: &str = "INFO";

/// Structured access-log line emitted per request once logging is enabled.
pub const ACCESS_LOG_FORMAT: &str = r#"{"requestId":"$context.requestId","ip":"$context.identity.sourceIp","caller":"$context.identity.caller","user":"$context.identity.user","requestTime":"$context.requestTime","httpMethod":"$context.httpMethod","path":"$context.path","status":"$context.status","protocol":"$context.protocol","responseLength":"$context.responseLength","domainName":"$context.domainName","accountId":"$context.accountId"}"#;

const PATH_LOG_LEVEL: &str = "/*/*/logging/loglevel";
const PATH_DATA_TRACE: &str = "/*/*/logging/dataTrace";
const PATH_ACCESS_LOG_FORMAT: &str = "/accessLogSettings/format";
const PATH_ACCESS_LOG_ARN: &str = "/accessLogSettings/destinationArn";
const PATH_ACCESS_LOG_SETTINGS: &str = "/accessLogSettings";

/// CloudWatch log group ARN API Gateway writes execution logs to.
pub fn log_group_arn(account_id: &str, region: &str, rest_api_id: &str, stage_name: &str) -> String {
    format!(
        "arn:aws:logs:{region}:{account_id}:log-group:API-Gateway-Execution-Logs_{rest_api_id}/{stage_name}"
    )
}

/// Applies the verbose-logging profile to every stage of a set of REST APIs
/// while preserving enough state to restore the prior configuration.
pub struct StageLoggingReconciler<'a, C: StageApi> {
    stages: &'a C,
    region: String,
    account_id: String,
}

impl<'a, C: StageApi> StageLoggingReconciler<'a, C> {
    pub fn new(stages: &'a C, region: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            stages,
            region: region.into(),
            account_id: account_id.into(),
        }
    }

    /// Capture the current logging configuration of every stage of a REST
    /// API.
    pub async fn snapshot(
        &self,
        rest_api_id: &str,
    ) -> ApiAuditResult<Vec<(StageKey, StageLogState)>> {
        let stages = self.stages.list_stages(rest_api_id).await?;
        Ok(stages
            .into_iter()
            .map(|stage| {
                (
                    StageKey::new(rest_api_id, &stage.name),
                    StageLogState {
                        trace_enabled: stage.trace_enabled,
                        logging_level: stage.logging_level,
                        access_logs: stage.access_logs,
                    },
                )
            })
            .collect())
    }

    /// Snapshot and then apply the verbose-logging profile to every stage.
    ///
    /// Snapshots land in the store before any patch is issued, so a
    /// partially failed apply can still be restored. Returns the number of
    /// stages patched.
    pub async fn apply(&self, rest_api_id: &str, store: &mut StateStore) -> ApiAuditResult<usize> {
        let snapshots = self.snapshot(rest_api_id).await?;
        for (key, state) in &snapshots {
            store.insert(key.to_string(), state.encode());
        }

        let mut patched = 0;
        for (key, _) in &snapshots {
            let ops = vec![
                PatchOp::replace(PATH_LOG_LEVEL, VERBOSE_LOG_LEVEL),
                PatchOp::replace(PATH_DATA_TRACE, "true"),
                PatchOp::replace(PATH_ACCESS_LOG_FORMAT, ACCESS_LOG_FORMAT),
                PatchOp::replace(
                    PATH_ACCESS_LOG_ARN,
                    log_group_arn(&self.account_id, &self.region, rest_api_id, &key.stage_name),
                ),
            ];
            self.stages
                .update_stage(rest_api_id, &key.stage_name, ops)
                .await?;
            patched += 1;
        }
        Ok(patched)
    }

    /// Restore every stage of a REST API to its snapshotted configuration
    /// and drop the consumed snapshots from the store.
    ///
    /// A stage with no snapshot (state lost, or the API was never applied)
    /// is skipped with a warning. A snapshot that fails to decode is a hard
    /// error: skipping it would discard the only copy of the pre-apply
    /// configuration. Returns the number of stages restored.
    pub async fn restore(&self, rest_api_id: &str, store: &mut StateStore) -> ApiAuditResult<usize> {
        let stages = self.stages.list_stages(rest_api_id).await?;
        let mut restored = 0;
        for stage in stages {
            let key = StageKey::new(rest_api_id, &stage.name).to_string();
            let Some(encoded) = store.get(&key) else {
                warn!("No snapshot for stage '{key}', leaving its configuration as-is");
                continue;
            };
            let prior = StageLogState::decode(encoded)
                .map_err(|source| ApiAuditError::Snapshot { key: key.clone(), source })?;

            let mut ops = vec![
                PatchOp::replace(PATH_LOG_LEVEL, prior.logging_level),
                PatchOp::replace(PATH_DATA_TRACE, prior.trace_enabled.to_string()),
            ];
            match prior.access_logs {
                AccessLogs::Disabled => ops.push(PatchOp::remove(PATH_ACCESS_LOG_SETTINGS)),
                AccessLogs::Enabled {
                    format,
                    destination_arn,
                } => {
                    ops.push(PatchOp::replace(PATH_ACCESS_LOG_ARN, destination_arn));
                    ops.push(PatchOp::replace(PATH_ACCESS_LOG_FORMAT, format));
                }
            }

            self.stages.update_stage(rest_api_id, &stage.name, ops).await?;
            store.remove(&key);
            restored += 1;
        }
        Ok(restored)
    }

    /// Apply the verbose-logging profile to each newly tracked REST API.
    pub async fn reconcile_on_add(
        &self,
        rest_api_ids: &[String],
        store: &mut StateStore,
    ) -> ApiAuditResult<usize> {
        let mut patched = 0;
        for rest_api_id in rest_api_ids {
            patched += self.apply(rest_api_id, store).await?;
        }
        Ok(patched)
    }

    /// Restore each no-longer-tracked REST API from its snapshots.
    pub async fn reconcile_on_remove(
        &self,
        rest_api_ids: &[String],
        store: &mut StateStore,
    ) -> ApiAuditResult<usize> {
        let mut restored = 0;
        for rest_api_id in rest_api_ids {
            restored += self.restore(rest_api_id, store).await?;
        }
        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::aws::apigateway::StageSummary;
    use crate::aws::{AwsError, AwsResult};

    /// In-memory stage API that interprets the same patch paths the real
    /// service does.
    struct FakeStageApi {
        stages: Mutex<BTreeMap<(String, String), StageSummary>>,
        fail_listing: bool,
    }

    impl FakeStageApi {
        fn new(stages: Vec<(&str, StageSummary)>) -> Self {
            Self {
                stages: Mutex::new(
                    stages
                        .into_iter()
                        .map(|(api, s)| ((api.to_string(), s.name.clone()), s))
                        .collect(),
                ),
                fail_listing: false,
            }
        }

        fn stage(&self, rest_api_id: &str, stage_name: &str) -> StageSummary {
            self.stages
                .lock()
                .unwrap()
                .get(&(rest_api_id.to_string(), stage_name.to_string()))
                .cloned()
                .expect("stage exists")
        }
    }

    #[async_trait]
    impl StageApi for FakeStageApi {
        async fn list_stages(&self, rest_api_id: &str) -> AwsResult<Vec<StageSummary>> {
            if self.fail_listing {
                return Err(AwsError::ApiGatewayError("listing failed".to_string()));
            }
            Ok(self
                .stages
                .lock()
                .unwrap()
                .iter()
                .filter(|((api, _), _)| api == rest_api_id)
                .map(|(_, s)| s.clone())
                .collect())
        }

        async fn update_stage(
            &self,
            rest_api_id: &str,
            stage_name: &str,
            ops: Vec<PatchOp>,
        ) -> AwsResult<()> {
            let mut stages = self.stages.lock().unwrap();
            let stage = stages
                .get_mut(&(rest_api_id.to_string(), stage_name.to_string()))
                .ok_or_else(|| AwsError::ApiGatewayError(format!("no stage '{stage_name}'")))?;
            for op in ops {
                apply_patch(stage, op);
            }
            Ok(())
        }
    }

    fn apply_patch(stage: &mut StageSummary, op: PatchOp) {
        match op {
            PatchOp::Replace { path, value } => match path.as_str() {
                PATH_LOG_LEVEL => stage.logging_level = value,
                PATH_DATA_TRACE => stage.trace_enabled = value == "true",
                PATH_ACCESS_LOG_FORMAT => {
                    stage.access_logs = match stage.access_logs.clone() {
                        AccessLogs::Enabled {
                            destination_arn, ..
                        } => AccessLogs::Enabled {
                            format: value,
                            destination_arn,
                        },
                        AccessLogs::Disabled => AccessLogs::Enabled {
                            format: value,
                            destination_arn: String::new(),
                        },
                    };
                }
                PATH_ACCESS_LOG_ARN => {
                    stage.access_logs = match stage.access_logs.clone() {
                        AccessLogs::Enabled { format, .. } => AccessLogs::Enabled {
                            format,
                            destination_arn: value,
                        },
                        AccessLogs::Disabled => AccessLogs::Enabled {
                            format: String::new(),
                            destination_arn: value,
                        },
                    };
                }
                other => panic!("unexpected replace path '{other}'"),
            },
            PatchOp::Remove { path } => {
                assert_eq!(path, PATH_ACCESS_LOG_SETTINGS);
                stage.access_logs = AccessLogs::Disabled;
            }
        }
    }

    fn plain_stage(name: &str) -> StageSummary {
        StageSummary {
            name: name.to_string(),
            trace_enabled: false,
            logging_level: "OFF".to_string(),
            access_logs: AccessLogs::Disabled,
            description: String::new(),
        }
    }

    fn custom_logged_stage(name: &str) -> StageSummary {
        StageSummary {
            name: name.to_string(),
            trace_enabled: true,
            logging_level: "ERROR".to_string(),
            access_logs: AccessLogs::Enabled {
                format: "X".to_string(),
                destination_arn: "Y".to_string(),
            },
            description: String::new(),
        }
    }

    #[test]
    fn test_log_group_arn() {
        assert_eq!(
            log_group_arn("111111111111", "us-east-1", "abc123", "prod"),
            "arn:aws:logs:us-east-1:111111111111:log-group:API-Gateway-Execution-Logs_abc123/prod"
        );
    }

    #[test]
    fn test_access_log_format_fields() {
        for field in [
            "requestId",
            "ip",
            "caller",
            "user",
            "requestTime",
            "httpMethod",
            "path",
            "status",
            "protocol",
            "responseLength",
            "domainName",
            "accountId",
        ] {
            assert!(
                ACCESS_LOG_FORMAT.contains(&format!("\"{field}\"")),
                "format is missing field '{field}'"
            );
        }
    }

    #[tokio::test]
    async fn test_apply_configures_every_stage_and_stores_snapshots() {
        let api = FakeStageApi::new(vec![
            ("abc123", plain_stage("dev")),
            ("abc123", custom_logged_stage("prod")),
        ]);
        let reconciler = StageLoggingReconciler::new(&api, "us-east-1", "111111111111");
        let mut store = StateStore::new();

        let patched = reconciler.apply("abc123", &mut store).await.expect("apply");
        assert_eq!(patched, 2);

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("abc123-dev").map(String::as_str), Some("false!OFF!NO!NO"));
        assert_eq!(store.get("abc123-prod").map(String::as_str), Some("true!ERROR!X!Y"));

        for stage_name in ["dev", "prod"] {
            let stage = api.stage("abc123", stage_name);
            assert_eq!(stage.logging_level, "INFO");
            assert!(stage.trace_enabled);
            assert_eq!(
                stage.access_logs,
                AccessLogs::Enabled {
                    format: ACCESS_LOG_FORMAT.to_string(),
                    destination_arn: log_group_arn(
                        "111111111111",
                        "us-east-1",
                        "abc123",
                        stage_name
                    ),
                }
            );
        }
    }

    #[tokio::test]
    async fn test_restore_after_apply_round_trips_both_stages() {
        let api = FakeStageApi::new(vec![
            ("abc123", plain_stage("dev")),
            ("abc123", custom_logged_stage("prod")),
        ]);
        let reconciler = StageLoggingReconciler::new(&api, "us-east-1", "111111111111");
        let mut store = StateStore::new();

        reconciler.apply("abc123", &mut store).await.expect("apply");
        let restored = reconciler
            .restore("abc123", &mut store)
            .await
            .expect("restore");
        assert_eq!(restored, 2);

        assert_eq!(api.stage("abc123", "dev"), plain_stage("dev"));
        assert_eq!(api.stage("abc123", "prod"), custom_logged_stage("prod"));
        assert!(store.is_empty(), "store must be empty after full restore");
    }

    #[tokio::test]
    async fn test_restore_without_snapshot_is_a_skip() {
        let api = FakeStageApi::new(vec![("abc123", custom_logged_stage("prod"))]);
        let reconciler = StageLoggingReconciler::new(&api, "us-east-1", "111111111111");
        let mut store = StateStore::new();

        let restored = reconciler
            .restore("abc123", &mut store)
            .await
            .expect("restore must not fail");
        assert_eq!(restored, 0);
        assert_eq!(api.stage("abc123", "prod"), custom_logged_stage("prod"));
    }

    #[tokio::test]
    async fn test_restore_fails_on_malformed_snapshot() {
        let api = FakeStageApi::new(vec![("abc123", plain_stage("dev"))]);
        let reconciler = StageLoggingReconciler::new(&api, "us-east-1", "111111111111");
        let mut store = StateStore::new();
        store.insert("abc123-dev".to_string(), "true!INFO".to_string());

        let result = reconciler.restore("abc123", &mut store).await;
        assert!(matches!(result, Err(ApiAuditError::Snapshot { .. })));
        // The bad entry stays put for inspection.
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_apply_aborts_when_listing_fails() {
        let mut api = FakeStageApi::new(vec![("abc123", plain_stage("dev"))]);
        api.fail_listing = true;
        let reconciler = StageLoggingReconciler::new(&api, "us-east-1", "111111111111");
        let mut store = StateStore::new();

        assert!(reconciler.apply("abc123", &mut store).await.is_err());
        assert!(store.is_empty(), "no snapshot may be stored on failure");
    }

    #[tokio::test]
    async fn test_reconcile_on_add_and_remove_cover_multiple_apis() {
        let api = FakeStageApi::new(vec![
            ("abc123", plain_stage("dev")),
            ("def456", custom_logged_stage("prod")),
        ]);
        let reconciler = StageLoggingReconciler::new(&api, "eu-west-1", "222222222222");
        let mut store = StateStore::new();
        let ids = vec!["abc123".to_string(), "def456".to_string()];

        let patched = reconciler
            .reconcile_on_add(&ids, &mut store)
            .await
            .expect("add");
        assert_eq!(patched, 2);
        assert_eq!(store.len(), 2);

        let restored = reconciler
            .reconcile_on_remove(&ids, &mut store)
            .await
            .expect("remove");
        assert_eq!(restored, 2);
        assert!(store.is_empty());
        assert_eq!(api.stage("abc123", "dev"), plain_stage("dev"));
        assert_eq!(api.stage("def456", "prod"), custom_logged_stage("prod"));
    }
}
