//! This crate provides the core business logic for api-audit:
//! - API Gateway stage-logging reconciliation (snapshot, apply, restore)
//! - Stage description management
//! - Macie2 organization membership sync
//! - Caller identity resolution
//!

mod aws;
pub mod commands;
mod description;
mod error;
mod members;
mod stage_logging;
mod state;

// Re-exports for a small, focused public API
pub use aws::apigateway::{AwsStageClient, PatchOp, StageApi, StageSummary};
pub use aws::macie::{AwsMacieClient, MacieMembers};
pub use aws::sts::{iam_role_arn_from_session_arn, CallerIdentity};
pub use aws::{AwsError, AwsResult};
pub use commands::ApiAuditService;
pub use description::StageDescriptions;
pub use error::{ApiAuditError, ApiAuditResult};
pub use members::{diff, MembershipManager, SyncOutcome};
pub use stage_logging::{
    log_group_arn, StageLoggingReconciler, ACCESS_LOG_FORMAT, VERBOSE_LOG_LEVEL,
};
pub use state::{
    AccessLogs, AuditState, SnapshotDecodeError, StageKey, StageLogState, StateStore,
};
