//! Crate-level error type for api-audit operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::aws::AwsError;

#[derive(Error, Debug)]
pub enum ApiAuditError {
    #[error(transparent)]
    Aws(#[from] AwsError),

    #[error("Failed to {operation} state file '{path}': {source}")]
    StateIo {
        operation: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("State file '{path}' is not valid JSON: {source}")]
    StateFormat {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Malformed snapshot for stage '{key}': {source}")]
    Snapshot {
        key: String,
        source: crate::state::SnapshotDecodeError,
    },

    #[error("REST API '{rest_api_id}' has no stage named '{stage_name}'")]
    StageNotFound {
        rest_api_id: String,
        stage_name: String,
    },
}

pub type ApiAuditResult<T> = Result<T, ApiAuditError>;
