//! Persisted state: stage snapshots keyed by REST API and stage, plus the
//! JSON state file that stands in for the hosting tool's declared state.
//!
//! Snapshots travel as four fields joined by `!`, in order: trace flag,
//! logging level, access-log format, access-log destination ARN. Disabled
//! access logging is encoded with the `NO` sentinel in both trailing fields.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{ApiAuditError, ApiAuditResult};

/// Sentinel marking "access logging was disabled" in the wire encoding.
const DISABLED_SENTINEL: &str = "NO";

/// Field separator of the wire encoding.
const FIELD_SEPARATOR: char = '!';

/// Composite identifier of one deployment stage.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StageKey {
    pub rest_api_id: String,
    pub stage_name: String,
}

impl StageKey {
    pub fn new(rest_api_id: impl Into<String>, stage_name: impl Into<String>) -> Self {
        Self {
            rest_api_id: rest_api_id.into(),
            stage_name: stage_name.into(),
        }
    }
}

impl fmt::Display for StageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.rest_api_id, self.stage_name)
    }
}

/// Access-log configuration of a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessLogs {
    Disabled,
    Enabled {
        format: String,
        destination_arn: String,
    },
}

/// Snapshot of a stage's logging configuration at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageLogState {
    pub trace_enabled: bool,
    pub logging_level: String,
    pub access_logs: AccessLogs,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotDecodeError {
    #[error("expected 4 '!'-separated fields, found {0}")]
    FieldCount(usize),
    #[error("trace flag must be 'true' or 'false', found '{0}'")]
    TraceFlag(String),
}

impl StageLogState {
    pub fn encode(&self) -> String {
        let (format, destination_arn) = match &self.access_logs {
            AccessLogs::Disabled => (DISABLED_SENTINEL, DISABLED_SENTINEL),
            AccessLogs::Enabled {
                format,
                destination_arn,
            } => (format.as_str(), destination_arn.as_str()),
        };
        format!(
            "{}!{}!{}!{}",
            self.trace_enabled, self.logging_level, format, destination_arn
        )
    }

    /// Parse the `!`-joined wire encoding.
    ///
    /// The trace flag, logging level, and destination ARN cannot contain the
    /// separator, but a pre-existing access-log format can; the two leading
    /// fields are taken from the left and the ARN from the right so such
    /// formats survive a round trip.
    pub fn decode(encoded: &str) -> Result<Self, SnapshotDecodeError> {
        let mut parts = encoded.splitn(3, FIELD_SEPARATOR);
        let (Some(trace), Some(level), Some(rest)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(SnapshotDecodeError::FieldCount(
                encoded.split(FIELD_SEPARATOR).count(),
            ));
        };
        let Some((format, destination_arn)) = rest.rsplit_once(FIELD_SEPARATOR) else {
            return Err(SnapshotDecodeError::FieldCount(3));
        };

        let trace_enabled = match trace {
            "true" => true,
            "false" => false,
            other => return Err(SnapshotDecodeError::TraceFlag(other.to_string())),
        };

        let access_logs = if format == DISABLED_SENTINEL {
            AccessLogs::Disabled
        } else {
            AccessLogs::Enabled {
                format: format.to_string(),
                destination_arn: destination_arn.to_string(),
            }
        };

        Ok(Self {
            trace_enabled,
            logging_level: level.to_string(),
            access_logs,
        })
    }
}

/// Mapping from encoded [`StageKey`] to encoded [`StageLogState`].
pub type StateStore = BTreeMap<String, String>;

/// The toolkit's persisted declared state.
///
/// Read wholesale at the start of an operation and written wholesale at the
/// end; there is no incremental persistence, so a crash mid-operation can
/// leave this stale relative to live stage configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AuditState {
    /// REST API ids currently tracked for verbose logging.
    #[serde(default)]
    pub rest_api_ids: BTreeSet<String>,
    /// Per-stage snapshots taken before verbose logging was applied.
    #[serde(default)]
    pub rest_api_states: StateStore,
    /// Per-stage descriptions snapshotted before being overwritten.
    #[serde(default)]
    pub stage_descriptions: BTreeMap<String, String>,
}

impl AuditState {
    /// Load the state file, treating a missing file as empty state.
    pub fn load(path: &Path) -> ApiAuditResult<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ApiAuditError::StateIo {
                    operation: "read",
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        serde_json::from_str(&contents).map_err(|e| ApiAuditError::StateFormat {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Write the state file wholesale.
    pub fn save(&self, path: &Path) -> ApiAuditResult<()> {
        let contents = serde_json::to_string_pretty(self).map_err(|e| {
            ApiAuditError::StateFormat {
                path: path.to_path_buf(),
                source: e,
            }
        })?;
        std::fs::write(path, contents).map_err(|e| ApiAuditError::StateIo {
            operation: "write",
            path: path.to_path_buf(),
            source: e,
        })
    }
}
