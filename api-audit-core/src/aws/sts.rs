//! STS caller identity lookup.

use aws_sdk_sts::Client as StsClient;

use crate::aws::{AwsError, AwsResult};

/// The identity the toolkit is running as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub account_id: String,
    pub arn: String,
    pub user_id: String,
    /// For assumed-role callers, the underlying IAM role ARN in the shape
    /// EKS access entries expect. `None` for any other caller.
    pub eks_role_arn: Option<String>,
}

/// Fetch the caller identity via `sts:GetCallerIdentity`.
pub(crate) async fn caller_identity(client: &StsClient) -> AwsResult<CallerIdentity> {
    log::debug!("Reading caller identity");
    let response = client
        .get_caller_identity()
        .send()
        .await
        .map_err(|e| AwsError::StsError(format!("Failed to get caller identity: {e:?}")))?;

    let account_id = response
        .account
        .ok_or_else(|| AwsError::StsError("Caller identity has no account id".to_string()))?;
    let arn = response
        .arn
        .ok_or_else(|| AwsError::StsError("Caller identity has no ARN".to_string()))?;
    let user_id = response.user_id.unwrap_or_default();

    let eks_role_arn = arn
        .starts_with("arn:aws:sts")
        .then(|| iam_role_arn_from_session_arn(&arn));

    Ok(CallerIdentity {
        account_id,
        arn,
        user_id,
        eks_role_arn,
    })
}

/// Convert an assumed-role session ARN into the underlying IAM role ARN.
///
/// `arn:aws:sts::123456789012:assumed-role/role-name/session-name` becomes
/// `arn:aws:iam::123456789012:role/role-name`. ARNs that do not match that
/// shape are returned unchanged.
pub fn iam_role_arn_from_session_arn(session_arn: &str) -> String {
    let parts: Vec<&str> = session_arn.split('/').collect();
    if parts.len() != 3 {
        return session_arn.to_string();
    }

    let arn_parts: Vec<&str> = parts[0].split(':').collect();
    if arn_parts.len() != 6 {
        return session_arn.to_string();
    }

    let partition = arn_parts[1];
    let account_id = arn_parts[4];
    let role_name = parts[1];

    format!("arn:{partition}:iam::{account_id}:role/{role_name}")
}
