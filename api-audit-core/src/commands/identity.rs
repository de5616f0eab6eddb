//! Caller-identity operation on the service.

use crate::aws::sts::{caller_identity, CallerIdentity};
use crate::error::ApiAuditResult;

impl super::service::ApiAuditService {
    /// The identity the toolkit is running as, per `sts:GetCallerIdentity`.
    pub async fn caller_identity(&self) -> ApiAuditResult<CallerIdentity> {
        Ok(caller_identity(&self.sts).await?)
    }
}
