//! Macie2 membership operations on the service.

use crate::error::ApiAuditResult;
use crate::members::{MembershipManager, SyncOutcome};

impl super::service::ApiAuditService {
    /// Account ids currently associated as Macie2 members.
    pub async fn macie_members(&self) -> ApiAuditResult<Vec<String>> {
        MembershipManager::new(&self.macie).current_members().await
    }

    /// Associate the given accounts as Macie2 members.
    pub async fn macie_add_members(&self, account_ids: &[String]) -> ApiAuditResult<usize> {
        MembershipManager::new(&self.macie)
            .add_members(account_ids)
            .await
    }

    /// Disassociate and delete the given member accounts.
    pub async fn macie_remove_members(&self, account_ids: &[String]) -> ApiAuditResult<usize> {
        MembershipManager::new(&self.macie)
            .remove_members(account_ids)
            .await
    }

    /// Reconcile the live membership against the desired account list.
    pub async fn macie_sync_members(&self, desired: &[String]) -> ApiAuditResult<SyncOutcome> {
        MembershipManager::new(&self.macie).sync(desired).await
    }
}
