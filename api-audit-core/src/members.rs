//! Macie2 organization membership: associate and disassociate lists of
//! member accounts, and diff-based sync against the live membership.

use log::warn;

use crate::aws::macie::MacieMembers;
use crate::aws::AwsError;
use crate::error::ApiAuditResult;

/// Placeholder address required by `CreateMember`; organization members are
/// auto-enabled and never invited by email.
const MEMBER_EMAIL: &str = "notused2join@awsorganization.com";

/// Substring Macie2 returns when deleting an account that is not associated
/// with the administrator account.
const NOT_ASSOCIATED: &str = "is not associated";

/// Elements of `desired` that are missing from `current`, in order.
pub fn diff(desired: &[String], current: &[String]) -> Vec<String> {
    desired
        .iter()
        .filter(|id| !current.contains(id))
        .cloned()
        .collect()
}

/// Outcome of a [`MembershipManager::sync`] call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncOutcome {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

pub struct MembershipManager<'a, M: MacieMembers> {
    macie: &'a M,
}

impl<'a, M: MacieMembers> MembershipManager<'a, M> {
    pub fn new(macie: &'a M) -> Self {
        Self { macie }
    }

    /// Account ids currently associated as members.
    pub async fn current_members(&self) -> ApiAuditResult<Vec<String>> {
        Ok(self.macie.list_member_ids().await?)
    }

    /// Associate each account as a member; the first failure aborts the
    /// remaining accounts.
    pub async fn add_members(&self, account_ids: &[String]) -> ApiAuditResult<usize> {
        for account_id in account_ids {
            self.macie.create_member(account_id, MEMBER_EMAIL).await?;
        }
        Ok(account_ids.len())
    }

    /// Disassociate and delete each member account.
    ///
    /// A delete that fails because the account is not associated with the
    /// administrator account is a warning, not an error; every other
    /// failure aborts the remaining accounts.
    pub async fn remove_members(&self, account_ids: &[String]) -> ApiAuditResult<usize> {
        let mut removed = 0;
        for account_id in account_ids {
            self.macie.disassociate_member(account_id).await?;
            match self.macie.delete_member(account_id).await {
                Ok(()) => removed += 1,
                Err(AwsError::MacieError(message)) if message.contains(NOT_ASSOCIATED) => {
                    warn!(
                        "Member account '{account_id}' is not associated with the \
                         administrator account, skipping delete"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }

    /// Reconcile the live membership against `desired`: associate the
    /// missing accounts, then remove the extraneous ones.
    pub async fn sync(&self, desired: &[String]) -> ApiAuditResult<SyncOutcome> {
        let current = self.current_members().await?;

        let to_add = diff(desired, &current);
        if !to_add.is_empty() {
            self.add_members(&to_add).await?;
        }

        let to_remove = diff(&current, desired);
        if !to_remove.is_empty() {
            self.remove_members(&to_remove).await?;
        }

        Ok(SyncOutcome {
            added: to_add,
            removed: to_remove,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::aws::AwsResult;

    #[derive(Default)]
    struct FakeMacie {
        members: Mutex<BTreeSet<String>>,
        fail_disassociate: bool,
    }

    impl FakeMacie {
        fn with_members(ids: &[&str]) -> Self {
            Self {
                members: Mutex::new(ids.iter().map(ToString::to_string).collect()),
                fail_disassociate: false,
            }
        }

        fn member_ids(&self) -> Vec<String> {
            self.members.lock().unwrap().iter().cloned().collect()
        }
    }

    #[async_trait]
    impl MacieMembers for FakeMacie {
        async fn list_member_ids(&self) -> AwsResult<Vec<String>> {
            Ok(self.member_ids())
        }

        async fn create_member(&self, account_id: &str, _email: &str) -> AwsResult<()> {
            self.members.lock().unwrap().insert(account_id.to_string());
            Ok(())
        }

        async fn disassociate_member(&self, account_id: &str) -> AwsResult<()> {
            if self.fail_disassociate {
                return Err(AwsError::MacieError(format!(
                    "Failed to disassociate member '{account_id}'"
                )));
            }
            Ok(())
        }

        async fn delete_member(&self, account_id: &str) -> AwsResult<()> {
            let mut members = self.members.lock().unwrap();
            if members.remove(account_id) {
                Ok(())
            } else {
                Err(AwsError::MacieError(format!(
                    "The specified account is not associated with your account: '{account_id}'"
                )))
            }
        }
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_diff() {
        assert_eq!(
            diff(&ids(&["a", "b", "c"]), &ids(&["b"])),
            ids(&["a", "c"])
        );
        assert!(diff(&ids(&["a"]), &ids(&["a", "b"])).is_empty());
        assert!(diff(&[], &ids(&["a"])).is_empty());
    }

    #[tokio::test]
    async fn test_sync_adds_missing_and_removes_extraneous() {
        let macie = FakeMacie::with_members(&["111111111111", "222222222222"]);
        let manager = MembershipManager::new(&macie);

        let outcome = manager
            .sync(&ids(&["222222222222", "333333333333"]))
            .await
            .expect("sync");

        assert_eq!(outcome.added, ids(&["333333333333"]));
        assert_eq!(outcome.removed, ids(&["111111111111"]));
        assert_eq!(macie.member_ids(), ids(&["222222222222", "333333333333"]));
    }

    #[tokio::test]
    async fn test_sync_with_matching_membership_is_a_no_op() {
        let macie = FakeMacie::with_members(&["111111111111"]);
        let manager = MembershipManager::new(&macie);

        let outcome = manager.sync(&ids(&["111111111111"])).await.expect("sync");
        assert_eq!(outcome, SyncOutcome::default());
    }

    #[tokio::test]
    async fn test_remove_tolerates_not_associated_accounts() {
        let macie = FakeMacie::with_members(&["111111111111"]);
        let manager = MembershipManager::new(&macie);

        // 999999999999 was never associated; its delete fails with the
        // not-associated message and must not abort the batch.
        let removed = manager
            .remove_members(&ids(&["999999999999", "111111111111"]))
            .await
            .expect("remove");
        assert_eq!(removed, 1);
        assert!(macie.member_ids().is_empty());
    }

    #[tokio::test]
    async fn test_remove_fails_on_disassociate_error() {
        let mut macie = FakeMacie::with_members(&["111111111111"]);
        macie.fail_disassociate = true;
        let manager = MembershipManager::new(&macie);

        assert!(manager
            .remove_members(&ids(&["111111111111"]))
            .await
            .is_err());
        assert_eq!(macie.member_ids(), ids(&["111111111111"]));
    }
}
