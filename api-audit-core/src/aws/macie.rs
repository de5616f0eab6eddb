//! Macie2 organization member client wrapper.

use async_trait::async_trait;
use aws_sdk_macie2::types::AccountDetail;
use aws_sdk_macie2::Client as MacieClient;

use crate::aws::{AwsError, AwsResult};

/// Typed handle over the Macie2 membership API.
#[async_trait]
pub trait MacieMembers {
    /// Account ids currently associated as members.
    async fn list_member_ids(&self) -> AwsResult<Vec<String>>;

    /// Associate one account as a member of this administrator account.
    async fn create_member(&self, account_id: &str, email: &str) -> AwsResult<()>;

    /// Disassociate one member account.
    async fn disassociate_member(&self, account_id: &str) -> AwsResult<()>;

    /// Delete the association with one member account.
    async fn delete_member(&self, account_id: &str) -> AwsResult<()>;
}

/// [`MacieMembers`] implementation over the AWS SDK client.
#[derive(Debug, Clone)]
pub struct AwsMacieClient {
    client: MacieClient,
}

impl AwsMacieClient {
    pub fn new(client: MacieClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MacieMembers for AwsMacieClient {
    async fn list_member_ids(&self) -> AwsResult<Vec<String>> {
        let response = self.client.list_members().send().await.map_err(|e| {
            AwsError::MacieError(format!("Failed to list organization members: {e:?}"))
        })?;
        Ok(response
            .members
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| m.account_id)
            .collect())
    }

    async fn create_member(&self, account_id: &str, email: &str) -> AwsResult<()> {
        let account = AccountDetail::builder()
            .account_id(account_id)
            .email(email)
            .build();
        self.client
            .create_member()
            .account(account)
            .send()
            .await
            .map_err(|e| {
                AwsError::MacieError(format!("Failed to create member '{account_id}': {e:?}"))
            })?;
        Ok(())
    }

    async fn disassociate_member(&self, account_id: &str) -> AwsResult<()> {
        self.client
            .disassociate_member()
            .id(account_id)
            .send()
            .await
            .map_err(|e| {
                AwsError::MacieError(format!(
                    "Failed to disassociate member '{account_id}': {e:?}"
                ))
            })?;
        Ok(())
    }

    async fn delete_member(&self, account_id: &str) -> AwsResult<()> {
        self.client
            .delete_member()
            .id(account_id)
            .send()
            .await
            .map_err(|e| {
                AwsError::MacieError(format!("Failed to delete member '{account_id}': {e:?}"))
            })?;
        Ok(())
    }
}
