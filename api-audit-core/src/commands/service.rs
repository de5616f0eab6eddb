//! The service struct holding the typed AWS clients.
//!
//! High-level operations (stage logging, descriptions, Macie2 membership,
//! caller identity) are implemented in the sibling files so adapters like
//! the CLI only ever talk to this one type.

use aws_sdk_sts::Client as StsClient;

use crate::aws::apigateway::AwsStageClient;
use crate::aws::macie::AwsMacieClient;
use crate::aws::AwsError;
use crate::error::ApiAuditResult;

pub struct ApiAuditService {
    pub(crate) stages: AwsStageClient,
    pub(crate) macie: AwsMacieClient,
    pub(crate) sts: StsClient,
    pub(crate) region: String,
}

impl ApiAuditService {
    /// Create a service instance with clients built from the standard
    /// credential provider chain.
    pub async fn new() -> ApiAuditResult<Self> {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;
        let region = config
            .region()
            .ok_or_else(|| {
                AwsError::ConfigError(
                    "No AWS region configured; set AWS_REGION or a profile region".to_string(),
                )
            })?
            .to_string();

        Ok(Self {
            stages: AwsStageClient::new(aws_sdk_apigateway::Client::new(&config)),
            macie: AwsMacieClient::new(aws_sdk_macie2::Client::new(&config)),
            sts: StsClient::new(&config),
            region,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}
