//! AWS SDK integration: API Gateway stage client, Macie2 member client,
//! STS caller identity.

pub(crate) mod apigateway;
pub(crate) mod macie;
pub(crate) mod sts;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("AWS configuration error: {0}")]
    ConfigError(String),
    #[error("API Gateway client error: {0}")]
    ApiGatewayError(String),
    #[error("Macie2 client error: {0}")]
    MacieError(String),
    #[error("STS client error: {0}")]
    StsError(String),
}

pub type AwsResult<T> = Result<T, AwsError>;
