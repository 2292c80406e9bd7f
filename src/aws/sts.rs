use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sts::Client as StsClient;
use tracing::{debug, info};

use super::SessionCredentials;
use crate::error::{BoxError, ExchangeError};

/// Identity behind the credentials used to call STS
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerIdentity {
    pub account: Option<String>,
    pub arn: Option<String>,
    pub user_id: Option<String>,
}

/// The STS operations this tool needs
#[async_trait]
pub trait StsApi: Send + Sync {
    async fn get_caller_identity(&self) -> Result<CallerIdentity, BoxError>;

    /// Returns `Ok(None)` when STS answers without a credential payload.
    async fn get_session_token(
        &self,
        serial_number: &str,
        token_code: &str,
        duration_seconds: i32,
    ) -> Result<Option<SessionCredentials>, BoxError>;
}

/// [`StsApi`] backed by the AWS SDK
#[derive(Debug, Clone)]
pub struct SdkStsClient {
    client: StsClient,
}

impl SdkStsClient {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: StsClient::new(config),
        }
    }
}

#[async_trait]
impl StsApi for SdkStsClient {
    async fn get_caller_identity(&self) -> Result<CallerIdentity, BoxError> {
        let response = self.client.get_caller_identity().send().await?;

        Ok(CallerIdentity {
            account: response.account().map(str::to_string),
            arn: response.arn().map(str::to_string),
            user_id: response.user_id().map(str::to_string),
        })
    }

    async fn get_session_token(
        &self,
        serial_number: &str,
        token_code: &str,
        duration_seconds: i32,
    ) -> Result<Option<SessionCredentials>, BoxError> {
        let response = self
            .client
            .get_session_token()
            .serial_number(serial_number)
            .token_code(token_code)
            .duration_seconds(duration_seconds)
            .send()
            .await?;

        Ok(response
            .credentials()
            .map(|sts_creds| SessionCredentials {
                access_key_id: sts_creds.access_key_id().to_string(),
                secret_access_key: sts_creds.secret_access_key().to_string(),
                session_token: sts_creds.session_token().to_string(),
                expiration: *sts_creds.expiration(),
            }))
    }
}

/// Exchange an MFA device serial and one-time code for session credentials.
///
/// Exactly one STS call is made; failures are not retried.
pub async fn get_session_token<S: StsApi + ?Sized>(
    client: &S,
    mfa_serial: &str,
    token_code: &str,
    duration_seconds: i32,
) -> Result<SessionCredentials, ExchangeError> {
    info!("Calling AWS STS GetSessionToken");
    debug!("MFA device: {}", mfa_serial);
    debug!("Duration: {} seconds", duration_seconds);

    let credentials = client
        .get_session_token(mfa_serial, token_code, duration_seconds)
        .await
        .map_err(ExchangeError::Remote)?
        .ok_or(ExchangeError::MissingCredentials)?;

    info!("Successfully obtained AWS credentials");
    Ok(credentials)
}

/// Validate the current credentials with GetCallerIdentity
pub async fn check_authentication<S: StsApi + ?Sized>(
    client: &S,
) -> Result<CallerIdentity, ExchangeError> {
    let identity = client
        .get_caller_identity()
        .await
        .map_err(ExchangeError::Identity)?;

    debug!("Authenticated as {:?}", identity.arn);
    Ok(identity)
}
