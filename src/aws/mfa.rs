use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_iam::Client as IamClient;
use tracing::{debug, info};

use crate::error::{BoxError, MfaError};

/// Lookup of the MFA devices registered to an IAM user
#[async_trait]
pub trait MfaDeviceDirectory: Send + Sync {
    /// Serial numbers (ARNs for virtual devices) registered to `user_name`
    async fn list_mfa_devices(&self, user_name: &str) -> Result<Vec<String>, BoxError>;
}

/// [`MfaDeviceDirectory`] backed by the AWS IAM SDK
#[derive(Debug, Clone)]
pub struct SdkIamClient {
    client: IamClient,
}

impl SdkIamClient {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: IamClient::new(config),
        }
    }
}

#[async_trait]
impl MfaDeviceDirectory for SdkIamClient {
    async fn list_mfa_devices(&self, user_name: &str) -> Result<Vec<String>, BoxError> {
        let response = self
            .client
            .list_mfa_devices()
            .user_name(user_name)
            .send()
            .await?;

        Ok(response
            .mfa_devices()
            .iter()
            .map(|device| device.serial_number().to_string())
            .collect())
    }
}

/// MFA devices available to a user (the empty case is excluded at the type level)
#[derive(Debug, Clone)]
pub enum AvailableDevices {
    /// Exactly one device, selected automatically
    Single(String),
    /// Several devices, an explicit choice is required
    Multiple(Vec<String>),
}

impl AvailableDevices {
    /// Query `directory` for the devices registered to `user_name`
    pub async fn lookup<D: MfaDeviceDirectory + ?Sized>(
        directory: &D,
        user_name: &str,
    ) -> Result<Self, MfaError> {
        info!("Looking up MFA devices for user: {}", user_name);

        let serials = directory
            .list_mfa_devices(user_name)
            .await
            .map_err(|source| MfaError::Lookup {
                user: user_name.to_string(),
                source,
            })?;

        debug!("Found {} MFA device(s)", serials.len());
        Self::from_serials(user_name, serials)
    }

    pub fn from_serials(user_name: &str, serials: Vec<String>) -> Result<Self, MfaError> {
        let mut serials = serials;
        match serials.len() {
            0 => Err(MfaError::NoDevices {
                user: user_name.to_string(),
            }),
            1 => Ok(AvailableDevices::Single(serials.remove(0))),
            _ => Ok(AvailableDevices::Multiple(serials)),
        }
    }

    /// Pick the device to use. Never guesses between several devices.
    pub fn select(self, user_name: &str) -> Result<String, MfaError> {
        match self {
            AvailableDevices::Single(serial) => Ok(serial),
            AvailableDevices::Multiple(devices) => Err(MfaError::MultipleDevices {
                user: user_name.to_string(),
                devices,
            }),
        }
    }
}

/// Resolve the MFA device for `user_name`: one device is used silently,
/// zero or several are configuration errors.
pub async fn discover<D: MfaDeviceDirectory + ?Sized>(
    directory: &D,
    user_name: &str,
) -> Result<String, MfaError> {
    AvailableDevices::lookup(directory, user_name)
        .await?
        .select(user_name)
}
