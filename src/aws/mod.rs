use std::{env, time::SystemTime};

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_smithy_types::DateTime;
use tracing::info;

use crate::constants::DEFAULT_AWS_REGION;

pub mod credentials;
pub mod mfa;
pub mod sts;

/// Credentials stored for a profile in the shared credentials file
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    /// `None` when no expiry is tracked for the profile
    pub expiration: Option<DateTime>,
}

impl Credentials {
    /// True when an expiration is tracked and lies after `now`.
    pub fn is_valid_at(&self, now: DateTime) -> bool {
        self.expiration.is_some_and(|expiration| expiration > now)
    }

    /// True when both a session token and an expiration strictly before `now` are present.
    pub fn is_expired_at(&self, now: DateTime) -> bool {
        self.session_token.is_some() && self.expiration.is_some_and(|expiration| expiration < now)
    }
}

/// AWS temporary credentials returned by STS
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: DateTime,
}

/// Current wall-clock time as an AWS timestamp
pub fn now() -> DateTime {
    DateTime::from(SystemTime::now())
}

/// Load the AWS SDK configuration for `profile`.
///
/// Region priority: explicit `region` -> SDK resolution (env vars, profile) ->
/// `AWS_DEFAULT_REGION` -> [`DEFAULT_AWS_REGION`].
pub async fn load_sdk_config(profile: &str, region: Option<&str>) -> SdkConfig {
    let loader = aws_config::defaults(BehaviorVersion::latest()).profile_name(profile);

    if let Some(region) = region {
        info!("Using region: {}", region);
        return loader.region(Region::new(region.to_string())).load().await;
    }

    let loaded = loader.load().await;
    match loaded.region() {
        Some(region) => {
            info!("Using region: {}", region);
            loaded
        }
        None => {
            let fallback = env::var("AWS_DEFAULT_REGION")
                .ok()
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_AWS_REGION.to_string());
            info!("No region configured, using {} for STS", fallback);
            aws_config::defaults(BehaviorVersion::latest())
                .profile_name(profile)
                .region(Region::new(fallback))
                .load()
                .await
        }
    }
}
