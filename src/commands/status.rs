use anyhow::{Context, Result};
use aws_smithy_types::{DateTime, date_time::Format};
use clap::Args;

use crate::{
    aws::{self, Credentials, credentials, sts::SdkStsClient},
    constants,
};

#[derive(Debug, Clone, Args)]
pub struct StatusCommand {
    #[arg(short = 'r', long, help = "AWS region (auto-detected if not provided)")]
    pub region: Option<String>,

    #[arg(long, help = "Only inspect the credentials file, do not call AWS")]
    pub offline: bool,
}

impl StatusCommand {
    pub async fn execute(self, profile: &str) -> Result<()> {
        let path = constants::get_aws_credentials_path()
            .context("Failed to determine AWS credentials path")?;

        let creds = credentials::read(&path, profile)
            .await
            .with_context(|| format!("Failed to read credentials for profile '{profile}'"))?;

        println!("Profile: {profile}");
        println!("Session: {}", describe_session(&creds, aws::now()));

        if self.offline {
            return Ok(());
        }

        let sdk_config = aws::load_sdk_config(profile, self.region.as_deref()).await;
        let identity = aws::sts::check_authentication(&SdkStsClient::new(&sdk_config))
            .await
            .context("Credentials were rejected by AWS")?;

        println!("Account: {}", identity.account.as_deref().unwrap_or("unknown"));
        println!("ARN: {}", identity.arn.as_deref().unwrap_or("unknown"));
        println!("User ID: {}", identity.user_id.as_deref().unwrap_or("unknown"));
        Ok(())
    }
}

fn describe_session(creds: &Credentials, now: DateTime) -> String {
    let expiration = creds
        .expiration
        .and_then(|expiration| expiration.fmt(Format::DateTime).ok());

    match (&creds.session_token, expiration) {
        (None, _) => "no session token (long-term credentials)".to_string(),
        (Some(_), None) => "session token without tracked expiration".to_string(),
        (Some(_), Some(at)) if creds.is_valid_at(now) => format!("valid until {at}"),
        (Some(_), Some(at)) if creds.is_expired_at(now) => format!("expired at {at}"),
        (Some(_), Some(at)) => format!("expires at {at}"),
    }
}
