use anyhow::{Context, Result};
use aws_smithy_types::{DateTime, date_time::Format};
use clap::{Args, value_parser};
use tracing::info;

use crate::{
    aws::{self, credentials, mfa::SdkIamClient, sts::SdkStsClient},
    config,
    constants::{self, MAX_SESSION_DURATION_SECONDS, MIN_SESSION_DURATION_SECONDS},
    refresh::{self, RefreshOutcome, RefreshRequest},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct AuthCommand {
    #[arg(
        short = 's',
        long = "profile-from",
        help = "AWS profile with long-term credentials used to call STS [default: configured or default-long-term]"
    )]
    pub source_profile: Option<String>,

    #[arg(short = 'r', long, help = "AWS region (auto-detected if not provided)")]
    pub region: Option<String>,

    #[arg(
        long = "mfa-arn",
        help = "MFA device ARN (looked up from IAM if not provided)"
    )]
    pub mfa_arn: Option<String>,

    #[arg(
        short = 'u',
        long,
        help = "IAM user name for the MFA lookup [default: current OS user]"
    )]
    pub user: Option<String>,

    #[arg(long, help = "One-time password (prompted for if not provided)")]
    pub otp: Option<String>,

    #[arg(
        short = 'f',
        long,
        help = "Force re-authentication even if credentials are valid"
    )]
    pub force: bool,

    #[arg(
        short = 'd',
        long,
        value_parser = value_parser!(i32).range(i64::from(MIN_SESSION_DURATION_SECONDS)..=i64::from(MAX_SESSION_DURATION_SECONDS)),
        help = "Session duration in seconds [default: configured or 28800]"
    )]
    pub duration: Option<i32>,
}

impl AuthCommand {
    pub async fn execute(self, profile: &str, verbose: bool) -> Result<()> {
        info!("Starting authentication for profile: {}", profile);

        let config = config::load(profile)
            .await
            .with_context(|| format!("Failed to load configuration for profile '{profile}'"))?;

        let source_profile = self.source_profile.unwrap_or(config.source_profile);
        let duration_seconds = self.duration.unwrap_or(config.session_duration_seconds);
        let credentials_path = constants::get_aws_credentials_path()
            .context("Failed to determine AWS credentials path")?;

        let sdk_config = aws::load_sdk_config(&source_profile, self.region.as_deref()).await;

        let mfa_serial = match self.mfa_arn.or(config.mfa_serial) {
            Some(arn) => arn,
            None => {
                let user = match self.user {
                    Some(user) => user,
                    None => constants::current_username().context(
                        "Unable to determine current OS user; please provide --user",
                    )?,
                };
                let serial = aws::mfa::discover(&SdkIamClient::new(&sdk_config), &user).await?;
                if verbose {
                    eprintln!("Using MFA device ARN: {serial}");
                }
                serial
            }
        };

        credentials::clean_expired(&credentials_path, profile)
            .await
            .context("Failed to clean expired token")?;

        let sts = SdkStsClient::new(&sdk_config);
        let request = RefreshRequest {
            credentials_path: &credentials_path,
            profile,
            mfa_serial: &mfa_serial,
            otp: self.otp.as_deref(),
            duration_seconds,
            force: self.force,
        };

        let outcome = refresh::refresh(&sts, None, &request)
            .await
            .context("Authentication flow failed")?;

        match outcome {
            RefreshOutcome::StillValid { expiration } => {
                println!("Existing credentials are valid. No update necessary.");
                if verbose {
                    println!("Credentials will expire at: {}", format_expiration(expiration));
                }
            }
            RefreshOutcome::Refreshed { expiration } => {
                if verbose {
                    println!("AWS credentials successfully updated.");
                    println!("Credentials will expire at: {}", format_expiration(expiration));
                }
                info!("Session credentials saved to {} profile", profile);
            }
        }

        Ok(())
    }
}

fn format_expiration(expiration: DateTime) -> String {
    expiration
        .fmt(Format::DateTime)
        .unwrap_or_else(|_| "unknown".to_string())
}
