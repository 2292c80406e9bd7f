use anyhow::{Context, Result};
use clap::Args;

use crate::{aws::credentials, constants};

#[derive(Debug, Clone, Args)]
pub struct CleanCommand {}

impl CleanCommand {
    pub async fn execute(self, profile: &str) -> Result<()> {
        let path = constants::get_aws_credentials_path()
            .context("Failed to determine AWS credentials path")?;

        let cleaned = credentials::clean_expired(&path, profile)
            .await
            .context("Failed to clean expired token")?;

        if cleaned {
            println!("Removed expired session token from {profile} profile.");
        } else {
            println!("No expired session token in {profile} profile.");
        }

        Ok(())
    }
}
