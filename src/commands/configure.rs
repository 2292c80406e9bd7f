use anyhow::Result;
use clap::Args;

use crate::config;

#[derive(Debug, Clone, Args)]
pub struct ConfigureCommand {
    #[arg(long, help = "Print the effective settings instead of prompting")]
    pub show: bool,
}

impl ConfigureCommand {
    pub async fn execute(self, profile: &str) -> Result<()> {
        if !self.show {
            return config::configure_interactive(profile).await;
        }

        let config = config::load(profile).await?;
        println!("Profile: {profile}");
        println!("Source profile: {}", config.source_profile);
        println!(
            "MFA device ARN: {}",
            config.mfa_serial.as_deref().unwrap_or("(looked up from IAM)")
        );
        println!("Session duration: {} seconds", config.session_duration_seconds);
        Ok(())
    }
}
