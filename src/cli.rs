use anyhow::{Result, bail};
use clap::{ArgAction, Parser, Subcommand};

use crate::{
    commands::{AuthCommand, CleanCommand, CompletionsCommand, ConfigureCommand, StatusCommand},
    constants::DEFAULT_DESTINATION_PROFILE,
};

#[derive(Debug, Clone, Parser)]
#[command(name = "aws-otp-auth", version, about = "Refresh AWS session credentials with an MFA one-time password", long_about = None)]
pub struct Cli {
    #[arg(
        short = 'p',
        long = "profile-to",
        visible_alias = "profile",
        global = true,
        default_value = DEFAULT_DESTINATION_PROFILE,
        help = "AWS profile to update with new session credentials"
    )]
    pub profile: String,

    #[arg(short = 'v', long, global = true, action = ArgAction::Count, help = "Increase verbosity (-v info, -vv debug, -vvv trace)")]
    pub verbose: u8,

    /// `auth` flags accepted without naming the subcommand
    #[command(flatten)]
    pub auth: AuthCommand,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    #[command(about = "Refresh session credentials using an MFA one-time password")]
    Auth(AuthCommand),
    #[command(about = "Remove an expired session token from the profile")]
    Clean(CleanCommand),
    #[command(about = "Show the profile's session expiry and validate it with AWS")]
    Status(StatusCommand),
    #[command(about = "Configure default source profile, MFA device and duration")]
    Configure(ConfigureCommand),
    #[command(about = "Generate shell completion scripts for aws-otp-auth")]
    Completions(CompletionsCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let profile = self.profile;
        let verbose = self.verbose > 0;
        let command = resolve_command(self.command, self.auth)?;

        match command {
            Commands::Auth(cmd) => cmd.execute(&profile, verbose).await,
            Commands::Clean(cmd) => cmd.execute(&profile).await,
            Commands::Status(cmd) => cmd.execute(&profile).await,
            Commands::Configure(cmd) => cmd.execute(&profile).await,
            Commands::Completions(cmd) => {
                cmd.execute();
                Ok(())
            }
        }
    }
}

// Root-level auth flags only apply when no subcommand is named.
fn resolve_command(command: Option<Commands>, auth: AuthCommand) -> Result<Commands> {
    match command {
        None => Ok(Commands::Auth(auth)),
        Some(_) if auth != AuthCommand::default() => {
            bail!("Authentication options must follow `auth` or be given without a subcommand")
        }
        Some(command) => Ok(command),
    }
}
