//! Error types shared by the credential, OTP, STS and MFA modules.

use std::{io, path::PathBuf};

/// Boxed error returned by remote AWS calls behind the client traits.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while reading or updating the shared credentials file.
#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    /// The file exists but is not well-formed INI.
    #[error("Failed to parse credentials file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ini::ParseError,
    },

    /// The requested profile section is absent.
    #[error("Profile '{profile}' not found in {}", path.display())]
    ProfileNotFound { profile: String, path: PathBuf },

    /// A required key is missing or empty.
    #[error("Incomplete credentials for profile '{profile}': {key} is empty")]
    Incomplete { profile: String, key: &'static str },

    /// Copying the file to its backup failed; nothing was modified.
    #[error("Failed to back up {} to {}", path.display(), backup.display())]
    Backup {
        path: PathBuf,
        backup: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors raised while obtaining a one-time password.
#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("Input ended before a one-time password was entered")]
    InputClosed,

    #[error("Failed to read one-time password")]
    Io(#[from] io::Error),
}

/// Errors raised by calls to AWS STS.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("Failed to get session token")]
    Remote(#[source] BoxError),

    /// STS answered successfully but without a credential payload.
    #[error("AWS STS returned no credentials")]
    MissingCredentials,

    #[error("Authentication check failed")]
    Identity(#[source] BoxError),
}

/// Errors raised while resolving which MFA device to use.
#[derive(Debug, thiserror::Error)]
pub enum MfaError {
    #[error("Failed to list MFA devices for user {user}")]
    Lookup {
        user: String,
        #[source]
        source: BoxError,
    },

    #[error("No MFA devices found for user {user}")]
    NoDevices { user: String },

    #[error(
        "Multiple MFA devices found for user {user}. Please specify one with --mfa-arn: {}",
        devices.join(", ")
    )]
    MultipleDevices { user: String, devices: Vec<String> },
}
