use std::{env, path::PathBuf};

/// AWS configuration directory name
pub const AWS_CONFIG_DIR_NAME: &str = ".aws";

/// AWS configuration file name
pub const AWS_CONFIG_FILE_NAME: &str = "config";

/// AWS shared credentials file name
pub const AWS_CREDENTIALS_FILE_NAME: &str = "credentials";

/// Suffix appended to the credentials path for the pre-update backup
pub const CREDENTIALS_BACKUP_SUFFIX: &str = ".bak";

/// Profile holding the long-term access keys used to call STS
pub const DEFAULT_SOURCE_PROFILE: &str = "default-long-term";

/// Profile that receives the temporary session credentials
pub const DEFAULT_DESTINATION_PROFILE: &str = "default";

/// Minimum session duration accepted by STS GetSessionToken (15 minutes)
pub const MIN_SESSION_DURATION_SECONDS: i32 = 900;

/// Maximum session duration accepted by STS GetSessionToken (36 hours)
pub const MAX_SESSION_DURATION_SECONDS: i32 = 129_600;

/// Default session duration (8 hours)
pub const DEFAULT_SESSION_DURATION_SECONDS: i32 = 28_800;

/// Default AWS region for STS operations when no region is configured
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Get the AWS config file path
/// Respects AWS_CONFIG_FILE environment variable if set
pub fn get_aws_config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("AWS_CONFIG_FILE") {
        return Some(PathBuf::from(path));
    }

    dirs::home_dir().map(|home| home.join(AWS_CONFIG_DIR_NAME).join(AWS_CONFIG_FILE_NAME))
}

/// Get the AWS credentials file path
/// Respects AWS_SHARED_CREDENTIALS_FILE environment variable if set
pub fn get_aws_credentials_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("AWS_SHARED_CREDENTIALS_FILE") {
        return Some(PathBuf::from(path));
    }

    dirs::home_dir().map(|home| {
        home.join(AWS_CONFIG_DIR_NAME)
            .join(AWS_CREDENTIALS_FILE_NAME)
    })
}

/// Name of the current OS user, used as the IAM user name when none is given
pub fn current_username() -> Option<String> {
    env::var("USER")
        .or_else(|_| env::var("USERNAME"))
        .ok()
        .filter(|name| !name.is_empty())
}
