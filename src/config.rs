use crate::constants::{
    self, DEFAULT_SESSION_DURATION_SECONDS, DEFAULT_SOURCE_PROFILE, MAX_SESSION_DURATION_SECONDS,
    MIN_SESSION_DURATION_SECONDS,
};
use anyhow::{Context, Result};
use dialoguer::{Input, theme::ColorfulTheme};
use ini::{Ini, Properties};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

const SOURCE_PROFILE_KEY: &str = "otp_auth_source_profile";
const MFA_SERIAL_KEY: &str = "mfa_serial";
const DURATION_KEY: &str = "otp_auth_duration_seconds";

/// Per-destination-profile defaults, stored in the AWS config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source_profile: String,
    pub mfa_serial: Option<String>,
    pub session_duration_seconds: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_profile: DEFAULT_SOURCE_PROFILE.to_string(),
            mfa_serial: None,
            session_duration_seconds: DEFAULT_SESSION_DURATION_SECONDS,
        }
    }
}

impl Config {
    fn from_ini_section(section: &Properties) -> Self {
        Self {
            source_profile: section
                .get(SOURCE_PROFILE_KEY)
                .filter(|s| !s.is_empty())
                .unwrap_or(DEFAULT_SOURCE_PROFILE)
                .to_string(),
            mfa_serial: section
                .get(MFA_SERIAL_KEY)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            session_duration_seconds: section
                .get(DURATION_KEY)
                .map_or(DEFAULT_SESSION_DURATION_SECONDS, parse_duration),
        }
    }

    fn save_to_ini(&self, ini: &mut Ini, profile: &str) {
        let name = section_name(profile);

        ini.with_section(Some(name.clone()))
            .set(SOURCE_PROFILE_KEY, &self.source_profile)
            .set(DURATION_KEY, self.session_duration_seconds.to_string());

        match &self.mfa_serial {
            Some(serial) => {
                ini.with_section(Some(name)).set(MFA_SERIAL_KEY, serial);
            }
            None => {
                if let Some(section) = ini.section_mut(Some(name)) {
                    section.remove(MFA_SERIAL_KEY);
                }
            }
        }
    }
}

fn parse_duration(value: &str) -> i32 {
    match value.parse::<i32>() {
        Ok(seconds) if is_valid_duration(seconds) => seconds,
        _ => {
            warn!(
                "Ignoring {} = {} (expected {}-{}), using {}",
                DURATION_KEY,
                value,
                MIN_SESSION_DURATION_SECONDS,
                MAX_SESSION_DURATION_SECONDS,
                DEFAULT_SESSION_DURATION_SECONDS
            );
            DEFAULT_SESSION_DURATION_SECONDS
        }
    }
}

fn is_valid_duration(seconds: i32) -> bool {
    (MIN_SESSION_DURATION_SECONDS..=MAX_SESSION_DURATION_SECONDS).contains(&seconds)
}

fn section_name(profile: &str) -> String {
    if profile == "default" {
        profile.to_string()
    } else {
        format!("profile {profile}")
    }
}

/// Load the configuration for `profile`; falls back to defaults when the
/// config file or the profile section does not exist.
pub async fn load(profile: &str) -> Result<Config> {
    let path = get_config_path()?;
    load_from(&path, profile).await
}

async fn load_from(path: &Path, profile: &str) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let ini = Ini::load_from_file(path)
        .with_context(|| format!("Failed to load config file {}", path.display()))?;

    Ok(ini
        .section(Some(section_name(profile)))
        .map(Config::from_ini_section)
        .unwrap_or_default())
}

pub async fn save(profile: &str, config: &Config) -> Result<()> {
    let path = get_config_path()?;
    save_to(&path, profile, config).await
}

async fn save_to(path: &Path, profile: &str, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut ini = if path.exists() {
        Ini::load_from_file(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?
    } else {
        Ini::new()
    };

    config.save_to_ini(&mut ini, profile);

    ini.write_to_file(path)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

pub async fn configure_interactive(profile: &str) -> Result<()> {
    println!("Configuring aws-otp-auth for profile: {profile}");
    println!("Press Enter to keep current values, or type new values.");
    println!();

    let current = load(profile).await?;
    let theme = ColorfulTheme::default();

    let source_profile = Input::<String>::with_theme(&theme)
        .with_prompt("Source profile (long-term credentials)")
        .default(current.source_profile)
        .interact_text()
        .context("Failed to read source profile")?;

    let mfa_serial = Input::<String>::with_theme(&theme)
        .with_prompt("MFA device ARN (empty to look it up)")
        .default(current.mfa_serial.unwrap_or_default())
        .allow_empty(true)
        .validate_with(|input: &String| {
            if input.is_empty() || input.starts_with("arn:") {
                Ok(())
            } else {
                Err("MFA device ARN must start with 'arn:'")
            }
        })
        .interact_text()
        .context("Failed to read MFA device ARN")?;

    let session_duration_seconds = Input::<i32>::with_theme(&theme)
        .with_prompt(format!(
            "Session duration in seconds ({MIN_SESSION_DURATION_SECONDS}-{MAX_SESSION_DURATION_SECONDS})"
        ))
        .default(current.session_duration_seconds)
        .validate_with(|input: &i32| {
            if is_valid_duration(*input) {
                Ok(())
            } else {
                Err("Duration is outside the range accepted by STS")
            }
        })
        .interact_text()
        .context("Failed to read session duration")?;

    let config = Config {
        source_profile,
        mfa_serial: Some(mfa_serial).filter(|s| !s.is_empty()),
        session_duration_seconds,
    };

    save(profile, &config).await?;

    println!("\nConfiguration saved successfully.");
    Ok(())
}

fn get_config_path() -> Result<PathBuf> {
    constants::get_aws_config_path().context("Failed to determine AWS config path")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_name() {
        assert_eq!(section_name("default"), "default");
        assert_eq!(section_name("work"), "profile work");
    }

    #[test]
    fn test_config_from_ini_section() {
        let mut props = Properties::new();
        props.insert(SOURCE_PROFILE_KEY.to_string(), "work-long-term".to_string());
        props.insert(
            MFA_SERIAL_KEY.to_string(),
            "arn:aws:iam::123456789012:mfa/alice".to_string(),
        );
        props.insert(DURATION_KEY.to_string(), "3600".to_string());

        let config = Config::from_ini_section(&props);

        assert_eq!(config.source_profile, "work-long-term");
        assert_eq!(
            config.mfa_serial.as_deref(),
            Some("arn:aws:iam::123456789012:mfa/alice")
        );
        assert_eq!(config.session_duration_seconds, 3600);
    }

    #[test]
    fn test_config_from_ini_section_with_defaults() {
        let config = Config::from_ini_section(&Properties::new());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_out_of_range_duration_falls_back() {
        let mut props = Properties::new();
        props.insert(DURATION_KEY.to_string(), "60".to_string());
        assert_eq!(
            Config::from_ini_section(&props).session_duration_seconds,
            DEFAULT_SESSION_DURATION_SECONDS
        );

        props.insert(DURATION_KEY.to_string(), "eight hours".to_string());
        assert_eq!(
            Config::from_ini_section(&props).session_duration_seconds,
            DEFAULT_SESSION_DURATION_SECONDS
        );
    }

    #[tokio::test]
    async fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let config = load_from(&dir.path().join("config"), "default").await.unwrap();
        assert_eq!(config, Config::default());
    }

    #[tokio::test]
    async fn test_save_and_load_preserves_other_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        fs::write(&path, "[profile work]\nregion = eu-west-1\n")
            .await
            .unwrap();

        let config = Config {
            source_profile: "work-long-term".to_string(),
            mfa_serial: Some("arn:aws:iam::123456789012:mfa/alice".to_string()),
            session_duration_seconds: 7200,
        };
        save_to(&path, "work", &config).await.unwrap();

        assert_eq!(load_from(&path, "work").await.unwrap(), config);
        assert_eq!(load_from(&path, "default").await.unwrap(), Config::default());

        let ini = Ini::load_from_file(&path).unwrap();
        assert_eq!(
            ini.section(Some("profile work")).unwrap().get("region"),
            Some("eu-west-1")
        );
    }

    #[tokio::test]
    async fn test_save_without_mfa_serial_removes_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        fs::write(&path, "[default]\nmfa_serial = arn:aws:iam::123456789012:mfa/old\n")
            .await
            .unwrap();

        save_to(&path, "default", &Config::default()).await.unwrap();

        assert_eq!(load_from(&path, "default").await.unwrap().mfa_serial, None);
    }
}
