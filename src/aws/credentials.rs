use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use aws_smithy_types::{DateTime, date_time::Format};
use ini::{Ini, ParseOption, Properties};
use tokio::fs;
use tracing::{debug, info};

use super::{Credentials, SessionCredentials};
use crate::{constants::CREDENTIALS_BACKUP_SUFFIX, error::CredentialsError};

pub const ACCESS_KEY_ID: &str = "aws_access_key_id";
pub const SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
pub const SESSION_TOKEN: &str = "aws_session_token";
pub const SESSION_TOKEN_EXPIRATION: &str = "aws_session_token_expiration";

/// Path of the backup written before every update: `<path>.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut backup = OsString::from(path.as_os_str());
    backup.push(CREDENTIALS_BACKUP_SUFFIX);
    PathBuf::from(backup)
}

/// Read the credentials stored for `profile`
pub async fn read(path: &Path, profile: &str) -> Result<Credentials, CredentialsError> {
    let ini = load_ini(path).await?;

    let section = ini
        .section(Some(profile))
        .ok_or_else(|| CredentialsError::ProfileNotFound {
            profile: profile.to_string(),
            path: path.to_path_buf(),
        })?;

    credentials_from_section(profile, section)
}

/// Store a session credential bundle under `profile`.
///
/// An existing file is first copied to [`backup_path`]; if that copy fails the
/// credentials file is left untouched. Only the lines of `profile` change, the
/// rest of the file is written back as it was read.
pub async fn write(
    path: &Path,
    profile: &str,
    creds: &SessionCredentials,
) -> Result<(), CredentialsError> {
    let contents = if path.exists() {
        let backup = backup_path(path);
        fs::copy(path, &backup)
            .await
            .map_err(|source| CredentialsError::Backup {
                path: path.to_path_buf(),
                backup: backup.clone(),
                source,
            })?;
        debug!("Backed up {} to {}", path.display(), backup.display());

        let contents = read_contents(path).await?;
        parse_ini(path, &contents)?;
        contents
    } else {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| CredentialsError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        String::new()
    };

    let expiration = creds
        .expiration
        .fmt(Format::DateTime)
        .unwrap_or_else(|_| "unknown".to_string());

    let edit = SectionEdit {
        section: profile,
        set: vec![
            (ACCESS_KEY_ID, creds.access_key_id.clone()),
            (SECRET_ACCESS_KEY, creds.secret_access_key.clone()),
            (SESSION_TOKEN, creds.session_token.clone()),
            (SESSION_TOKEN_EXPIRATION, expiration),
        ],
        remove: &[],
    };
    save_contents(path, &edit.apply(&contents)).await?;

    info!("Credentials saved to profile: {}", profile);
    Ok(())
}

/// Remove an expired session token and its expiration from `profile`.
///
/// Returns whether the file was modified. A missing file or profile is not an error.
pub async fn clean_expired(path: &Path, profile: &str) -> Result<bool, CredentialsError> {
    if !path.exists() {
        debug!("No credentials file at {}, nothing to clean", path.display());
        return Ok(false);
    }

    let contents = read_contents(path).await?;
    let ini = parse_ini(path, &contents)?;
    let Some(section) = ini.section(Some(profile)) else {
        debug!("Profile {} not found, nothing to clean", profile);
        return Ok(false);
    };

    if !stored_credentials(profile, section).is_expired_at(super::now()) {
        return Ok(false);
    }

    let edit = SectionEdit {
        section: profile,
        set: Vec::new(),
        remove: &[SESSION_TOKEN, SESSION_TOKEN_EXPIRATION],
    };
    save_contents(path, &edit.apply(&contents)).await?;

    info!("Removed expired session token from profile: {}", profile);
    Ok(true)
}

fn credentials_from_section(
    profile: &str,
    section: &Properties,
) -> Result<Credentials, CredentialsError> {
    for key in [ACCESS_KEY_ID, SECRET_ACCESS_KEY] {
        if section.get(key).is_none_or(str::is_empty) {
            return Err(CredentialsError::Incomplete {
                profile: profile.to_string(),
                key,
            });
        }
    }

    Ok(stored_credentials(profile, section))
}

// Lenient view of a section: empty values read as absent.
fn stored_credentials(profile: &str, section: &Properties) -> Credentials {
    let value = |key: &str| {
        section
            .get(key)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    let expiration = value(SESSION_TOKEN_EXPIRATION).and_then(|value| {
        let parsed = parse_expiration(&value);
        if parsed.is_none() {
            debug!("Ignoring malformed expiration for profile {}: {}", profile, value);
        }
        parsed
    });

    Credentials {
        access_key_id: value(ACCESS_KEY_ID).unwrap_or_default(),
        secret_access_key: value(SECRET_ACCESS_KEY).unwrap_or_default(),
        session_token: value(SESSION_TOKEN),
        expiration,
    }
}

// RFC 3339, with either a `Z` suffix or a numeric offset
fn parse_expiration(value: &str) -> Option<DateTime> {
    DateTime::from_str(value, Format::DateTime)
        .or_else(|_| DateTime::from_str(value, Format::DateTimeWithOffset))
        .ok()
}

/// Line-level update of one INI section.
///
/// Lines outside `section`, comments and untouched keys inside it are copied
/// through byte for byte. Keys in `set` are rewritten in place or appended
/// after the section's last entry; keys in `remove` are dropped. A missing
/// section is appended to the end of the file.
struct SectionEdit<'a> {
    section: &'a str,
    set: Vec<(&'static str, String)>,
    remove: &'a [&'static str],
}

impl SectionEdit<'_> {
    fn apply(&self, contents: &str) -> String {
        let newline = if contents.contains("\r\n") { "\r\n" } else { "\n" };
        let mut lines: Vec<String> = Vec::new();
        let mut written: Vec<&str> = Vec::new();
        // index in `lines` right after the target section's last entry
        let mut insert_at = None;
        let mut in_target = false;

        for line in contents.split_inclusive('\n') {
            let trimmed = line.trim();

            if let Some(name) = section_header(trimmed) {
                in_target = insert_at.is_none() && name == self.section;
                lines.push(line.to_string());
                if in_target {
                    insert_at = Some(lines.len());
                }
                continue;
            }

            if in_target {
                if let Some(key) = entry_key(trimmed) {
                    if self.remove.iter().any(|removed| *removed == key) || written.contains(&key) {
                        continue;
                    }
                    if let Some((key, value)) = self.set.iter().find(|(k, _)| *k == key) {
                        lines.push(format!("{key} = {value}{}", line_ending(line)));
                        written.push(*key);
                        insert_at = Some(lines.len());
                        continue;
                    }
                }
                lines.push(line.to_string());
                if !trimmed.is_empty() {
                    insert_at = Some(lines.len());
                }
                continue;
            }

            lines.push(line.to_string());
        }

        let pending: Vec<String> = self
            .set
            .iter()
            .filter(|(key, _)| !written.contains(key))
            .map(|(key, value)| format!("{key} = {value}{newline}"))
            .collect();

        let at = match insert_at {
            Some(at) => at,
            None if pending.is_empty() => return lines.concat(),
            None => {
                if let Some(last) = lines.last_mut() {
                    if !last.ends_with('\n') {
                        last.push_str(newline);
                    }
                    lines.push(newline.to_string());
                }
                lines.push(format!("[{}]{newline}", self.section));
                lines.len()
            }
        };

        if let Some(previous) = at.checked_sub(1).and_then(|i| lines.get_mut(i)) {
            if !previous.ends_with('\n') && !pending.is_empty() {
                previous.push_str(newline);
            }
        }
        for (offset, entry) in pending.into_iter().enumerate() {
            lines.insert(at + offset, entry);
        }
        lines.concat()
    }
}

fn line_ending(line: &str) -> &str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else if line.ends_with('\n') {
        "\n"
    } else {
        ""
    }
}

fn section_header(trimmed: &str) -> Option<&str> {
    let inner = trimmed.strip_prefix('[')?;
    let end = inner.find(']')?;
    Some(inner[..end].trim())
}

fn entry_key(trimmed: &str) -> Option<&str> {
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
        return None;
    }
    let end = trimmed.find(['=', ':'])?;
    Some(trimmed[..end].trim())
}

async fn read_contents(path: &Path) -> Result<String, CredentialsError> {
    fs::read_to_string(path)
        .await
        .map_err(|source| CredentialsError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn parse_ini(path: &Path, contents: &str) -> Result<Ini, CredentialsError> {
    // Secrets and tokens must round-trip verbatim.
    let option = ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    };

    Ini::load_from_str_opt(contents, option).map_err(|source| CredentialsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

async fn load_ini(path: &Path) -> Result<Ini, CredentialsError> {
    let contents = read_contents(path).await?;
    parse_ini(path, &contents)
}

async fn save_contents(path: &Path, contents: &str) -> Result<(), CredentialsError> {
    let io_error = |source| CredentialsError::Io {
        path: path.to_path_buf(),
        source,
    };

    fs::write(path, contents).await.map_err(io_error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = fs::metadata(path).await.map_err(io_error)?;
        let mut permissions = metadata.permissions();
        permissions.set_mode(0o600);
        fs::set_permissions(path, permissions)
            .await
            .map_err(io_error)?;
    }

    Ok(())
}
