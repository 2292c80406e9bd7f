//! Session credential refresh flow.
//!
//! One run per invocation: check the destination profile, obtain a one-time
//! password, exchange it with STS and commit the result to the credentials file.

use std::{io::BufRead, path::Path};

use anyhow::{Context, Result};
use aws_smithy_types::DateTime;
use tokio::task;
use tracing::{debug, info, warn};

use crate::{
    aws::{self, credentials, sts::StsApi},
    otp,
};

/// Inputs for a single refresh
#[derive(Debug, Clone)]
pub struct RefreshRequest<'a> {
    pub credentials_path: &'a Path,
    /// Profile that receives the new session credentials
    pub profile: &'a str,
    pub mfa_serial: &'a str,
    /// One-time password given up front; prompted for when `None`
    pub otp: Option<&'a str>,
    pub duration_seconds: i32,
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// The stored credentials have not expired; STS was not contacted.
    StillValid { expiration: DateTime },
    Refreshed { expiration: DateTime },
}

/// Source the one-time password is read from when none was given up front
pub type OtpInput = Box<dyn BufRead + Send>;

/// Run the refresh flow against `sts`, reading the OTP from `input` (stdin when `None`).
///
/// The prompt runs on the blocking thread pool.
///
/// Credentials that are still valid short-circuit the run even when
/// `request.force` is set. This mirrors the established behaviour of the tool
/// and is pinned by `test_force_does_not_bypass_valid_credentials`.
pub async fn refresh<S: StsApi + ?Sized>(
    sts: &S,
    input: Option<OtpInput>,
    request: &RefreshRequest<'_>,
) -> Result<RefreshOutcome> {
    match credentials::read(request.credentials_path, request.profile).await {
        Ok(current) => {
            let now = aws::now();
            if let Some(expiration) = current.expiration.filter(|_| current.is_valid_at(now)) {
                if request.force {
                    debug!("Credentials still valid, --force does not override the check");
                }
                info!("Existing credentials for {} are still valid", request.profile);
                return Ok(RefreshOutcome::StillValid { expiration });
            }
        }
        Err(e) => warn!("Failed to read current credentials: {e}"),
    }

    let provided = request.otp.map(str::to_string);
    let code = task::spawn_blocking(move || {
        let mut input = input;
        otp::acquire(
            provided.as_deref(),
            input.as_mut().map(|reader| &mut **reader as &mut dyn BufRead),
        )
    })
    .await
    .context("OTP prompt task failed")?
    .context("Failed to obtain OTP")?;

    let session = aws::sts::get_session_token(
        sts,
        request.mfa_serial,
        &code,
        request.duration_seconds,
    )
    .await
    .context("Failed to get new session token")?;

    credentials::write(request.credentials_path, request.profile, &session)
        .await
        .context("Failed to update credentials file")?;

    Ok(RefreshOutcome::Refreshed {
        expiration: session.expiration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aws::{SessionCredentials, sts::CallerIdentity},
        error::BoxError,
    };
    use async_trait::async_trait;
    use aws_smithy_types::date_time::Format;
    use std::{
        io::Cursor,
        path::PathBuf,
        sync::atomic::{AtomicUsize, Ordering},
    };
    use tempfile::TempDir;
    use tokio::fs;

    const MFA_ARN: &str = "arn:aws:iam::123456789012:mfa/user";

    struct MockSts {
        fail: bool,
        exchanges: AtomicUsize,
    }

    impl MockSts {
        fn ok() -> Self {
            Self {
                fail: false,
                exchanges: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                exchanges: AtomicUsize::new(0),
            }
        }

        fn exchanges(&self) -> usize {
            self.exchanges.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StsApi for MockSts {
        async fn get_caller_identity(&self) -> Result<CallerIdentity, BoxError> {
            Ok(CallerIdentity::default())
        }

        async fn get_session_token(
            &self,
            _serial_number: &str,
            token_code: &str,
            duration_seconds: i32,
        ) -> Result<Option<SessionCredentials>, BoxError> {
            self.exchanges.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err("AccessDenied: MultiFactorAuthentication failed".into());
            }
            Ok(Some(SessionCredentials {
                access_key_id: "ASIANEW".to_string(),
                secret_access_key: "newsecret".to_string(),
                session_token: format!("token-for-{token_code}"),
                expiration: DateTime::from_secs(
                    aws::now().secs() + i64::from(duration_seconds),
                ),
            }))
        }
    }

    async fn credentials_file(contents: &str) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials");
        fs::write(&path, contents).await.unwrap();
        (dir, path)
    }

    fn request<'a>(path: &'a Path, otp: Option<&'a str>, force: bool) -> RefreshRequest<'a> {
        RefreshRequest {
            credentials_path: path,
            profile: "default",
            mfa_serial: MFA_ARN,
            otp,
            duration_seconds: 3600,
            force,
        }
    }

    fn valid_profile(offset_secs: i64) -> String {
        let expiration = DateTime::from_secs(aws::now().secs() + offset_secs)
            .fmt(Format::DateTime)
            .unwrap();
        format!(
            "[default]
aws_access_key_id = ASIAOLD
aws_secret_access_key = oldsecret
aws_session_token = oldtoken
aws_session_token_expiration = {expiration}
"
        )
    }

    #[tokio::test]
    async fn test_refreshes_when_no_session_token() {
        let original = "[default]\naws_access_key_id = AKIA\naws_secret_access_key = longterm\n";
        let (_dir, path) = credentials_file(original).await;
        let sts = MockSts::ok();

        let outcome = refresh(&sts, None, &request(&path, Some("123456"), false))
            .await
            .unwrap();

        assert!(matches!(outcome, RefreshOutcome::Refreshed { .. }));
        assert_eq!(sts.exchanges(), 1);

        let stored = credentials::read(&path, "default").await.unwrap();
        assert_eq!(stored.access_key_id, "ASIANEW");
        assert_eq!(stored.session_token.as_deref(), Some("token-for-123456"));
        assert!(stored.is_valid_at(aws::now()));

        let backup = fs::read_to_string(credentials::backup_path(&path))
            .await
            .unwrap();
        assert_eq!(backup, original);
    }

    #[tokio::test]
    async fn test_valid_credentials_skip_exchange() {
        let contents = valid_profile(3600);
        let (_dir, path) = credentials_file(&contents).await;
        let sts = MockSts::ok();

        let outcome = refresh(&sts, None, &request(&path, Some("123456"), false))
            .await
            .unwrap();

        assert!(matches!(outcome, RefreshOutcome::StillValid { .. }));
        assert_eq!(sts.exchanges(), 0);
        assert_eq!(fs::read_to_string(&path).await.unwrap(), contents);
        assert!(!credentials::backup_path(&path).exists());
    }

    // Force is accepted but the still-valid check runs first, so it has no effect here.
    #[tokio::test]
    async fn test_force_does_not_bypass_valid_credentials() {
        let (_dir, path) = credentials_file(&valid_profile(3600)).await;
        let sts = MockSts::ok();

        let outcome = refresh(&sts, None, &request(&path, Some("123456"), true))
            .await
            .unwrap();

        assert!(matches!(outcome, RefreshOutcome::StillValid { .. }));
        assert_eq!(sts.exchanges(), 0);
    }

    #[tokio::test]
    async fn test_expired_credentials_are_refreshed() {
        let (_dir, path) = credentials_file(&valid_profile(-60)).await;
        let sts = MockSts::ok();
        let input: OtpInput = Box::new(Cursor::new("654321\n"));

        let outcome = refresh(&sts, Some(input), &request(&path, None, false))
            .await
            .unwrap();

        assert!(matches!(outcome, RefreshOutcome::Refreshed { .. }));
        let stored = credentials::read(&path, "default").await.unwrap();
        assert_eq!(stored.session_token.as_deref(), Some("token-for-654321"));
    }

    #[tokio::test]
    async fn test_exchange_failure_leaves_file_untouched() {
        let original = "[default]\naws_access_key_id = AKIA\naws_secret_access_key = longterm\n";
        let (_dir, path) = credentials_file(original).await;
        let sts = MockSts::failing();

        let err = refresh(&sts, None, &request(&path, Some("123456"), false))
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("Failed to get new session token"));
        assert_eq!(sts.exchanges(), 1);
        assert_eq!(fs::read_to_string(&path).await.unwrap(), original);
        assert!(!credentials::backup_path(&path).exists());
    }

    #[tokio::test]
    async fn test_otp_failure_aborts_before_exchange() {
        let (_dir, path) =
            credentials_file("[default]\naws_access_key_id = AKIA\naws_secret_access_key = x\n")
                .await;
        let sts = MockSts::ok();
        let input: OtpInput = Box::new(Cursor::new(""));

        let err = refresh(&sts, Some(input), &request(&path, None, false))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Failed to obtain OTP"));
        assert_eq!(sts.exchanges(), 0);
    }

    #[tokio::test]
    async fn test_missing_credentials_file_is_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials");
        let sts = MockSts::ok();

        let outcome = refresh(&sts, None, &request(&path, Some("123456"), false))
            .await
            .unwrap();

        assert!(matches!(outcome, RefreshOutcome::Refreshed { .. }));
        assert_eq!(
            credentials::read(&path, "default").await.unwrap().access_key_id,
            "ASIANEW"
        );
    }

    #[tokio::test]
    async fn test_unparsable_file_is_not_fatal_until_commit() {
        let (_dir, path) = credentials_file("not an ini file").await;
        let sts = MockSts::ok();

        let err = refresh(&sts, None, &request(&path, Some("123456"), false))
            .await
            .unwrap_err();

        // The check-current read is tolerated; the commit step cannot parse the file.
        assert_eq!(sts.exchanges(), 1);
        assert!(err.to_string().contains("Failed to update credentials file"));
    }
}
