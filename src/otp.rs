use std::io::{self, BufRead, Write};

use tracing::debug;

use crate::error::OtpError;

const OTP_PROMPT: &str = "Enter OTP: ";

/// Return `provided` if non-empty, otherwise prompt and read one line from
/// `input` (stdin when `None`).
pub fn acquire(provided: Option<&str>, input: Option<&mut dyn BufRead>) -> Result<String, OtpError> {
    if let Some(code) = provided.filter(|code| !code.is_empty()) {
        debug!("Using one-time password from the command line");
        return Ok(code.to_string());
    }

    print!("{OTP_PROMPT}");
    io::stdout().flush()?;

    let mut line = String::new();
    let read = match input {
        Some(reader) => reader.read_line(&mut line)?,
        None => io::stdin().lock().read_line(&mut line)?,
    };

    if read == 0 {
        return Err(OtpError::InputClosed);
    }

    Ok(line.trim().to_string())
}
