//! One-time passcode input
//!
//! The passcode arrives out of band (email) and has to be typed in by an
//! operator. This is the only point where the pipeline waits on a human, and
//! it waits without a timeout.

use crate::error::SessionError;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Source of one-time passcodes
#[async_trait]
pub trait OtpSource: Send + Sync {
    /// Block until a passcode sent to `contact` is available
    async fn request_code(&self, contact: &str) -> Result<String, SessionError>;
}

/// Prompts on stdout and reads the passcode from stdin
pub struct StdinOtpSource;

#[async_trait]
impl OtpSource for StdinOtpSource {
    async fn request_code(&self, contact: &str) -> Result<String, SessionError> {
        let mut stdout = tokio::io::stdout();
        let prompt = format!(
            ">>> Enter the one-time passcode sent to {}: ",
            contact
        );
        stdout
            .write_all(prompt.as_bytes())
            .await
            .and(stdout.flush().await)
            .map_err(|e| SessionError::OtpUnavailable(format!("cannot prompt: {}", e)))?;

        let mut line = String::new();
        let read = BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(|e| SessionError::OtpUnavailable(format!("cannot read stdin: {}", e)))?;

        parse_code(read, &line)
    }
}

fn parse_code(bytes_read: usize, line: &str) -> Result<String, SessionError> {
    if bytes_read == 0 {
        return Err(SessionError::OtpUnavailable(
            "stdin closed before a passcode was entered".to_string(),
        ));
    }
    let code: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    if code.is_empty() {
        return Err(SessionError::OtpUnavailable(
            "empty passcode entered".to_string(),
        ));
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_code_strips_whitespace() {
        assert_eq!(parse_code(9, " 123 456\n").unwrap(), "123456");
    }

    #[test]
    fn test_parse_code_eof_is_unavailable() {
        let err = parse_code(0, "").unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("stdin closed"));
    }

    #[test]
    fn test_parse_code_blank_line_is_unavailable() {
        assert!(matches!(
            parse_code(1, "\n"),
            Err(SessionError::OtpUnavailable(_))
        ));
    }
}
