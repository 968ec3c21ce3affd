//! CLI Exit Codes
//!
//! Standard exit codes for CLI operations and automation.

use crate::config::SettingsError;
use crate::core::error::NetworkError;
use std::process::ExitCode;

/// Exit code constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodes;

impl ExitCodes {
    /// Success
    pub const SUCCESS: u8 = 0;

    /// General error
    pub const ERROR: u8 = 1;

    /// Invalid arguments
    pub const INVALID_ARGS: u8 = 2;

    /// Configuration error
    pub const CONFIG_ERROR: u8 = 8;

    /// The network worker could not be started
    pub const WORKER_FAILED: u8 = 12;

    /// The network came up without the ports it needs
    pub const NO_PORTS: u8 = 14;

    /// Internal error
    pub const INTERNAL_ERROR: u8 = 127;
}

/// CLI operation result
#[derive(Debug)]
pub enum CliResult {
    /// Success with optional message
    Success(Option<String>),

    /// Error with code and message
    Error(u8, String),
}

impl CliResult {
    /// Plain success
    pub fn success() -> Self {
        Self::Success(None)
    }

    /// Failure with an explicit code
    pub fn error(code: u8, msg: impl Into<String>) -> Self {
        Self::Error(code, msg.into())
    }

    /// Get exit code
    pub fn code(&self) -> u8 {
        match self {
            Self::Success(_) => ExitCodes::SUCCESS,
            Self::Error(code, _) => *code,
        }
    }

    /// Get message
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(Some(msg)) | Self::Error(_, msg) => Some(msg),
            Self::Success(None) => None,
        }
    }

    /// Convert to ExitCode
    pub fn to_exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    /// Is success?
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl From<NetworkError> for CliResult {
    fn from(err: NetworkError) -> Self {
        let code = match err {
            NetworkError::WorkerSpawn(_) => ExitCodes::WORKER_FAILED,
        };
        Self::Error(code, err.to_string())
    }
}

impl From<SettingsError> for CliResult {
    fn from(err: SettingsError) -> Self {
        Self::Error(ExitCodes::CONFIG_ERROR, err.to_string())
    }
}

/// Fail with [`ExitCodes::NO_PORTS`] unless at least `required` ports are up
pub fn ensure_ports(ports: &[String], required: usize) -> Result<(), CliResult> {
    if ports.len() < required {
        return Err(CliResult::error(
            ExitCodes::NO_PORTS,
            format!("Only {} of {required} virtual ports could be created", ports.len()),
        ));
    }
    Ok(())
}

/// Exit code description
pub fn exit_code_description(code: u8) -> &'static str {
    match code {
        0 => "Success",
        1 => "General error",
        2 => "Invalid arguments",
        8 => "Configuration error",
        12 => "Network worker failed to start",
        14 => "Required ports could not be created",
        127 => "Internal error",
        _ => "Unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_result() {
        let success = CliResult::success();
        assert!(success.is_success());
        assert_eq!(success.code(), 0);
        assert_eq!(success.message(), None);

        let error = CliResult::error(ExitCodes::INVALID_ARGS, "bad port count");
        assert!(!error.is_success());
        assert_eq!(error.code(), 2);
        assert_eq!(error.message(), Some("bad port count"));
    }

    #[test]
    fn test_ensure_ports() {
        let one = vec!["/dev/pts/3".to_string()];
        assert!(ensure_ports(&one, 0).is_ok());
        assert!(ensure_ports(&one, 1).is_ok());

        let err = ensure_ports(&[], 2).unwrap_err();
        assert_eq!(err.code(), ExitCodes::NO_PORTS);
        assert_eq!(err.message(), Some("Only 0 of 2 virtual ports could be created"));
    }

    #[test]
    fn test_from_network_error() {
        assert_eq!(
            exit_code_description(ExitCodes::NO_PORTS),
            "Required ports could not be created"
        );

        let spawn = std::io::Error::new(std::io::ErrorKind::Other, "no threads");
        assert_eq!(
            CliResult::from(NetworkError::WorkerSpawn(spawn)).code(),
            ExitCodes::WORKER_FAILED
        );
    }
}
