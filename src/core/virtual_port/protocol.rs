//! Command/response protocol between the network controller and its worker
//!
//! ```text
//! ┌──────────────┐      Command       ┌──────────────┐
//! │              │───────────────────>│              │
//! │  Controller  │                    │    Worker    │
//! │              │<───────────────────│              │
//! └──────────────┘  Response (1/unit) └──────────────┘
//! ```
//!
//! Every unit of work in a command (one port to create, one device to add,
//! one name to remove) produces exactly one [`Response`], so the controller
//! always knows how many replies to wait for. `Stop` produces none.

use crate::core::error::PortError;
use crate::core::serial::SerialConfig;

/// Messages sent from controller to worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Allocate this many pty pairs
    Create(usize),
    /// Open and attach real serial devices
    AddExternal(Vec<SerialConfig>),
    /// Detach ports by name
    Remove(Vec<String>),
    /// Leave the main loop
    Stop,
}

impl Command {
    /// Number of responses the worker will send back
    pub fn expected_responses(&self) -> usize {
        match self {
            Self::Create(count) => *count,
            Self::AddExternal(ports) => ports.len(),
            Self::Remove(names) => names.len(),
            Self::Stop => 0,
        }
    }
}

/// Messages sent from worker to controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Port is registered (or removed, for `Remove`)
    Ok(String),
    /// The operation failed for one port
    Error {
        /// Human-readable message
        message: String,
        /// Full error chain
        diagnostic: String,
    },
    /// `AddExternal` target is already registered
    AlreadyExists(String),
    /// `Remove` target is not registered
    NotFound(String),
}

impl From<PortError> for Response {
    fn from(err: PortError) -> Self {
        match err {
            PortError::DuplicateName(name) => Self::AlreadyExists(name),
            PortError::NotFound(name) => Self::NotFound(name),
            other => Self::Error {
                message: other.to_string(),
                diagnostic: format!("{other:?}"),
            },
        }
    }
}

/// Parameters the worker starts with
#[derive(Debug, Clone, Default)]
pub struct WorkerInit {
    /// Virtual ports to create before entering the loop
    pub virtual_ports: usize,
    /// Devices to attach before entering the loop
    pub external_ports: Vec<SerialConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_responses() {
        let port = SerialConfig::new("/dev/ttyS0").unwrap();
        assert_eq!(Command::Create(3).expected_responses(), 3);
        assert_eq!(
            Command::AddExternal(vec![port.clone(), port]).expected_responses(),
            2
        );
        assert_eq!(
            Command::Remove(vec!["a".into()]).expected_responses(),
            1
        );
        assert_eq!(Command::Stop.expected_responses(), 0);
    }

    #[test]
    fn test_port_error_mapping() {
        assert_eq!(
            Response::from(PortError::DuplicateName("X".into())),
            Response::AlreadyExists("X".into())
        );
        assert_eq!(
            Response::from(PortError::NotFound("X".into())),
            Response::NotFound("X".into())
        );

        let err = PortError::ResourceExhaustion(std::io::Error::new(
            std::io::ErrorKind::Other,
            "out of ptys",
        ));
        match Response::from(err) {
            Response::Error { message, diagnostic } => {
                assert_eq!(message, "Failed to create pseudo-terminal: out of ptys");
                assert!(diagnostic.contains("ResourceExhaustion"));
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }
}
