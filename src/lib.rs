//! # Serialnet Core Library
//!
//! A virtual serial port network for testing software that talks to serial
//! hardware:
//! - Pseudo-terminal pairs that look like real serial devices
//! - Real serial devices attached to the same network
//! - Shared-bus delivery: bytes written to any port reach every other port
//! - Optional loopback, where a port also sees its own bytes
//!
//! ## Example
//!
//! ```rust,no_run
//! use serialnet_core::{SerialNetwork, VirtualSerialNetwork};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut network = VirtualSerialNetwork::new(2, Vec::new(), false);
//!     network.start()?;
//!
//!     // Open these paths from the software under test
//!     for port in network.ports() {
//!         println!("{port}");
//!     }
//!
//!     network.stop();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod core;

// Re-exports for convenience
pub use crate::cli::{CliResult, ExitCodes, OutputFormat};
pub use crate::config::AppConfig;
pub use crate::core::error::{NetworkError, PortError};
pub use crate::core::serial::{ConfigError, SerialConfig, SerialParity};
#[cfg(unix)]
pub use crate::core::virtual_port::{
    NetworkOptions, OsPty, PtyFactory, PtyPair, SerialNetwork, VirtualSerialNetwork,
    VirtualSerialPair,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
