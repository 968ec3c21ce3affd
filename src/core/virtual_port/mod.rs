//! Virtual serial port network
//!
//! Pseudo-terminal pairs and real serial devices joined on a shared bus:
//! every byte written to one port is delivered to all the others.
//!
//! - [`network::VirtualSerialNetwork`] is the controller callers use
//! - [`worker`] owns the descriptors and runs the `poll(2)` relay loop
//! - [`protocol`] is the typed command/response vocabulary between the two
//! - [`pair::VirtualSerialPair`] is a fixed two-port network

pub mod network;
pub mod pair;
pub mod protocol;
pub mod pty;
pub mod registry;
pub mod worker;

pub use network::{NetworkOptions, VirtualSerialNetwork};
pub use pair::VirtualSerialPair;
pub use protocol::{Command, Response};
pub use pty::{OsPty, PtyFactory, PtyPair};

use crate::core::error::NetworkError;
use crate::core::serial::SerialConfig;

/// Operations shared by every network flavor.
///
/// Mutations block until the worker has answered for every port involved.
/// They never fail: problems are logged and the port list reflects only
/// what the worker confirmed. Before `start` they do nothing.
pub trait SerialNetwork {
    /// Launch the worker and build the initial ports
    fn start(&mut self) -> Result<(), NetworkError>;

    /// Attach serial devices
    fn add(&mut self, ports: Vec<SerialConfig>);

    /// Add virtual ports
    fn create(&mut self, count: usize);

    /// Detach ports by name
    fn remove(&mut self, names: &[String]);

    /// Stop the worker and forget every port
    fn stop(&mut self);

    /// Names of the ports currently in the network
    fn ports(&self) -> &[String];

    /// Is the worker running
    fn is_running(&self) -> bool;
}
