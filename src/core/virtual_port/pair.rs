//! Fixed two-port network

use super::network::{NetworkOptions, VirtualSerialNetwork};
use super::pty::PtyFactory;
use super::SerialNetwork;
use crate::core::error::NetworkError;
use crate::core::serial::SerialConfig;
use tracing::{error, info};

const PAIR_PORTS: usize = 2;

/// Two virtual ports wired to each other, nothing else.
///
/// Membership is fixed: `add`, `create` and `remove` are not supported.
#[derive(Debug)]
pub struct VirtualSerialPair {
    network: VirtualSerialNetwork,
}

impl VirtualSerialPair {
    /// Create a stopped pair
    pub fn new() -> Self {
        Self::with_options(NetworkOptions::default())
    }

    /// Create a stopped pair with explicit options; loopback is always off
    pub fn with_options(options: NetworkOptions) -> Self {
        let options = NetworkOptions {
            loopback: false,
            ..options
        };
        Self {
            network: VirtualSerialNetwork::with_options(PAIR_PORTS, Vec::new(), options),
        }
    }

    /// Replace the pty allocator used by the worker
    #[must_use]
    pub fn with_pty_factory<F>(self, factory: F) -> Self
    where
        F: PtyFactory + Send + Sync + 'static,
    {
        Self {
            network: self.network.with_pty_factory(factory),
        }
    }

    /// Both device paths, once the pair is running
    pub fn endpoints(&self) -> Option<(&str, &str)> {
        match self.network.ports() {
            [a, b] => Some((a.as_str(), b.as_str())),
            _ => None,
        }
    }
}

impl Default for VirtualSerialPair {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialNetwork for VirtualSerialPair {
    /// Start the pair; tears it down again unless both ports came up, in
    /// which case `ports()` is empty afterwards
    fn start(&mut self) -> Result<(), NetworkError> {
        self.network.start()?;

        let created = self.network.virtual_port_count();
        if created < PAIR_PORTS {
            error!(created, required = PAIR_PORTS, "failed to create virtual serial pair");
            self.network.stop();
        }
        Ok(())
    }

    fn add(&mut self, _ports: Vec<SerialConfig>) {
        info!("add is not supported for a virtual serial pair");
    }

    fn create(&mut self, _count: usize) {
        info!("create is not supported for a virtual serial pair");
    }

    fn remove(&mut self, _names: &[String]) {
        info!("remove is not supported for a virtual serial pair");
    }

    fn stop(&mut self) {
        self.network.stop();
    }

    fn ports(&self) -> &[String] {
        self.network.ports()
    }

    fn is_running(&self) -> bool {
        self.network.is_running()
    }
}
