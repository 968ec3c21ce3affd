//! Virtual serial network controller
//!
//! The controller never touches a descriptor. It turns calls into
//! [`Command`]s, waits for one [`Response`] per unit of work, and updates its
//! port list only from confirmed replies.

use super::protocol::{Command, Response, WorkerInit};
use super::pty::{OsPty, PtyFactory};
use super::worker::{self, SharedPtyFactory, WorkerLink};
use super::SerialNetwork;
use crate::core::error::NetworkError;
use crate::core::serial::SerialConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default readiness wait per loop iteration
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Default wait for the worker to exit on stop
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Network tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkOptions {
    /// Deliver a port's bytes back to itself as well
    pub loopback: bool,
    /// Upper bound on how long the worker waits for traffic before checking
    /// for commands again
    pub poll_timeout: Duration,
    /// How long `stop` waits for the worker to exit
    pub stop_timeout: Duration,
}

impl Default for NetworkOptions {
    fn default() -> Self {
        Self {
            loopback: false,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }
}

/// A network of virtual ports and attached serial devices.
///
/// Every byte written to one port is delivered to all other ports.
pub struct VirtualSerialNetwork {
    requested_virtual: usize,
    requested_external: Vec<SerialConfig>,
    options: NetworkOptions,
    pty: SharedPtyFactory,
    link: Option<WorkerLink>,
    virtual_ports: usize,
    external_ports: Vec<SerialConfig>,
    serial_ports: Vec<String>,
}

impl VirtualSerialNetwork {
    /// Create a stopped network
    pub fn new(virtual_ports: usize, external_ports: Vec<SerialConfig>, loopback: bool) -> Self {
        Self::with_options(
            virtual_ports,
            external_ports,
            NetworkOptions {
                loopback,
                ..NetworkOptions::default()
            },
        )
    }

    /// Create a stopped network with explicit options
    pub fn with_options(
        virtual_ports: usize,
        mut external_ports: Vec<SerialConfig>,
        options: NetworkOptions,
    ) -> Self {
        dedup_by_port(&mut external_ports);
        Self {
            requested_virtual: virtual_ports,
            requested_external: external_ports,
            options,
            pty: Arc::new(OsPty),
            link: None,
            virtual_ports: 0,
            external_ports: Vec::new(),
            serial_ports: Vec::new(),
        }
    }

    /// Replace the pty allocator used by the worker
    #[must_use]
    pub fn with_pty_factory<F>(mut self, factory: F) -> Self
    where
        F: PtyFactory + Send + Sync + 'static,
    {
        self.pty = Arc::new(factory);
        self
    }

    /// Network options
    pub fn options(&self) -> &NetworkOptions {
        &self.options
    }

    /// Virtual ports currently in the network
    pub fn virtual_port_count(&self) -> usize {
        self.virtual_ports
    }

    /// Serial devices currently attached
    pub fn external_ports(&self) -> &[SerialConfig] {
        &self.external_ports
    }

    fn push_port(&mut self, name: String) {
        if !self.serial_ports.contains(&name) {
            self.serial_ports.push(name);
        }
    }

    fn push_external(&mut self, config: SerialConfig) {
        if !self.external_ports.iter().any(|p| p.port == config.port) {
            self.external_ports.push(config);
        }
    }

    fn worker(&self, operation: &str) -> Option<&WorkerLink> {
        if self.link.is_none() {
            warn!(operation, "network is not running, ignoring");
        }
        self.link.as_ref()
    }
}

impl SerialNetwork for VirtualSerialNetwork {
    /// Launch the worker with the ports given at construction.
    ///
    /// A restart rebuilds only those; ports added with `add` or `create`
    /// while running are not recreated.
    fn start(&mut self) -> Result<(), NetworkError> {
        if self.link.is_some() {
            warn!("network already running");
            return Ok(());
        }
        debug!(
            virtual_ports = self.requested_virtual,
            external_ports = self.requested_external.len(),
            "starting network"
        );

        let init = WorkerInit {
            virtual_ports: self.requested_virtual,
            external_ports: self.requested_external.clone(),
        };
        let link = worker::spawn(
            init,
            Arc::clone(&self.pty),
            self.options.loopback,
            self.options.poll_timeout,
        )
        .map_err(NetworkError::WorkerSpawn)?;

        let created = link.collect(self.requested_virtual);
        let attached = link.collect(self.requested_external.len());
        self.link = Some(link);

        for response in created {
            match response {
                Response::Ok(name) => {
                    self.push_port(name);
                    self.virtual_ports += 1;
                }
                other => log_failure(&other),
            }
        }

        for response in attached {
            match response {
                Response::Ok(name) => {
                    let config = self.requested_external.iter().find(|p| p.port == name).cloned();
                    if let Some(config) = config {
                        self.push_external(config);
                    }
                    self.push_port(name);
                }
                other => log_failure(&other),
            }
        }

        info!(ports = ?self.serial_ports, "network started");
        Ok(())
    }

    fn add(&mut self, mut ports: Vec<SerialConfig>) {
        dedup_by_port(&mut ports);
        let Some(link) = self.worker("add") else {
            return;
        };

        let responses = link.request(Command::AddExternal(ports.clone()));
        for response in responses {
            match response {
                Response::Ok(name) => {
                    if let Some(config) = ports.iter().find(|p| p.port == name) {
                        self.push_external(config.clone());
                    }
                    info!(port = %name, "external port added");
                    self.push_port(name);
                }
                other => log_failure(&other),
            }
        }
    }

    fn create(&mut self, count: usize) {
        let Some(link) = self.worker("create") else {
            return;
        };

        let responses = link.request(Command::Create(count));
        for response in responses {
            match response {
                Response::Ok(name) => {
                    info!(port = %name, "virtual port added");
                    self.push_port(name);
                    self.virtual_ports += 1;
                }
                other => log_failure(&other),
            }
        }
    }

    fn remove(&mut self, names: &[String]) {
        let Some(link) = self.worker("remove") else {
            return;
        };

        let responses = link.request(Command::Remove(names.to_vec()));
        for response in responses {
            match response {
                Response::Ok(name) => {
                    self.serial_ports.retain(|p| *p != name);
                    if let Some(idx) = self.external_ports.iter().position(|p| p.port == name) {
                        self.external_ports.remove(idx);
                    } else {
                        self.virtual_ports = self.virtual_ports.saturating_sub(1);
                    }
                    info!(port = %name, "port removed");
                }
                other => log_failure(&other),
            }
        }
    }

    fn stop(&mut self) {
        let Some(link) = self.link.take() else {
            return;
        };
        debug!("stopping network");

        link.shutdown(self.options.stop_timeout);

        self.virtual_ports = 0;
        self.external_ports.clear();
        self.serial_ports.clear();
        info!("network stopped");
    }

    fn ports(&self) -> &[String] {
        &self.serial_ports
    }

    fn is_running(&self) -> bool {
        self.link.is_some()
    }
}

impl Drop for VirtualSerialNetwork {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for VirtualSerialNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualSerialNetwork")
            .field("running", &self.link.is_some())
            .field("options", &self.options)
            .field("virtual_ports", &self.virtual_ports)
            .field("external_ports", &self.external_ports)
            .field("serial_ports", &self.serial_ports)
            .finish_non_exhaustive()
    }
}

fn log_failure(response: &Response) {
    match response {
        Response::Ok(_) => {}
        Response::Error { message, diagnostic } => {
            error!(%message, %diagnostic, "port operation failed");
        }
        Response::AlreadyExists(name) => error!(port = %name, "port already added"),
        Response::NotFound(name) => warn!(port = %name, "port not found"),
    }
}

/// Keep the first config for each port name
fn dedup_by_port(ports: &mut Vec<SerialConfig>) {
    let mut seen = Vec::with_capacity(ports.len());
    ports.retain(|p| {
        if seen.contains(&p.port) {
            false
        } else {
            seen.push(p.port.clone());
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::virtual_port::pty::PtyPair;
    use std::io;

    fn options() -> NetworkOptions {
        NetworkOptions {
            poll_timeout: Duration::from_millis(20),
            ..NetworkOptions::default()
        }
    }

    #[test]
    fn test_dedup_by_port_keeps_first() {
        let a = SerialConfig::new("/dev/ttyS0").unwrap();
        let b = SerialConfig::new("/dev/ttyS0").unwrap().baud_rate(115_200).unwrap();
        let c = SerialConfig::new("/dev/ttyS1").unwrap();

        let mut ports = vec![a.clone(), b, c.clone()];
        dedup_by_port(&mut ports);
        assert_eq!(ports, vec![a, c]);
    }

    #[test]
    fn test_mutations_before_start_are_noops() {
        let mut network = VirtualSerialNetwork::with_options(2, Vec::new(), options());
        network.create(1);
        network.remove(&["/dev/pts/0".to_string()]);
        network.add(vec![SerialConfig::new("/dev/ttyS0").unwrap()]);
        network.stop();

        assert!(!network.is_running());
        assert!(network.ports().is_empty());
        assert_eq!(network.virtual_port_count(), 0);
    }

    #[test]
    fn test_start_counts_only_confirmed_ports() {
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let every_other = move || -> io::Result<PtyPair> {
            if calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) % 2 == 0 {
                OsPty.open_pty()
            } else {
                Err(io::Error::new(io::ErrorKind::Other, "Failed to create pseudo-terminal"))
            }
        };

        let mut network =
            VirtualSerialNetwork::with_options(4, Vec::new(), options()).with_pty_factory(every_other);
        network.start().unwrap();

        assert!(network.is_running());
        assert_eq!(network.ports().len(), 2);
        assert_eq!(network.virtual_port_count(), 2);

        network.stop();
        assert!(network.ports().is_empty());
        assert_eq!(network.virtual_port_count(), 0);
    }

    #[test]
    fn test_start_twice_is_noop() {
        let mut network = VirtualSerialNetwork::with_options(1, Vec::new(), options());
        network.start().unwrap();
        let ports = network.ports().to_vec();

        network.start().unwrap();
        assert_eq!(network.ports(), ports.as_slice());
    }

    #[test]
    fn test_restart_recreates_requested_ports() {
        let mut network = VirtualSerialNetwork::with_options(2, Vec::new(), options());
        network.start().unwrap();
        network.create(1);
        assert_eq!(network.ports().len(), 3);
        network.stop();

        network.start().unwrap();
        assert_eq!(network.ports().len(), 2);
        assert_eq!(network.virtual_port_count(), 2);
    }

    #[test]
    fn test_remove_virtual_port_decrements_count() {
        let mut network = VirtualSerialNetwork::with_options(3, Vec::new(), options());
        network.start().unwrap();
        let victim = network.ports()[1].clone();

        network.remove(&[victim.clone()]);
        assert_eq!(network.virtual_port_count(), 2);
        assert!(!network.ports().contains(&victim));

        network.remove(&[victim]);
        assert_eq!(network.virtual_port_count(), 2);
        assert_eq!(network.ports().len(), 2);
    }
}
