//! Network worker
//!
//! The worker runs on its own thread and is the only place descriptors live.
//! Each iteration it takes at most one pending [`Command`], processes it
//! completely, then waits on `poll(2)` for a bounded time and relays
//! whatever the ready ports produced to every other port.

use super::protocol::{Command, Response, WorkerInit};
use super::pty::{set_nonblocking, PtyFactory};
use super::registry::{PortHandle, PortRegistry};
use crate::core::error::PortError;
use crate::core::serial::SerialConfig;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, trace, warn};

/// Pty factory shared between the controller and its worker
pub type SharedPtyFactory = Arc<dyn PtyFactory + Send + Sync>;

const READ_CHUNK: usize = 4096;

/// Upper bound on bytes taken from one port per readiness event
const MAX_READ: usize = 64 * 1024;

const READY_EVENTS: libc::c_short = libc::POLLIN | libc::POLLHUP | libc::POLLERR;

const HANGUP_EVENTS: libc::c_short = libc::POLLHUP | libc::POLLERR;

/// How long a hung-up port is left out of the readiness wait
const HANGUP_BACKOFF: Duration = Duration::from_millis(200);

/// Worker state: registry plus its end of the channels
pub struct Worker {
    registry: PortRegistry,
    commands: Receiver<Command>,
    responses: Sender<Response>,
    pty: SharedPtyFactory,
    loopback: bool,
    poll_timeout: Duration,
    /// Hung-up ports skipped by `poll` until the given instant
    backoff: HashMap<RawFd, Instant>,
}

impl Worker {
    /// Create a worker with an empty registry
    pub fn new(
        commands: Receiver<Command>,
        responses: Sender<Response>,
        pty: SharedPtyFactory,
        loopback: bool,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            registry: PortRegistry::new(),
            commands,
            responses,
            pty,
            loopback,
            poll_timeout,
            backoff: HashMap::new(),
        }
    }

    /// Build the initial ports, then serve commands and relay data until
    /// `Stop` arrives or the controller disappears.
    ///
    /// All descriptors are closed when this returns.
    pub fn run(mut self, init: WorkerInit) {
        debug!(
            virtual_ports = init.virtual_ports,
            external_ports = init.external_ports.len(),
            loopback = self.loopback,
            "worker starting"
        );

        self.create_virtual_ports(init.virtual_ports);
        self.add_external_ports(init.external_ports);

        loop {
            match self.commands.try_recv() {
                Ok(Command::Stop) => break,
                Ok(command) => self.process(command),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    warn!("controller disconnected, stopping worker");
                    break;
                }
            }
            self.forward();
        }

        if self.registry.is_empty() {
            debug!("worker stopped");
        } else {
            debug!(ports = self.registry.len(), "worker stopped, closing ports");
        }
    }

    fn process(&mut self, command: Command) {
        trace!(?command, "processing command");
        match command {
            Command::Create(count) => self.create_virtual_ports(count),
            Command::AddExternal(ports) => self.add_external_ports(ports),
            Command::Remove(names) => self.remove_ports(names),
            Command::Stop => {}
        }
    }

    fn reply(&self, response: Response) {
        if self.responses.send(response).is_err() {
            trace!("controller no longer listening for responses");
        }
    }

    fn create_virtual_ports(&mut self, count: usize) {
        for _ in 0..count {
            let response = match self.create_virtual_port() {
                Ok(name) => Response::Ok(name),
                Err(err) => Response::from(err),
            };
            self.reply(response);
        }
    }

    fn create_virtual_port(&mut self) -> Result<String, PortError> {
        let pair = self
            .pty
            .open_pty()
            .map_err(PortError::ResourceExhaustion)?;

        // Injected factories may hand back a blocking master
        set_nonblocking(pair.master.as_fd()).map_err(|source| PortError::Configure {
            port: pair.slave_name.clone(),
            source,
        })?;

        let name = pair.slave_name.clone();
        self.registry
            .insert(PortHandle::virtual_port(pair.slave_name, pair.master, pair.slave))
            .map_err(|rejected| PortError::Configure {
                port: rejected.name().to_string(),
                source: io::Error::new(io::ErrorKind::AlreadyExists, "pty name already registered"),
            })?;

        debug!(port = %name, "virtual port created");
        Ok(name)
    }

    fn add_external_ports(&mut self, ports: Vec<SerialConfig>) {
        for config in ports {
            let response = match self.add_external_port(&config) {
                Ok(name) => Response::Ok(name),
                Err(err) => Response::from(err),
            };
            self.reply(response);
        }
    }

    fn add_external_port(&mut self, config: &SerialConfig) -> Result<String, PortError> {
        if self.registry.contains(&config.port) {
            return Err(PortError::DuplicateName(config.port.clone()));
        }

        let port = config.open().map_err(|source| PortError::DeviceOpen {
            port: config.port.clone(),
            source,
        })?;
        // SAFETY: into_raw_fd gives up ownership of the open descriptor
        // without closing it, so nothing else owns it.
        let device = unsafe { OwnedFd::from_raw_fd(port.into_raw_fd()) };

        set_nonblocking(device.as_fd()).map_err(|source| PortError::Configure {
            port: config.port.clone(),
            source,
        })?;

        self.registry
            .insert(PortHandle::external(config.port.clone(), device))
            .map_err(|rejected| PortError::DuplicateName(rejected.name().to_string()))?;

        debug!(port = %config, "external port attached");
        Ok(config.port.clone())
    }

    fn remove_ports(&mut self, names: Vec<String>) {
        for name in names {
            let response = match self.registry.remove(&name) {
                Some(handle) => {
                    self.backoff.remove(&handle.fd());
                    let kind = if handle.is_virtual() { "virtual" } else { "external" };
                    drop(handle);
                    debug!(port = %name, kind, "port removed");
                    Response::Ok(name)
                }
                None => Response::from(PortError::NotFound(name)),
            };
            self.reply(response);
        }
    }

    /// One readiness wait plus relay of everything that became readable
    fn forward(&mut self) {
        let now = Instant::now();
        self.backoff.retain(|_, until| *until > now);

        let mut pollfds: Vec<libc::pollfd> = self
            .registry
            .fds()
            .filter(|fd| !self.backoff.contains_key(fd))
            .map(|fd| libc::pollfd {
                fd,
                events: libc::POLLIN,
                revents: 0,
            })
            .collect();

        // Sub-millisecond timeouts round up so an idle loop never spins
        let timeout = libc::c_int::try_from(self.poll_timeout.as_millis().max(1))
            .unwrap_or(libc::c_int::MAX);
        // SAFETY: pollfds is a live, exclusively borrowed buffer of
        // pollfds.len() entries for the duration of the call.
        let ready = unsafe {
            libc::poll(
                pollfds.as_mut_ptr(),
                pollfds.len() as libc::nfds_t,
                timeout,
            )
        };

        if ready < 0 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                error!(error = %err, "poll failed");
                thread::sleep(self.poll_timeout);
            }
            return;
        }

        for pollfd in pollfds.iter().filter(|p| p.revents & READY_EVENTS != 0) {
            match self.read_available(pollfd.fd) {
                Ok(data) if !data.is_empty() => self.broadcast(pollfd.fd, &data),
                result => {
                    if let Err(err) = result {
                        trace!(fd = pollfd.fd, error = %err, "read failed");
                    }
                    if pollfd.revents & HANGUP_EVENTS != 0 {
                        self.back_off(pollfd.fd);
                    }
                }
            }
        }
    }

    /// Keep a port that reports only hang-up out of the next few waits.
    ///
    /// The port stays registered and is retried once the back-off expires.
    fn back_off(&mut self, fd: RawFd) {
        let until = Instant::now() + HANGUP_BACKOFF;
        if self.backoff.insert(fd, until).is_none() {
            debug!(
                port = self.registry.get(fd).map(PortHandle::name),
                "port hung up, backing off"
            );
        }
    }

    fn read_available(&self, fd: RawFd) -> io::Result<Vec<u8>> {
        let Some(handle) = self.registry.get(fd) else {
            return Ok(Vec::new());
        };

        let mut file = handle.file();
        let mut data = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];

        while data.len() < MAX_READ {
            match file.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => data.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if data.is_empty() => return Err(e),
                Err(_) => break,
            }
        }

        Ok(data)
    }

    /// Write `data` to every other port, or to all ports under loopback.
    ///
    /// A failing target never stops delivery to the rest.
    fn broadcast(&self, source: RawFd, data: &[u8]) {
        trace!(
            from = self.registry.get(source).map(PortHandle::name),
            bytes = data.len(),
            "relaying"
        );

        for handle in self.registry.handles() {
            if !self.loopback && handle.fd() == source {
                continue;
            }
            let mut file = handle.file();
            if let Err(write_err) = file.write_all(data) {
                let err = PortError::TransientWriteFailure {
                    port: handle.name().to_string(),
                    source: write_err,
                };
                trace!(error = %err, "broadcast write dropped");
            }
        }
    }
}

/// Controller's end of a running worker
pub struct WorkerLink {
    commands: Sender<Command>,
    responses: Receiver<Response>,
    exited: Receiver<()>,
    thread: thread::JoinHandle<()>,
}

impl WorkerLink {
    /// Send a command and collect the responses it produces.
    ///
    /// Blocks until every response has arrived. Stops early only if the
    /// worker is gone, in which case fewer responses are returned.
    pub fn request(&self, command: Command) -> Vec<Response> {
        let expected = command.expected_responses();
        if self.commands.send(command).is_err() {
            error!("network worker is gone, command dropped");
            return Vec::new();
        }
        self.collect(expected)
    }

    /// Wait for `count` responses
    pub fn collect(&self, count: usize) -> Vec<Response> {
        let mut responses = Vec::with_capacity(count);
        for _ in 0..count {
            match self.responses.recv() {
                Ok(response) => responses.push(response),
                Err(_) => {
                    error!(
                        received = responses.len(),
                        expected = count,
                        "network worker exited before answering"
                    );
                    break;
                }
            }
        }
        responses
    }

    /// Ask the worker to stop and wait up to `timeout` for it to exit.
    ///
    /// Returns false if the worker was still running when the wait ran out;
    /// its thread is then left detached.
    pub fn shutdown(self, timeout: Duration) -> bool {
        if self.commands.send(Command::Stop).is_err() {
            debug!("network worker already gone");
        }

        match self.exited.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if self.thread.join().is_err() {
                    error!("network worker panicked");
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(?timeout, "network worker did not exit in time");
                false
            }
        }
    }
}

/// Launch a worker thread.
///
/// Fails only if the thread itself cannot be spawned.
pub fn spawn(
    init: WorkerInit,
    pty: SharedPtyFactory,
    loopback: bool,
    poll_timeout: Duration,
) -> io::Result<WorkerLink> {
    let (command_tx, command_rx) = crossbeam_channel::unbounded();
    let (response_tx, response_rx) = crossbeam_channel::unbounded();
    let (exited_tx, exited_rx) = crossbeam_channel::bounded::<()>(0);

    let thread = thread::Builder::new()
        .name("serialnet-worker".to_string())
        .spawn(move || {
            // Dropped after `run` has closed every descriptor
            let _exited = exited_tx;
            Worker::new(command_rx, response_tx, pty, loopback, poll_timeout).run(init);
        })?;

    Ok(WorkerLink {
        commands: command_tx,
        responses: response_rx,
        exited: exited_rx,
        thread,
    })
}
