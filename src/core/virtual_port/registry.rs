//! Port registry: fd ↔ name map owned by the worker

use std::collections::HashMap;
use std::fs::File;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

/// What backs a registered port
#[derive(Debug)]
pub enum PortKind {
    /// Pty master; the slave fd stays open as long as the handle lives
    Virtual {
        /// Held only to keep the pair alive
        _slave: OwnedFd,
    },
    /// Real serial device
    External,
}

/// One registered port.
///
/// Dropping the handle closes every descriptor it owns.
#[derive(Debug)]
pub struct PortHandle {
    name: String,
    file: File,
    kind: PortKind,
}

impl PortHandle {
    /// Virtual port from a pty master and its slave
    pub fn virtual_port(name: String, master: OwnedFd, slave: OwnedFd) -> Self {
        Self {
            name,
            file: File::from(master),
            kind: PortKind::Virtual { _slave: slave },
        }
    }

    /// External port from an opened device
    pub fn external(name: String, device: OwnedFd) -> Self {
        Self {
            name,
            file: File::from(device),
            kind: PortKind::External,
        }
    }

    /// External name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File used for reading and writing
    pub fn file(&self) -> &File {
        &self.file
    }

    /// Is this a pty-backed port
    pub fn is_virtual(&self) -> bool {
        matches!(self.kind, PortKind::Virtual { .. })
    }

    /// Raw descriptor the readiness loop waits on
    pub fn fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

/// Bidirectional mapping between descriptors and port names
#[derive(Debug, Default)]
pub struct PortRegistry {
    handles: HashMap<RawFd, PortHandle>,
    names: HashMap<String, RawFd>,
}

impl PortRegistry {
    /// Create empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle.
    ///
    /// Gives the handle back if its name is already taken.
    pub fn insert(&mut self, handle: PortHandle) -> Result<(), PortHandle> {
        if self.names.contains_key(handle.name()) {
            return Err(handle);
        }
        let fd = handle.fd();
        self.names.insert(handle.name().to_string(), fd);
        self.handles.insert(fd, handle);
        Ok(())
    }

    /// Unregister by name, handing back ownership of the handle
    pub fn remove(&mut self, name: &str) -> Option<PortHandle> {
        let fd = self.names.remove(name)?;
        self.handles.remove(&fd)
    }

    /// Is the name registered
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Look up by descriptor
    pub fn get(&self, fd: RawFd) -> Option<&PortHandle> {
        self.handles.get(&fd)
    }

    /// All registered descriptors
    pub fn fds(&self) -> impl Iterator<Item = RawFd> + '_ {
        self.handles.keys().copied()
    }

    /// All handles
    pub fn handles(&self) -> impl Iterator<Item = &PortHandle> {
        self.handles.values()
    }

    /// Number of registered ports
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Is the registry empty
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
