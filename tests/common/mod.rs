//! Shared helpers for the integration tests

#![allow(dead_code)]

use serialnet_core::NetworkOptions;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::thread;
use std::time::{Duration, Instant};

/// How long a positive check waits for bytes to show up
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(3);

/// How long a negative check listens before concluding nothing arrived
pub const QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Options with a short poll so tests do not idle
pub fn fast_options(loopback: bool) -> NetworkOptions {
    NetworkOptions {
        loopback,
        poll_timeout: Duration::from_millis(20),
        stop_timeout: Duration::from_secs(2),
    }
}

/// Open a port the way serial client software would
pub fn open_port(path: &str) -> File {
    OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
        .open(path)
        .unwrap_or_else(|e| panic!("failed to open {path}: {e}"))
}

pub fn send(port: &mut File, data: &[u8]) {
    port.write_all(data).unwrap();
    port.flush().unwrap();
}

/// Read until `len` bytes arrived or `timeout` elapsed
pub fn read_len(port: &mut File, len: usize, timeout: Duration) -> Vec<u8> {
    let deadline = Instant::now() + timeout;
    let mut out = Vec::new();
    while out.len() < len && Instant::now() < deadline {
        read_some(port, &mut out);
    }
    out
}

/// Collect everything that arrives within `duration`
pub fn read_for(port: &mut File, duration: Duration) -> Vec<u8> {
    let deadline = Instant::now() + duration;
    let mut out = Vec::new();
    while Instant::now() < deadline {
        read_some(port, &mut out);
    }
    out
}

fn read_some(port: &mut File, out: &mut Vec<u8>) {
    let mut buf = [0u8; 256];
    match port.read(&mut buf) {
        Ok(0) => thread::sleep(Duration::from_millis(5)),
        Ok(n) => out.extend_from_slice(&buf[..n]),
        Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::Interrupted => {
            thread::sleep(Duration::from_millis(5));
        }
        Err(e) => panic!("read failed: {e}"),
    }
}
