//! Pseudo-terminal allocation
//!
//! The worker never calls `openpty` directly; it goes through a
//! [`PtyFactory`] so callers can swap in their own allocator (tests use this
//! to simulate pty exhaustion).

use nix::sys::termios::{self, SetArg};
use std::ffi::CStr;
use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd};

/// A freshly allocated pty pair
#[derive(Debug)]
pub struct PtyPair {
    /// Master side, read and written by the worker
    pub master: OwnedFd,
    /// Slave side, kept open so the master never sees a hang-up
    pub slave: OwnedFd,
    /// Device path clients open (e.g. `/dev/pts/3`)
    pub slave_name: String,
}

/// Strategy for allocating pty pairs
pub trait PtyFactory {
    /// Allocate one pty pair
    fn open_pty(&self) -> io::Result<PtyPair>;
}

impl<F> PtyFactory for F
where
    F: Fn() -> io::Result<PtyPair>,
{
    fn open_pty(&self) -> io::Result<PtyPair> {
        self()
    }
}

/// Default factory backed by `openpty(3)`
#[derive(Debug, Clone, Copy, Default)]
pub struct OsPty;

impl PtyFactory for OsPty {
    fn open_pty(&self) -> io::Result<PtyPair> {
        let mut master_fd: libc::c_int = 0;
        let mut slave_fd: libc::c_int = 0;
        let mut name_buf = [0 as libc::c_char; 256];

        // SAFETY: all out-pointers are valid for the duration of the call and
        // name_buf is larger than any pts path.
        let result = unsafe {
            libc::openpty(
                &mut master_fd,
                &mut slave_fd,
                name_buf.as_mut_ptr(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            )
        };
        if result != 0 {
            return Err(io::Error::last_os_error());
        }

        // SAFETY: openpty succeeded, so both descriptors are open and owned
        // by nobody else.
        let (master, slave) =
            unsafe { (OwnedFd::from_raw_fd(master_fd), OwnedFd::from_raw_fd(slave_fd)) };

        // SAFETY: openpty NUL-terminates the name on success.
        let slave_name = unsafe { CStr::from_ptr(name_buf.as_ptr()) }
            .to_string_lossy()
            .into_owned();

        make_raw(&slave)?;
        set_nonblocking(master.as_fd())?;

        Ok(PtyPair {
            master,
            slave,
            slave_name,
        })
    }
}

/// Put a terminal into raw mode (no echo, no line discipline)
pub fn make_raw(fd: &OwnedFd) -> io::Result<()> {
    let mut attrs = termios::tcgetattr(fd).map_err(io::Error::from)?;
    termios::cfmakeraw(&mut attrs);
    termios::tcsetattr(fd, SetArg::TCSANOW, &attrs).map_err(io::Error::from)
}

/// Set `O_NONBLOCK` on a descriptor
pub fn set_nonblocking(fd: BorrowedFd<'_>) -> io::Result<()> {
    let raw = fd.as_raw_fd();
    // SAFETY: fcntl on a borrowed, open descriptor.
    let flags = unsafe { libc::fcntl(raw, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: as above.
    if unsafe { libc::fcntl(raw, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::{Read, Write};

    #[test]
    fn test_os_pty_names_slave() {
        let pair = OsPty.open_pty().unwrap();
        assert!(pair.slave_name.starts_with("/dev/"));
    }

    #[test]
    fn test_os_pty_is_raw_and_connected() {
        let pair = OsPty.open_pty().unwrap();
        let mut slave = File::from(pair.slave);
        let mut master = File::from(pair.master);

        slave.write_all(b"\r\nraw").unwrap();

        let mut buf = [0u8; 16];
        let mut got = Vec::new();
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
        while got.len() < 5 && std::time::Instant::now() < deadline {
            match master.read(&mut buf) {
                Ok(n) => got.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    std::thread::sleep(std::time::Duration::from_millis(5));
                }
                Err(e) => panic!("read failed: {e}"),
            }
        }
        // Raw mode: no CR/LF translation
        assert_eq!(got, b"\r\nraw");
    }

    #[test]
    fn test_closure_factory() {
        let failing = || -> io::Result<PtyPair> {
            Err(io::Error::new(io::ErrorKind::Other, "Failed to create pseudo-terminal"))
        };
        let err = failing.open_pty().unwrap_err();
        assert_eq!(err.to_string(), "Failed to create pseudo-terminal");
    }
}
