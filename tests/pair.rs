//! End-to-end tests for the two-port pair

#![cfg(unix)]

mod common;

use common::{fast_options, open_port, read_for, read_len, send, DELIVERY_TIMEOUT, QUIET_PERIOD};
use serialnet_core::{PtyPair, SerialNetwork, VirtualSerialPair};
use std::io;

#[test]
fn test_pair_relays_both_ways() {
    let mut pair = VirtualSerialPair::with_options(fast_options(false));
    pair.start().unwrap();

    let (left, right) = pair.endpoints().unwrap();
    let mut left = open_port(left);
    let mut right = open_port(right);

    send(&mut left, b"PING");
    assert_eq!(read_len(&mut right, 4, DELIVERY_TIMEOUT), b"PING");
    send(&mut right, b"PONG");
    assert_eq!(read_len(&mut left, 4, DELIVERY_TIMEOUT), b"PONG");

    // no loopback on a pair
    assert!(read_for(&mut left, QUIET_PERIOD).is_empty());

    pair.stop();
    assert!(pair.endpoints().is_none());
}

#[test]
fn test_pair_membership_is_fixed() {
    let mut pair = VirtualSerialPair::with_options(fast_options(false));
    pair.start().unwrap();
    let before = pair.ports().to_vec();

    pair.create(3);
    pair.remove(&before[..1]);
    assert_eq!(pair.ports(), before.as_slice());

    pair.stop();
}

#[test]
fn test_pair_without_ptys_comes_up_empty() {
    let mut pair = VirtualSerialPair::with_options(fast_options(false))
        .with_pty_factory(|| -> io::Result<PtyPair> {
            Err(io::Error::from_raw_os_error(libc::EAGAIN))
        });

    // only a worker launch failure is fatal; the pair tears itself down
    pair.start().unwrap();
    assert!(!pair.is_running());
    assert!(pair.ports().is_empty());
    assert!(pair.endpoints().is_none());
}
