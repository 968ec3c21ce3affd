//! Core module containing the network engine
//!
//! This module provides:
//! - Serial line configuration and validation
//! - Error types shared by the controller and its worker
//! - The virtual serial port network (Unix only)

pub mod error;
pub mod serial;
#[cfg(unix)]
pub mod virtual_port;
