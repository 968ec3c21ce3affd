//! CLI Module
//!
//! Provides command-line interface functionality including:
//! - Exit codes for automation
//! - Interactive console commands
//! - Port list output

pub mod console;
pub mod exit_codes;
pub mod output;

pub use console::{ConsoleCommand, ConsoleError};
pub use exit_codes::{ensure_ports, exit_code_description, CliResult, ExitCodes};
pub use output::{format_ports, OutputFormat};
