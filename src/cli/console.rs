//! Interactive console commands
//!
//! One command per stdin line while the network runs.

use crate::core::serial::{ConfigError, SerialConfig};
use thiserror::Error;

/// Console help text
pub const HELP: &str = "\
Commands:
  list                 Show ports in the network
  create N             Add N virtual ports
  add NAME [BAUD]      Attach a serial device
  remove NAME...       Detach ports
  help                 Show this help
  quit                 Stop the network and exit";

/// Console parse errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConsoleError {
    /// First word is not a command
    #[error("Unknown command: {0} (try 'help')")]
    Unknown(String),

    /// A required argument is missing
    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    /// A numeric argument did not parse
    #[error("Not a number: {0}")]
    InvalidNumber(String),

    /// Device settings out of range
    #[error(transparent)]
    Port(#[from] ConfigError),
}

/// A parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Print the port list
    List,
    /// Add virtual ports
    Create(usize),
    /// Attach a device
    Add(SerialConfig),
    /// Detach ports
    Remove(Vec<String>),
    /// Print help
    Help,
    /// Leave the console
    Quit,
}

impl ConsoleCommand {
    /// Parse one line; blank lines yield `None`
    pub fn parse(line: &str) -> Result<Option<Self>, ConsoleError> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(None);
        };

        let parsed = match command.to_lowercase().as_str() {
            "list" | "ls" => Self::List,
            "create" | "new" => {
                let count = words.next().ok_or(ConsoleError::MissingArgument("N"))?;
                Self::Create(parse_number(count)?)
            }
            "add" => {
                let name = words.next().ok_or(ConsoleError::MissingArgument("NAME"))?;
                let mut config = SerialConfig::new(name)?;
                if let Some(baud) = words.next() {
                    config = config.baud_rate(parse_number(baud)?)?;
                }
                Self::Add(config)
            }
            "remove" | "rm" => {
                let names: Vec<String> = words.map(str::to_string).collect();
                if names.is_empty() {
                    return Err(ConsoleError::MissingArgument("NAME"));
                }
                Self::Remove(names)
            }
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(ConsoleError::Unknown(other.to_string())),
        };
        Ok(Some(parsed))
    }
}

fn parse_number<T: std::str::FromStr>(word: &str) -> Result<T, ConsoleError> {
    word.parse()
        .map_err(|_| ConsoleError::InvalidNumber(word.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_line() {
        assert_eq!(ConsoleCommand::parse("   "), Ok(None));
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(ConsoleCommand::parse("list"), Ok(Some(ConsoleCommand::List)));
        assert_eq!(ConsoleCommand::parse("QUIT"), Ok(Some(ConsoleCommand::Quit)));
        assert_eq!(ConsoleCommand::parse("?"), Ok(Some(ConsoleCommand::Help)));
        assert_eq!(
            ConsoleCommand::parse("create 3"),
            Ok(Some(ConsoleCommand::Create(3)))
        );
    }

    #[test]
    fn test_add() {
        let expected = SerialConfig::new("/dev/ttyUSB0")
            .unwrap()
            .baud_rate(19200)
            .unwrap();
        assert_eq!(
            ConsoleCommand::parse("add /dev/ttyUSB0 19200"),
            Ok(Some(ConsoleCommand::Add(expected)))
        );
        assert_eq!(
            ConsoleCommand::parse("add /dev/ttyUSB0 1234"),
            Err(ConsoleError::Port(ConfigError::InvalidBaudRate(1234)))
        );
    }

    #[test]
    fn test_remove() {
        assert_eq!(
            ConsoleCommand::parse("rm /dev/pts/3 /dev/pts/4"),
            Ok(Some(ConsoleCommand::Remove(vec![
                "/dev/pts/3".to_string(),
                "/dev/pts/4".to_string()
            ])))
        );
        assert_eq!(
            ConsoleCommand::parse("remove"),
            Err(ConsoleError::MissingArgument("NAME"))
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            ConsoleCommand::parse("create many"),
            Err(ConsoleError::InvalidNumber("many".to_string()))
        );
        assert_eq!(
            ConsoleCommand::parse("create"),
            Err(ConsoleError::MissingArgument("N"))
        );
        assert_eq!(
            ConsoleCommand::parse("frobnicate"),
            Err(ConsoleError::Unknown("frobnicate".to_string()))
        );
    }
}
