//! Port list output

use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON for scripting
    Json,
}

#[derive(Serialize)]
struct PortList<'a> {
    ports: &'a [String],
    loopback: bool,
}

/// Render the port list
pub fn format_ports(ports: &[String], loopback: bool, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string(&PortList { ports, loopback }).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Text => {
            if ports.is_empty() {
                return "No ports in the network.".to_string();
            }
            let mut out = format!("Ports ({}):", ports.len());
            for port in ports {
                out.push_str("\n  ");
                out.push_str(port);
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text() {
        let ports = vec!["/dev/pts/3".to_string(), "/dev/pts/4".to_string()];
        assert_eq!(
            format_ports(&ports, false, OutputFormat::Text),
            "Ports (2):\n  /dev/pts/3\n  /dev/pts/4"
        );
        assert_eq!(
            format_ports(&[], false, OutputFormat::Text),
            "No ports in the network."
        );
    }

    #[test]
    fn test_json() {
        let ports = vec!["/dev/pts/3".to_string()];
        let json: serde_json::Value =
            serde_json::from_str(&format_ports(&ports, true, OutputFormat::Json)).unwrap();
        assert_eq!(json["ports"][0], "/dev/pts/3");
        assert_eq!(json["loopback"], true);
    }
}
