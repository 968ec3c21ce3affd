//! Networks built from a config file

#![cfg(unix)]

mod common;

use common::{open_port, read_len, send, DELIVERY_TIMEOUT};
use serialnet_core::config::SettingsError;
use serialnet_core::{AppConfig, NetworkOptions, SerialNetwork, VirtualSerialNetwork};
use std::time::Duration;
use tempfile::tempdir;

fn options(config: &AppConfig) -> NetworkOptions {
    NetworkOptions {
        loopback: config.network.loopback,
        poll_timeout: config.network.poll_interval(),
        stop_timeout: config.network.stop_timeout(),
    }
}

#[test]
fn test_network_from_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[network]
virtual_ports = 3
loopback = true
poll_interval_ms = 20
stop_timeout_secs = 2

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = AppConfig::load_from(&path).unwrap();
    assert_eq!(config.network.poll_interval(), Duration::from_millis(20));
    assert_eq!(config.logging.level, "debug");

    let mut network = VirtualSerialNetwork::with_options(
        config.network.virtual_ports,
        config.external.clone(),
        options(&config),
    );
    network.start().unwrap();
    assert_eq!(network.ports().len(), 3);
    assert!(network.options().loopback);

    let mut port = open_port(&network.ports()[2]);
    send(&mut port, b"self");
    assert_eq!(read_len(&mut port, 4, DELIVERY_TIMEOUT), b"self");

    network.stop();
}

#[test]
fn test_saved_config_round_trips_external_ports() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let mut config = AppConfig::default();
    config.network.virtual_ports = 1;
    config.external.push(
        serialnet_core::SerialConfig::new("/dev/ttyUSB1")
            .unwrap()
            .baud_rate(57600)
            .unwrap(),
    );
    config.save_to(&path).unwrap();

    let loaded = AppConfig::load_from(&path).unwrap();
    assert_eq!(loaded.external, config.external);
    assert_eq!(loaded.external[0].baud_rate, 57600);
}

#[test]
fn test_malformed_config_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[network]\nvirtual_ports = \"two\"\n").unwrap();

    assert!(matches!(
        AppConfig::load_from(&path),
        Err(SettingsError::Parse { .. })
    ));
}
