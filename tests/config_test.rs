//! Tests for server configuration loading.

use std::io::Write;
use std::time::Duration;
use strictly_sessions::{ServerConfig, SessionOptions};
use tempfile::NamedTempFile;

#[test]
fn test_defaults() {
    let config = ServerConfig::default();
    assert_eq!(config.host(), "127.0.0.1");
    assert_eq!(*config.port(), 8080);
    assert!(!*config.production());
    assert_eq!(config.session_options(), SessionOptions::new(16, 16));
    assert_eq!(config.ws_token_ttl(), Duration::from_secs(10));
}

#[test]
fn test_partial_file_keeps_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "port = 9000").unwrap();
    writeln!(file, "production = true").unwrap();
    writeln!(file, "action_queue_capacity = 4").unwrap();

    let config = ServerConfig::from_file(file.path()).unwrap();
    assert_eq!(*config.port(), 9000);
    assert!(*config.production());
    assert_eq!(*config.action_queue_capacity(), 4);
    assert_eq!(*config.outbound_capacity(), 16);
    assert_eq!(config.bind_address(), "127.0.0.1:9000");
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, ServerConfig::default());
}

#[test]
fn test_from_file_requires_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = ServerConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(err.message.starts_with("Failed to read config file"));
}

#[test]
fn test_invalid_values_are_rejected() {
    let err = ServerConfig::from_toml("outbound_capacity = 0").unwrap_err();
    assert!(err.message.contains("outbound_capacity"));

    let err = ServerConfig::from_toml("port = \"eighty\"").unwrap_err();
    assert!(err.message.starts_with("Failed to parse config"));
}

#[test]
fn test_overrides() {
    let config = ServerConfig::default()
        .with_host("0.0.0.0")
        .with_port(3000)
        .with_static_dir("frontend/dist");
    assert_eq!(config.bind_address(), "0.0.0.0:3000");
    assert_eq!(
        config.static_dir().as_deref(),
        Some(std::path::Path::new("frontend/dist"))
    );
}
