//! Configuration Loading Tests

use omics_uploadr::config::{Config, ConfigError};
use serial_test::serial;
use std::io::Write;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_load_full_config_with_env_expansion() {
    std::env::set_var("OMICS_CSRF", "token-from-env");
    let file = write_config(
        r#"
api:
  base_url: "https://omics.example.org"
  csrf_token: "${OMICS_CSRF}"
  timeout_seconds: 60
  headers:
    X-Client: omics-uploadr
upload:
  chunk_url: "/api/files/chunked-upload/"
  complete_url: "/api/files/chunked-upload-complete/"
  chunk_size: 1048576
  max_stalled_chunks: 3
metrics:
  enabled: false
"#,
    );

    let config = Config::load(file.path()).unwrap();
    std::env::remove_var("OMICS_CSRF");

    assert_eq!(config.api.csrf_token.as_deref(), Some("token-from-env"));
    assert_eq!(config.api.timeout_seconds, 60);
    assert_eq!(config.api.headers["X-Client"], "omics-uploadr");
    assert_eq!(config.upload.chunk_size, 1048576);
    assert_eq!(config.upload.max_stalled_chunks, 3);
    assert_eq!(config.upload.chunk_url, "/api/files/chunked-upload/");
    assert!(!config.metrics.enabled);
}

#[test]
#[serial]
fn test_minimal_config_uses_defaults() {
    let file = write_config("api:\n  base_url: \"http://localhost:8000\"\n");

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.upload.chunk_size, 100 * 1024 * 1024);
    assert_eq!(config.api.timeout_seconds, 300);
    assert!(config.metrics.enabled);
}

#[test]
#[serial]
fn test_invalid_yaml_is_parse_error() {
    let file = write_config("api: [unterminated");
    assert!(matches!(
        Config::load(file.path()),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
#[serial]
fn test_missing_file_is_io_error() {
    assert!(matches!(
        Config::load("/nonexistent/omics.yaml"),
        Err(ConfigError::IoError(_))
    ));
}

#[test]
#[serial]
fn test_zero_timeout_rejected() {
    let file = write_config("api:\n  base_url: \"http://localhost\"\n  timeout_seconds: 0\n");
    assert!(matches!(
        Config::load(file.path()),
        Err(ConfigError::ValidationError(_))
    ));
}
