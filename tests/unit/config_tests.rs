use std::time::Duration;

use tr64c_session::config::{ClientConfig, DEFAULT_CLOSE_GRACE, PASSWORD_ENV};
use tr64c_session::AppError;

fn sample_toml() -> &'static str {
    r#"
executable = "/usr/local/bin/tr64c"
timeout_ms = 2500
verbose = 1
cache = "/var/cache/tr64c/fritz.cache"
user = "admin"
read_timeout_seconds = 30
"#
}

#[test]
fn parses_valid_config() {
    let config = ClientConfig::from_toml_str(sample_toml()).expect("config parses");

    assert_eq!(config.executable.to_str(), Some("/usr/local/bin/tr64c"));
    assert_eq!(config.timeout_ms, 2500);
    assert_eq!(config.verbose, 1);
    assert_eq!(config.user.as_deref(), Some("admin"));
    assert_eq!(config.read_timeout(), Some(Duration::from_secs(30)));
    assert!(config.password.is_none(), "password is never read from TOML");
}

#[test]
fn minimal_config_uses_defaults() {
    let config = ClientConfig::from_toml_str("executable = \"tr64c\"").expect("config parses");

    assert_eq!(config.timeout_ms, 1000);
    assert_eq!(config.verbose, 0);
    assert!(config.cache.is_none());
    assert!(config.user.is_none());
    assert!(config.read_timeout().is_none());
}

#[test]
fn password_in_toml_is_ignored() {
    let config = ClientConfig::from_toml_str("executable = \"tr64c\"\npassword = \"leak\"");
    // Unknown keys are accepted, but never populate the runtime password.
    let config = config.expect("config parses");
    assert!(config.password.is_none());
}

#[test]
fn rejects_zero_timeout() {
    let err = ClientConfig::from_toml_str("executable = \"tr64c\"\ntimeout_ms = 0")
        .expect_err("zero timeout is invalid");
    assert!(matches!(err, AppError::Config(ref msg) if msg.contains("timeout_ms")));
}

#[test]
fn rejects_empty_executable() {
    let err = ClientConfig::from_toml_str("executable = \"\"").expect_err("empty executable");
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn rejects_missing_executable() {
    let err = ClientConfig::from_toml_str("timeout_ms = 100").expect_err("executable required");
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn loads_from_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("tr64c-session.toml");
    std::fs::write(&path, sample_toml()).expect("write config");

    let config = ClientConfig::load_from_path(&path).expect("config loads");
    assert_eq!(config.timeout_ms, 2500);
}

#[test]
fn missing_file_is_a_config_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let err = ClientConfig::load_from_path(temp.path().join("absent.toml"))
        .expect_err("missing file");
    assert!(matches!(err, AppError::Config(ref msg) if msg.starts_with("failed to read config")));
}

#[test]
fn session_settings_inherit_client_settings() {
    let mut config = ClientConfig::from_toml_str(sample_toml()).expect("config parses");
    config.password = Some("s3cret".into());

    let session = config.session("http://192.168.178.1:49000/tr64desc.xml");

    assert_eq!(session.host, "http://192.168.178.1:49000/tr64desc.xml");
    assert_eq!(session.timeout_ms, 2500);
    assert_eq!(session.user.as_deref(), Some("admin"));
    assert_eq!(session.password.as_deref(), Some("s3cret"));
    assert_eq!(session.read_timeout, Some(Duration::from_secs(30)));
    assert_eq!(session.close_grace, DEFAULT_CLOSE_GRACE);
    assert!(!format!("{config:?}").contains("s3cret"));
}

#[tokio::test]
#[serial_test::serial]
async fn password_falls_back_to_env_var() {
    std::env::set_var(PASSWORD_ENV, "from-env");

    let mut config = ClientConfig::from_toml_str(sample_toml()).expect("config parses");
    config
        .load_credentials()
        .await
        .expect("credential loading succeeds");

    std::env::remove_var(PASSWORD_ENV);
    assert_eq!(config.password.as_deref(), Some("from-env"));
}

#[tokio::test]
#[serial_test::serial]
async fn missing_password_is_not_an_error() {
    std::env::remove_var(PASSWORD_ENV);

    let mut config = ClientConfig::from_toml_str(sample_toml()).expect("config parses");
    config
        .load_credentials()
        .await
        .expect("credential loading succeeds");

    assert!(config.password.is_none());
}

#[tokio::test]
#[serial_test::serial]
async fn empty_env_password_counts_as_missing() {
    std::env::set_var(PASSWORD_ENV, "");

    let mut config = ClientConfig::from_toml_str(sample_toml()).expect("config parses");
    config
        .load_credentials()
        .await
        .expect("credential loading succeeds");

    std::env::remove_var(PASSWORD_ENV);
    assert!(config.password.is_none());
}
