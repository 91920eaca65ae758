//! Unit tests for `AppError` display format.

use tr64c_session::AppError;

#[test]
fn remote_error_display_keeps_the_sentinel_line() {
    let err = AppError::Remote("Error: Requested action is invalid.".into());
    assert_eq!(err.to_string(), "remote: Error: Requested action is invalid.");
}

#[test]
fn decode_error_display_includes_payload() {
    let err = AppError::Decode {
        message: "EOF while parsing an object".into(),
        raw: "{\"a\":".into(),
    };
    let s = err.to_string();
    assert!(s.starts_with("decode:"));
    assert!(s.contains("{\"a\":"));
}

#[test]
fn kinds_are_distinguishable_by_prefix() {
    let cases = [
        (AppError::Config("x".into()), "config:"),
        (AppError::Spawn("x".into()), "spawn:"),
        (AppError::Io("x".into()), "io:"),
        (AppError::Protocol("x".into()), "protocol:"),
        (AppError::Parse("x".into()), "parse:"),
        (AppError::Timeout("x".into()), "timeout:"),
        (AppError::InvalidRequest("x".into()), "invalid request:"),
    ];
    for (err, prefix) in cases {
        assert!(err.to_string().starts_with(prefix), "{err} lacks {prefix}");
    }
    assert_eq!(AppError::SessionClosed.to_string(), "session closed");
    assert_eq!(AppError::Cancelled.to_string(), "cancelled");
}

#[test]
fn toml_errors_convert_to_config_errors() {
    let toml_err = toml::from_str::<toml::Value>("= broken").expect_err("invalid toml");
    let err: AppError = toml_err.into();
    assert!(matches!(err, AppError::Config(_)));
}
