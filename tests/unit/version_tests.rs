//! Unit tests for `tr64c --version` parsing.

use chrono::NaiveDate;

use tr64c_session::protocol::version::parse_version_line;
use tr64c_session::AppError;

#[test]
fn version_line_with_build_token_parses() {
    let info = parse_version_line("1.2.3 abcdef 2018-08-17 some backend notes")
        .expect("version line parses");

    assert_eq!(info.version, "1.2.3");
    assert_eq!((info.major, info.minor, info.patch), (1, 2, 3));
    assert_eq!(
        info.date,
        NaiveDate::from_ymd_opt(2018, 8, 17).expect("valid date")
    );
    assert_eq!(info.backend, "some backend notes");
}

#[test]
fn release_version_line_parses() {
    let info = parse_version_line("1.1.0 2018-08-17 POSIX\r\n").expect("version line parses");

    assert_eq!(info.version, "1.1.0");
    assert_eq!((info.major, info.minor, info.patch), (1, 1, 0));
    assert_eq!(info.backend, "POSIX");
}

#[test]
fn non_matching_line_is_a_parse_error() {
    let err = parse_version_line("tr64c development build").expect_err("no version");
    assert!(matches!(err, AppError::Parse(_)));
}

#[test]
fn impossible_date_is_a_parse_error() {
    let err = parse_version_line("1.1.0 2018-13-45 POSIX").expect_err("bad date");
    assert!(matches!(err, AppError::Parse(_)));
}

#[test]
fn version_info_serializes_with_record_field_names() {
    let info = parse_version_line("1.1.0 2018-08-17 WinSocks").expect("version line parses");
    let value = serde_json::to_value(&info).expect("serializable");

    assert_eq!(value["Version"], "1.1.0");
    assert_eq!(value["Major"], 1);
    assert_eq!(value["Minor"], 1);
    assert_eq!(value["Patch"], 0);
    assert_eq!(value["Date"], "2018-08-17");
    assert_eq!(value["Backend"], "WinSocks");
}
