//! Unit tests for response framing over line streams and raw bytes.

use futures_util::stream::{self, StreamExt};
use tokio_util::codec::FramedRead;

use tr64c_session::protocol::codec::LineCodec;
use tr64c_session::protocol::reader::{read_response, EndOfStream};
use tr64c_session::{AppError, Result};

fn lines(items: &[&str]) -> impl futures_util::Stream<Item = Result<String>> + Unpin {
    stream::iter(
        items
            .iter()
            .map(|line| Ok((*line).to_owned()))
            .collect::<Vec<_>>(),
    )
}

#[tokio::test]
async fn payload_lines_are_concatenated_until_blank_line() {
    let mut input = lines(&["{\"a\":", "1,", "\"b\":2}", "", "{\"next\":true}"]);

    let payload = read_response(&mut input, EndOfStream::Unexpected)
        .await
        .expect("complete response");

    assert_eq!(payload, "{\"a\":1,\"b\":2}");
}

#[tokio::test]
async fn lines_after_terminator_are_left_for_the_next_response() {
    let mut input = lines(&["{\"first\":1}", "", "{\"second\":2}", ""]);

    let first = read_response(&mut input, EndOfStream::Unexpected)
        .await
        .expect("first response");
    let second = read_response(&mut input, EndOfStream::Unexpected)
        .await
        .expect("second response");

    assert_eq!(first, "{\"first\":1}");
    assert_eq!(second, "{\"second\":2}");
}

#[tokio::test]
async fn immediate_blank_line_is_an_empty_payload() {
    let mut input = lines(&[""]);
    let payload = read_response(&mut input, EndOfStream::Unexpected)
        .await
        .expect("empty response");
    assert!(payload.is_empty());
}

#[tokio::test]
async fn error_sentinel_with_trailing_blank_fails_with_remote_error() {
    let mut input = lines(&["Error: device unreachable", ""]);

    let err = read_response(&mut input, EndOfStream::Unexpected)
        .await
        .expect_err("sentinel must fail");

    match err {
        AppError::Remote(text) => assert_eq!(text, "Error: device unreachable"),
        other => panic!("expected Remote, got {other:?}"),
    }
}

#[tokio::test]
async fn error_sentinel_without_trailing_blank_fails_with_remote_error() {
    let mut input = lines(&["Error: device unreachable"]);

    let err = read_response(&mut input, EndOfStream::ExitAfterResponse)
        .await
        .expect_err("sentinel must fail");

    assert!(matches!(err, AppError::Remote(ref text) if text == "Error: device unreachable"));
}

#[tokio::test]
async fn error_sentinel_discards_preceding_payload() {
    let mut input = lines(&["{\"partial\":", "Error: Requested action is invalid."]);

    let err = read_response(&mut input, EndOfStream::Unexpected)
        .await
        .expect_err("sentinel must fail");

    assert!(!err.to_string().contains("partial"));
}

#[tokio::test]
async fn interactive_end_of_stream_is_an_io_error() {
    let mut input = lines(&["{\"partial\":"]);

    let err = read_response(&mut input, EndOfStream::Unexpected)
        .await
        .expect_err("EOF must fail");

    assert!(matches!(err, AppError::Io(_)), "got {err:?}");
}

#[tokio::test]
async fn one_shot_truncated_response_is_a_protocol_error() {
    let mut input = lines(&["[{\"Device\":\"x\","]);

    let err = read_response(&mut input, EndOfStream::ExitAfterResponse)
        .await
        .expect_err("truncated response must fail");

    assert!(matches!(err, AppError::Protocol(_)), "got {err:?}");
}

#[tokio::test]
async fn one_shot_silent_exit_is_an_empty_response() {
    let mut input = lines(&[]);

    let payload = read_response(&mut input, EndOfStream::ExitAfterResponse)
        .await
        .expect("silent exit is complete");

    assert!(payload.is_empty());
}

#[tokio::test]
async fn stream_errors_are_propagated() {
    let mut input = stream::iter(vec![
        Ok("{".to_owned()),
        Err(AppError::Io("pipe broken".into())),
    ]);

    let err = read_response(&mut input, EndOfStream::Unexpected)
        .await
        .expect_err("stream error must fail");

    assert!(matches!(err, AppError::Io(ref msg) if msg == "pipe broken"));
}

#[tokio::test]
async fn codec_frames_crlf_output_from_raw_bytes() {
    let raw: &[u8] = b"{\"Hosts\":\r\n{\"Count\":3}}\r\n\r\nError: later\r\n";
    let mut framed = FramedRead::new(raw, LineCodec::new());

    let payload = read_response(&mut framed, EndOfStream::Unexpected)
        .await
        .expect("complete response");
    assert_eq!(payload, "{\"Hosts\":{\"Count\":3}}");

    let next = read_response(&mut framed, EndOfStream::Unexpected).await;
    assert!(matches!(next, Err(AppError::Remote(ref text)) if text == "Error: later"));
}

#[tokio::test]
async fn codec_delivers_final_unterminated_line() {
    let raw: &[u8] = b"1.1.0 2018-08-17 POSIX";
    let mut framed = FramedRead::new(raw, LineCodec::new());

    let line = framed.next().await.expect("one line").expect("no error");
    assert_eq!(line, "1.1.0 2018-08-17 POSIX");
    assert!(framed.next().await.is_none());
}

#[tokio::test]
async fn diagnostic_lines_are_not_payload() {
    let mut input = lines(&[
        "Warning: Failed to read cache file content.",
        "{\"D\":",
        "Info: Finished service description request in 12 ms.",
        "{\"x\":1}}",
        "Debug: Output query response.",
        "",
    ]);

    let payload = read_response(&mut input, EndOfStream::Unexpected)
        .await
        .expect("complete response");

    assert_eq!(payload, "{\"D\":{\"x\":1}}");
}

#[tokio::test]
async fn one_shot_exit_after_only_diagnostics_is_empty() {
    let mut input = lines(&["Warning: Timeout value is less than recommended (>=1000ms)."]);

    let payload = read_response(&mut input, EndOfStream::ExitAfterResponse)
        .await
        .expect("no payload was started");

    assert!(payload.is_empty());
}
