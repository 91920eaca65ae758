//! Value quoting for the `tr64c` interactive command language.

/// Quote and escape `value` so it survives `tr64c`'s command-line splitter
/// as a single field.
///
/// Backslash, line feed, carriage return, tab, double quote and apostrophe
/// are backslash-escaped; the result is enclosed in double quotes.
///
/// ```
/// use tr64c_session::protocol::quote::quote;
///
/// assert_eq!(quote("NewIndex=1"), "\"NewIndex=1\"");
/// assert_eq!(quote("a\"b"), "\"a\\\"b\"");
/// ```
#[must_use]
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}
