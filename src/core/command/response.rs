//! Result code terminators and response text cleanup

use crate::core::protocol::checksum::strip_crc_suffix;

/// Verbose success terminator
pub const VRES_OK: &str = "\r\nOK\r\n";
/// Verbose error terminator
pub const VRES_ERR: &str = "\r\nERROR\r\n";
/// Short success code
pub const RES_OK: &str = "0\r";
/// Short error code
pub const RES_ERR: &str = "4\r";

/// True if `buffer` ends with the short result `code` standing on its own line
pub fn is_short_code(buffer: impl AsRef<[u8]>, code: &str) -> bool {
    match buffer.as_ref().strip_suffix(code.as_bytes()) {
        Some(head) => head.is_empty() || head.ends_with(b"\n"),
        None => false,
    }
}

/// Reduce a raw successful response to its information text
///
/// Drops the checksum line, the final result code and the first occurrence
/// of `prefix`, then collapses line separators to single `\n`. Invalid
/// UTF-8 is replaced, not rejected.
pub fn clean_response(raw: impl AsRef<[u8]>, prefix: Option<&str>) -> String {
    let raw = String::from_utf8_lossy(raw.as_ref());
    let body = strip_crc_suffix(&raw);
    let body = body
        .strip_suffix(VRES_OK)
        .or_else(|| body.strip_suffix(RES_OK))
        .unwrap_or(body);

    let mut text = match prefix {
        Some(prefix) if !prefix.is_empty() => body.replacen(prefix, "", 1),
        _ => body.to_string(),
    };
    text = text.replace("\r\n", "\n").replace("\n\n", "\n");
    text.trim().to_string()
}

/// Single-line rendering with visible line controls, for logs
pub fn printable(raw: impl AsRef<[u8]>) -> String {
    String::from_utf8_lossy(raw.as_ref())
        .replace('\r', "<cr>")
        .replace('\n', "<lf>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_code_must_start_line() {
        assert!(is_short_code("0\r", RES_OK));
        assert!(is_short_code("+GSN: 1\r\n4\r", RES_ERR));
        assert!(!is_short_code("10\r", RES_OK));
        assert!(!is_short_code("\r\nOK\r", RES_OK));
    }

    #[test]
    fn test_clean_verbose() {
        let raw = "\r\n+GSN: 01097623SKYEE3D\r\n\r\nOK\r\n";
        assert_eq!(clean_response(raw, Some("+GSN:")), "01097623SKYEE3D");
    }

    #[test]
    fn test_clean_multiline_and_crc() {
        let raw = "\r\n%MGRS: \"A\",1\r\n\"B\",2\r\n\r\nOK\r\n*1A2B\r\n";
        assert_eq!(clean_response(raw, Some("%MGRS:")), "\"A\",1\n\"B\",2");
    }

    #[test]
    fn test_clean_short() {
        assert_eq!(clean_response("0\r", None), "");
        assert_eq!(clean_response("123\r\n0\r", None), "123");
    }

    #[test]
    fn test_prefix_removed_once() {
        let raw = "\r\n%X: a %X: b\r\n\r\nOK\r\n";
        assert_eq!(clean_response(raw, Some("%X:")), "a %X: b");
    }

    #[test]
    fn test_clean_multibyte() {
        let raw = "\r\nCaf\u{e9}\r\n\r\nOK\r\n".as_bytes();
        assert_eq!(clean_response(raw, None), "Caf\u{e9}");
        assert_eq!(clean_response(b"\r\nA\xFF\r\n\r\nOK\r\n", None), "A\u{fffd}");
    }

    #[test]
    fn test_printable() {
        assert_eq!(printable("AT\r\n"), "AT<cr><lf>");
    }
}
