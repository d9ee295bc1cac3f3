//! Content type detection for lock bodies.

/// Number of leading bytes inspected.
const SNIFF_LEN: usize = 512;

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Classifies a body as plain text or opaque binary.
///
/// A body is binary if its first 512 bytes contain a control byte that
/// never appears in text (anything below 0x20 except tab, newline, form
/// feed, carriage return and escape).
pub fn detect_content_type(body: &[u8]) -> &'static str {
    let sniffed = &body[..body.len().min(SNIFF_LEN)];
    if sniffed.iter().copied().any(is_binary_byte) {
        OCTET_STREAM
    } else {
        TEXT_PLAIN
    }
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

#[cfg(test)]
mod tests {
    use super::*;
    use storelock_core::record::encode;

    #[test]
    fn test_record_is_binary() {
        assert_eq!(detect_content_type(&encode(0, 1, 2)), OCTET_STREAM);
    }

    #[test]
    fn test_text() {
        assert_eq!(detect_content_type(b"hello\r\n\tworld"), TEXT_PLAIN);
        assert_eq!(detect_content_type(b""), TEXT_PLAIN);
    }

    #[test]
    fn test_only_prefix_is_inspected() {
        let mut body = vec![b'a'; SNIFF_LEN];
        body.push(0);
        assert_eq!(detect_content_type(&body), TEXT_PLAIN);
    }
}
