use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

/// Number of leading bytes inspected for binary detection.
const BINARY_CHECK_SIZE: usize = 8192;

/// Returns `true` if the buffer appears to contain binary (non-text) data.
/// Detection: presence of null bytes in the first 8 KB.
pub fn is_binary(content: &[u8]) -> bool {
    let check_len = content.len().min(BINARY_CHECK_SIZE);
    content[..check_len].contains(&0)
}

/// Decode raw file bytes to UTF-8 text.
///
/// Detection order: BOM sniff, then statistical auto-detection, then UTF-8.
/// Decoding never fails; undecodable sequences become replacement chars and
/// the caller's NUL check catches binaries that slipped past detection.
pub fn decode_to_utf8(content: &[u8]) -> String {
    let encoding = match Encoding::for_bom(content) {
        Some((enc, _bom_len)) => enc,
        None => {
            let mut detector = EncodingDetector::new();
            detector.feed(content, true);
            let guessed = detector.guess(None, true);
            if guessed == UTF_8 || std::str::from_utf8(content).is_ok() {
                UTF_8
            } else {
                guessed
            }
        }
    };
    let (decoded, _, _) = encoding.decode(content);
    decoded.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_utf8_passes_through() {
        assert_eq!(decode_to_utf8(b"fn main() {}"), "fn main() {}");
    }

    #[test]
    fn utf8_bom_stripped() {
        let with_bom = [0xEF, 0xBB, 0xBF, b'h', b'i'];
        assert_eq!(decode_to_utf8(&with_bom), "hi");
    }

    #[test]
    fn utf16le_bom_decoded() {
        // "hi" in UTF-16LE with BOM
        let bytes = [0xFF, 0xFE, b'h', 0x00, b'i', 0x00];
        assert_eq!(decode_to_utf8(&bytes), "hi");
    }

    #[test]
    fn latin1_auto_detected() {
        // "café" in ISO-8859-1: é = 0xE9, invalid as UTF-8
        let bytes = [b'c', b'a', b'f', 0xE9, b' ', b'a', b'u', b' ', b'l', b'a', b'i', b't'];
        let decoded = decode_to_utf8(&bytes);
        assert!(decoded.contains('é'), "got: {decoded}");
    }

    #[test]
    fn text_content_not_binary() {
        assert!(!is_binary(b"def hello():\n    pass\n"));
    }

    #[test]
    fn null_in_text_is_binary() {
        assert!(is_binary(b"hello\x00world"));
    }

    #[test]
    fn empty_content_not_binary() {
        assert!(!is_binary(b""));
    }

    #[test]
    fn null_after_8kb_not_detected() {
        let mut data = vec![b'a'; 10_000];
        data[9000] = 0;
        assert!(!is_binary(&data));
    }
}
