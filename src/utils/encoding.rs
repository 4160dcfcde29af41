//! Encoding detection and round-trippable decoding of source files.
//!
//! Edits are computed against decoded text, so a file must be written back
//! in the encoding it was read with:
//! - BOM detection (UTF-8, UTF-16 LE/BE)
//! - UTF-8 fast-path with strict validation
//! - Fallback encoding detection using chardetng
//! - Binary file detection

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};

const BINARY_SAMPLE_SIZE: usize = 8192;

/// Decoded file content plus what is needed to encode it again.
#[derive(Debug, Clone)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static Encoding,
    pub bom: bool,
}

impl DecodedText {
    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }
}

/// Heuristic binary check: null bytes or fewer than 70% printable bytes in
/// the first sample.
pub fn is_binary_bytes(bytes: &[u8]) -> bool {
    let sample = &bytes[..bytes.len().min(BINARY_SAMPLE_SIZE)];
    if sample.is_empty() {
        return false;
    }
    if sample.starts_with(&[0xff, 0xfe]) || sample.starts_with(&[0xfe, 0xff]) {
        return false;
    }
    if sample.contains(&0) {
        return true;
    }
    if std::str::from_utf8(sample).is_ok() {
        return false;
    }

    let printable_count = sample
        .iter()
        .filter(|&&b| (32..=126).contains(&b) || b == b'\t' || b == b'\n' || b == b'\r')
        .count();
    (printable_count as f64 / sample.len() as f64) < 0.70
}

/// Decode raw bytes.
///
/// BOMs win, then strict UTF-8, then whatever chardetng guesses.
pub fn decode_bytes(bytes: &[u8]) -> DecodedText {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return DecodedText { text: text.into_owned(), encoding, bom: true };
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return DecodedText { text: text.to_string(), encoding: UTF_8, bom: false };
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (text, _, _) = encoding.decode(bytes);
    DecodedText { text: text.into_owned(), encoding, bom: false }
}

/// Encode text back into the encoding it was decoded from.
pub fn encode_text(text: &str, encoding: &'static Encoding, bom: bool) -> Vec<u8> {
    if encoding == UTF_16LE || encoding == UTF_16BE {
        let little = encoding == UTF_16LE;
        let mut out = Vec::with_capacity(text.len() * 2 + 2);
        if bom {
            out.extend_from_slice(if little { &[0xff, 0xfe] } else { &[0xfe, 0xff] });
        }
        for unit in text.encode_utf16() {
            let pair = if little { unit.to_le_bytes() } else { unit.to_be_bytes() };
            out.extend_from_slice(&pair);
        }
        return out;
    }

    let mut out = Vec::with_capacity(text.len() + 3);
    if bom && encoding == UTF_8 {
        out.extend_from_slice(&[0xef, 0xbb, 0xbf]);
    }
    let (bytes, _, _) = encoding.encode(text);
    out.extend_from_slice(&bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_detection() {
        assert!(is_binary_bytes(&[0xca, 0xfe, 0xba, 0xbe, 0x00, 0x00, 0x00, 0x34]));
        assert!(!is_binary_bytes(b"package pkg.a;\n\npublic class Foo {}\n"));
        assert!(!is_binary_bytes(b""));
    }

    #[test]
    fn test_utf8_round_trip() {
        let source = "package p;\n// caf\u{e9}\nclass A {}\n";
        let decoded = decode_bytes(source.as_bytes());
        assert_eq!(decoded.encoding_name(), "UTF-8");
        assert!(!decoded.bom);
        assert_eq!(encode_text(&decoded.text, decoded.encoding, decoded.bom), source.as_bytes());
    }

    #[test]
    fn test_bom_is_preserved() {
        let mut bytes = vec![0xef, 0xbb, 0xbf];
        bytes.extend_from_slice(b"class A {}");
        let decoded = decode_bytes(&bytes);
        assert!(decoded.bom);
        assert_eq!(decoded.text, "class A {}");
        assert_eq!(encode_text(&decoded.text, decoded.encoding, decoded.bom), bytes);
    }

    #[test]
    fn test_utf16_le_round_trip() {
        let mut bytes = vec![0xff, 0xfe];
        for unit in "class A {}".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let decoded = decode_bytes(&bytes);
        assert_eq!(decoded.text, "class A {}");
        assert_eq!(encode_text(&decoded.text, decoded.encoding, decoded.bom), bytes);
    }
}
