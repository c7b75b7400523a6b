//! Lenient extraction of a participant identifier from raw flag file bytes.
//!
//! Players plant their identifier with whatever tooling the box offers, so the
//! content may be ASCII/UTF-8 or UTF-16 (e.g. PowerShell's default `Out-File`).
use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};
use thiserror::Error;

const BOM_BE: &[u8] = &[0xFE, 0xFF];
const BOM_LE: &[u8] = &[0xFF, 0xFE];

/// Decoders tried, in order, once the bytes fail to parse as plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackEncoding {
    Utf16Be,
    /// Big-endian unless a byte-order mark says otherwise.
    Utf16BeBom,
    /// Little-endian, with or without a byte-order mark.
    Utf16Le,
}

pub const FALLBACK_ENCODINGS: [FallbackEncoding; 3] = [
    FallbackEncoding::Utf16Be,
    FallbackEncoding::Utf16BeBom,
    FallbackEncoding::Utf16Le,
];

impl FallbackEncoding {
    pub fn name(self) -> &'static str {
        match self {
            FallbackEncoding::Utf16Be => "UTF-16BE",
            FallbackEncoding::Utf16BeBom => "UTF-16BE with BOM",
            FallbackEncoding::Utf16Le => "UTF-16LE",
        }
    }

    /// `None` when the bytes are malformed for this encoding.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            FallbackEncoding::Utf16Be => decode_strict(UTF_16BE, bytes),
            FallbackEncoding::Utf16BeBom => {
                if let Some(rest) = bytes.strip_prefix(BOM_LE) {
                    decode_strict(UTF_16LE, rest)
                } else {
                    decode_strict(UTF_16BE, bytes.strip_prefix(BOM_BE).unwrap_or(bytes))
                }
            }
            FallbackEncoding::Utf16Le => {
                decode_strict(UTF_16LE, bytes.strip_prefix(BOM_LE).unwrap_or(bytes))
            }
        }
    }
}

fn decode_strict(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(Cow::into_owned)
}

/// Every encoding name the extractor attempts, plain text first.
pub fn attempted_encodings() -> String {
    let mut names = vec!["ASCII", "UTF-8"];
    names.extend(FALLBACK_ENCODINGS.iter().map(|encoding| encoding.name()));
    names.join(", ")
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error(
        "unable to parse {raw:?}; either the file doesn't contain a number or the encoding is not any of {}",
        attempted_encodings()
    )]
    Unparseable { raw: Vec<u8> },
}

/// Returns the base-10 integer the bytes hold, trying plain text first and
/// then each fallback encoding. The first successful parse wins.
pub fn extract_identifier(bytes: &[u8]) -> Result<i64, ExtractError> {
    if let Some(id) = std::str::from_utf8(bytes).ok().and_then(parse_decimal) {
        return Ok(id);
    }

    for encoding in FALLBACK_ENCODINGS {
        if let Some(id) = encoding.decode(bytes).as_deref().and_then(parse_decimal) {
            return Ok(id);
        }
    }

    Err(ExtractError::Unparseable { raw: bytes.to_vec() })
}

fn parse_decimal(text: &str) -> Option<i64> {
    text.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16le(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    fn utf16be(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(u16::to_be_bytes).collect()
    }

    #[test]
    fn plain_text_with_trailing_newline() {
        assert_eq!(extract_identifier(b"42\n"), Ok(42));
    }

    #[test]
    fn plain_text_signs_and_whitespace() {
        assert_eq!(extract_identifier(b"  -17\t\r\n"), Ok(-17));
        assert_eq!(extract_identifier(b"+8"), Ok(8));
    }

    #[test]
    fn utf16_little_endian_without_bom() {
        assert_eq!(extract_identifier(&utf16le("7")), Ok(7));
    }

    #[test]
    fn utf16_little_endian_with_bom() {
        let mut bytes = BOM_LE.to_vec();
        bytes.extend(utf16le("1337\r\n"));
        assert_eq!(extract_identifier(&bytes), Ok(1337));
    }

    #[test]
    fn utf16_big_endian_with_and_without_bom() {
        assert_eq!(extract_identifier(&utf16be("256\n")), Ok(256));

        let mut bytes = BOM_BE.to_vec();
        bytes.extend(utf16be("99"));
        assert_eq!(extract_identifier(&bytes), Ok(99));
    }

    #[test]
    fn not_a_number_names_every_encoding() {
        let err = extract_identifier(b"not-a-number").unwrap_err();
        assert_eq!(
            err,
            ExtractError::Unparseable {
                raw: b"not-a-number".to_vec()
            }
        );

        let message = err.to_string();
        for name in ["ASCII", "UTF-8", "UTF-16BE", "UTF-16BE with BOM", "UTF-16LE"] {
            assert!(message.contains(name), "{name} missing from {message}");
        }
    }

    #[test]
    fn empty_file_fails() {
        assert!(extract_identifier(b"").is_err());
        assert!(extract_identifier(b" \n").is_err());
    }

    #[test]
    fn utf16_text_that_is_not_numeric_fails() {
        assert!(extract_identifier(&utf16le("player-one")).is_err());
    }

    #[test]
    fn odd_length_utf16_is_malformed() {
        assert_eq!(FallbackEncoding::Utf16Le.decode(&[0x34, 0x00, 0x32]), None);
        assert_eq!(FallbackEncoding::Utf16Be.decode(&[0x00, 0x34, 0x00]), None);
    }

    #[test]
    fn bom_aware_decoder_follows_little_endian_mark() {
        let mut bytes = BOM_LE.to_vec();
        bytes.extend(utf16le("5"));
        assert_eq!(FallbackEncoding::Utf16BeBom.decode(&bytes).as_deref(), Some("5"));
    }

    #[test]
    fn out_of_range_numbers_fail() {
        assert!(extract_identifier(b"99999999999999999999999").is_err());
    }
}
