//! Decoder for encoded/compressed captured-output measurement payloads.
//!
//! CTest stores the captured output of each test as a Measurement value
//! that may be base64-encoded and gzip-compressed. Decoding is a pure
//! function of the node; a failure is scoped to the single measurement and
//! must never abort the enclosing document.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use flate2::read::MultiGzDecoder;
use std::io::Read;

use crate::error::{IngestError, IngestResult};

/// Decode one measurement payload into text.
///
/// `encoding` absent means the payload is already UTF-8 text; `compression`
/// absent means the decoded bytes are the text. Supported tokens: `base64`
/// and `gzip`. Any other token fails with
/// [`IngestError::UnsupportedFormat`]; callers substitute empty text and
/// continue with the rest of the document.
pub fn decode_measurement(
    payload: &str,
    encoding: Option<&str>,
    compression: Option<&str>,
) -> IngestResult<String> {
    let decoded: Vec<u8> = match encoding {
        None => payload.as_bytes().to_vec(),
        Some(token) if token.eq_ignore_ascii_case("base64") => {
            // CTest wraps base64 payloads across lines
            let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
            BASE64.decode(compact.as_bytes()).map_err(|e| {
                IngestError::UnsupportedFormat(format!("invalid base64 payload: {}", e))
            })?
        }
        Some(token) => {
            return Err(IngestError::UnsupportedFormat(format!(
                "unknown encoding token '{}'",
                token
            )));
        }
    };

    let inflated: Vec<u8> = match compression {
        None => decoded,
        Some(token) if token.eq_ignore_ascii_case("gzip") => {
            let mut out = Vec::new();
            MultiGzDecoder::new(decoded.as_slice())
                .read_to_end(&mut out)
                .map_err(|e| {
                    IngestError::UnsupportedFormat(format!("gzip inflate failed: {}", e))
                })?;
            out
        }
        Some(token) => {
            return Err(IngestError::UnsupportedFormat(format!(
                "unknown compression token '{}'",
                token
            )));
        }
    };

    // The runner occasionally captures non-UTF-8 program output; degrade
    // rather than fail the measurement.
    Ok(String::from_utf8_lossy(&inflated).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn gzip_base64(text: &str) -> String {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        BASE64.encode(encoder.finish().unwrap())
    }

    #[test]
    fn test_plain_payload_passes_through() {
        let out = decode_measurement("hello world", None, None).unwrap();
        assert_eq!(out, "hello world");
    }

    #[test]
    fn test_base64_without_compression() {
        let payload = BASE64.encode("captured output");
        let out = decode_measurement(&payload, Some("base64"), None).unwrap();
        assert_eq!(out, "captured output");
    }

    #[test]
    fn test_base64_gzip_round_trip() {
        let original = "line one\nline two\nassertion text: x == 42\n";
        let payload = gzip_base64(original);
        let out = decode_measurement(&payload, Some("base64"), Some("gzip")).unwrap();
        assert_eq!(out, original);
    }

    #[test]
    fn test_base64_payload_with_line_wrapping() {
        let mut payload = gzip_base64("wrapped payload body");
        payload.insert(8, '\n');
        payload.insert(20, '\n');
        let out = decode_measurement(&payload, Some("base64"), Some("gzip")).unwrap();
        assert_eq!(out, "wrapped payload body");
    }

    #[test]
    fn test_unknown_encoding_is_unsupported() {
        let err = decode_measurement("data", Some("base85"), None).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFormat(_)));
        assert!(err.is_measurement_scoped());
    }

    #[test]
    fn test_unknown_compression_is_unsupported() {
        let payload = BASE64.encode("data");
        let err = decode_measurement(&payload, Some("base64"), Some("zstd")).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_decode_is_deterministic() {
        let payload = gzip_base64("same input, same output");
        let a = decode_measurement(&payload, Some("base64"), Some("gzip")).unwrap();
        let b = decode_measurement(&payload, Some("base64"), Some("gzip")).unwrap();
        assert_eq!(a, b);
    }
}
