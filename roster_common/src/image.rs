//! Image payloads and their data-URI form
//!
//! Clients exchange images as `data:image/<type>;base64,<payload>` strings.
//! The durable store keeps only the raw bytes and re-derives the MIME type
//! from the magic bytes when it hands records back out.

use crate::error::{Result, RosterError};
use base64::Engine;

/// Largest accepted image, measured on the decoded bytes (2 MiB)
pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// MIME type used when the payload matches no known signature
const DEFAULT_MIME: &str = "image/jpeg";

/// Base64 length of a `MAX_IMAGE_BYTES` payload, used to refuse oversized
/// input before decoding it
const MAX_ENCODED_LEN: usize = MAX_IMAGE_BYTES.div_ceil(3) * 4;

/// A decoded image with its MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    mime: String,
    bytes: Vec<u8>,
}

impl ImagePayload {
    /// Build a payload from raw bytes at ingestion time (enforces the size ceiling)
    pub fn from_bytes(mime: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let mime = mime.into();
        check_mime(&mime)?;
        check_size(bytes.len())?;
        Ok(Self { mime, bytes })
    }

    /// Wrap stored bytes, guessing the MIME type from their signature
    pub fn sniffed(bytes: Vec<u8>) -> Self {
        Self {
            mime: sniff_mime(&bytes).to_string(),
            bytes,
        }
    }

    /// Parse and decode a `data:image/<type>;base64,<payload>` string
    pub fn parse_data_uri(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| invalid("image must be a data URI"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| invalid("data URI has no payload separator"))?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or_else(|| invalid("data URI must be base64 encoded"))?;
        check_mime(mime)?;

        if payload.len() > MAX_ENCODED_LEN {
            return Err(too_large());
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| invalid(&format!("invalid base64 payload: {}", e)))?;
        check_size(bytes.len())?;

        Ok(Self {
            mime: mime.to_string(),
            bytes,
        })
    }

    /// Encode as a data URI
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Decode an optional data-URI field down to raw bytes.
///
/// `None` and the empty string both mean "no image given".
pub fn decode_optional(uri: Option<&str>) -> Result<Option<Vec<u8>>> {
    match uri {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => ImagePayload::parse_data_uri(s).map(|p| Some(p.into_bytes())),
    }
}

/// Guess an image MIME type from the leading bytes
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else {
        DEFAULT_MIME
    }
}

fn check_mime(mime: &str) -> Result<()> {
    match mime.strip_prefix("image/") {
        Some(subtype) if !subtype.is_empty() => Ok(()),
        _ => Err(invalid(&format!("unsupported media type: {:?}", mime))),
    }
}

fn check_size(len: usize) -> Result<()> {
    if len > MAX_IMAGE_BYTES {
        Err(too_large())
    } else {
        Ok(())
    }
}

fn too_large() -> RosterError {
    RosterError::Validation(format!(
        "image exceeds the {} byte limit",
        MAX_IMAGE_BYTES
    ))
}

fn invalid(msg: &str) -> RosterError {
    RosterError::Validation(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";

    #[test]
    fn parses_data_uri() {
        let payload = ImagePayload::parse_data_uri("data:image/png;base64,AAEC").unwrap();
        assert_eq!(payload.mime(), "image/png");
        assert_eq!(payload.bytes(), &[0x00, 0x01, 0x02]);
    }

    #[test]
    fn encodes_data_uri() {
        let payload = ImagePayload::from_bytes("image/gif", vec![0x00, 0x01, 0x02]).unwrap();
        assert_eq!(payload.to_data_uri(), "data:image/gif;base64,AAEC");
    }

    #[test]
    fn rejects_non_data_uri() {
        let err = ImagePayload::parse_data_uri("https://example.com/a.png").unwrap_err();
        assert!(matches!(err, RosterError::Validation(_)));
    }

    #[test]
    fn rejects_non_base64_data_uri() {
        let err = ImagePayload::parse_data_uri("data:image/svg+xml,<svg/>").unwrap_err();
        assert!(matches!(err, RosterError::Validation(_)));
    }

    #[test]
    fn rejects_non_image_media_type() {
        let err = ImagePayload::parse_data_uri("data:text/plain;base64,AAEC").unwrap_err();
        assert!(matches!(err, RosterError::Validation(_)));
    }

    #[test]
    fn rejects_corrupt_base64() {
        let err = ImagePayload::parse_data_uri("data:image/png;base64,@@@").unwrap_err();
        assert!(matches!(err, RosterError::Validation(_)));
    }

    #[test]
    fn size_ceiling_is_inclusive() {
        let exact = vec![0xAB; MAX_IMAGE_BYTES];
        let payload = ImagePayload::from_bytes("image/jpeg", exact.clone()).unwrap();
        let decoded = ImagePayload::parse_data_uri(&payload.to_data_uri()).unwrap();
        assert_eq!(decoded.bytes(), exact.as_slice());

        let over = vec![0xAB; MAX_IMAGE_BYTES + 1];
        assert!(ImagePayload::from_bytes("image/jpeg", over.clone()).is_err());

        // An oversized data URI built by hand must be refused as well
        let uri = format!(
            "data:image/jpeg;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&over)
        );
        assert!(ImagePayload::parse_data_uri(&uri).is_err());
    }

    #[test]
    fn decode_optional_treats_empty_as_absent() {
        assert_eq!(decode_optional(None).unwrap(), None);
        assert_eq!(decode_optional(Some("")).unwrap(), None);
        assert_eq!(
            decode_optional(Some("data:image/png;base64,AAEC")).unwrap(),
            Some(vec![0x00, 0x01, 0x02])
        );
    }

    #[test]
    fn sniffs_known_signatures() {
        assert_eq!(sniff_mime(PNG_HEADER), "image/png");
        assert_eq!(sniff_mime(b"GIF89a...."), "image/gif");
        assert_eq!(sniff_mime(b"RIFF\x00\x00\x00\x00WEBPVP8 "), "image/webp");
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(sniff_mime(&[0x00, 0x01]), "image/jpeg");
        assert_eq!(sniff_mime(&[]), "image/jpeg");
    }

    #[test]
    fn sniffed_payload_keeps_bytes() {
        let payload = ImagePayload::sniffed(PNG_HEADER.to_vec());
        assert_eq!(payload.mime(), "image/png");
        assert_eq!(payload.into_bytes(), PNG_HEADER.to_vec());
    }
}
