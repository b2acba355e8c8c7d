//! Base64 rendering of document content

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::types::{EncodedDownload, Packaged};

/// Encode bytes with the standard, padded alphabet
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode text produced by [`encode_base64`]
pub fn decode_base64(text: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(text)
        .map_err(|e| Error::Validation(format!("invalid base64 content: {e}")))
}

/// JSON-safe form of a packaged download
pub fn encode_download(packaged: &Packaged, created_at: DateTime<Utc>) -> EncodedDownload {
    EncodedDownload {
        file_name: packaged.content.file_name.clone(),
        mime_type: packaged.content.mime_type.to_string(),
        content: encode_base64(&packaged.content.bytes),
        missing_document_ids: packaged.missing.clone(),
        created_at,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DocumentId, PackagedContent};

    #[test]
    fn known_vectors() {
        assert_eq!(encode_base64(b""), "");
        assert_eq!(encode_base64(b"f"), "Zg==");
        assert_eq!(encode_base64(b"%PDF-1.4"), "JVBERi0xLjQ=");
    }

    #[test]
    fn binary_content_survives_round_trip() {
        let bytes: Vec<u8> = (0..=255).collect();
        assert_eq!(decode_base64(&encode_base64(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            decode_base64("not*base64"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn encoded_download_carries_missing_ids() {
        let packaged = Packaged {
            content: PackagedContent {
                file_name: "document_A.pdf".to_string(),
                bytes: b"abc".to_vec(),
                mime_type: "application/pdf",
            },
            missing: vec![DocumentId::from("B")],
        };

        let encoded = encode_download(&packaged, Utc::now());

        assert_eq!(encoded.content, "YWJj");
        assert_eq!(encoded.mime_type, "application/pdf");
        assert_eq!(encoded.missing_document_ids, vec![DocumentId::from("B")]);
    }
}
