use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;

use crate::sync_error::{SyncError, SyncResult};

/// Image handed to the uploader: inline base64 or a remote address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoPayload {
    Inline { content_type: String, data: String },
    Remote(String),
}

impl PhotoPayload {
    /// Accepts `data:<mime>;base64,<data>` and `http(s)://` strings.
    pub fn parse(raw: &str) -> SyncResult<PhotoPayload> {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix("data:") {
            let (header, data) = rest
                .split_once(',')
                .ok_or_else(|| SyncError::Payload("data uri without ','".to_string()))?;
            let content_type = header
                .strip_suffix(";base64")
                .ok_or_else(|| SyncError::Payload("only base64 data uris are supported".to_string()))?;

            return Ok(PhotoPayload::Inline {
                content_type: content_type.to_string(),
                data: data.to_string(),
            });
        }

        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(PhotoPayload::Remote(raw.to_string()));
        }

        Err(SyncError::Payload(format!("unsupported payload '{}'", truncate(raw, 32))))
    }

    pub fn inline_jpeg(blob: &[u8]) -> PhotoPayload {
        PhotoPayload::Inline {
            content_type: "image/jpeg".to_string(),
            data: STANDARD.encode(blob),
        }
    }

    /// Decodes an inline payload; remote payloads return `None`.
    pub fn decode_inline(&self) -> Option<SyncResult<Bytes>> {
        match self {
            PhotoPayload::Inline { data, .. } => Some(
                STANDARD
                    .decode(data.trim())
                    .map(Bytes::from)
                    .map_err(|e| SyncError::Payload(format!("invalid base64: {}", e))),
            ),
            PhotoPayload::Remote(_) => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            PhotoPayload::Inline { content_type, data } => {
                format!("inline {} ({} chars)", content_type, data.len())
            }
            PhotoPayload::Remote(url) => url.clone(),
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_data_uri() {
        let payload = PhotoPayload::parse("data:image/png;base64,AAEC").unwrap();
        assert_eq!(
            payload,
            PhotoPayload::Inline { content_type: "image/png".to_string(), data: "AAEC".to_string() }
        );
        assert_eq!(payload.decode_inline().unwrap().unwrap(), Bytes::from_static(&[0, 1, 2]));
    }

    #[test]
    fn parses_remote_url() {
        let payload = PhotoPayload::parse(" https://example.org/cat.jpg ").unwrap();
        assert_eq!(payload, PhotoPayload::Remote("https://example.org/cat.jpg".to_string()));
        assert!(payload.decode_inline().is_none());
    }

    #[test]
    fn rejects_other_inputs() {
        assert!(matches!(PhotoPayload::parse("ftp://x/cat.jpg"), Err(SyncError::Payload(_))));
        assert!(matches!(PhotoPayload::parse("data:image/png,raw"), Err(SyncError::Payload(_))));
    }

    #[test]
    fn bad_base64_fails_on_decode() {
        let payload = PhotoPayload::parse("data:image/jpeg;base64,@@@").unwrap();
        assert!(payload.decode_inline().unwrap().is_err());
    }

    #[test]
    fn inline_jpeg_encodes_bytes() {
        let payload = PhotoPayload::inline_jpeg(&[0xff, 0xd8]);
        assert_eq!(payload.decode_inline().unwrap().unwrap(), Bytes::from_static(&[0xff, 0xd8]));
    }
}
