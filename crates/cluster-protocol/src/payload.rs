/// Heartbeat wire format.
///
/// A heartbeat datagram has no header: its whole body is the gzip-compressed
/// UTF-8 advertised URL of the sending node. An empty URL means the sender is
/// alive but could not determine its own address.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

/// Decoded body of one heartbeat datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatBody {
    /// The peer advertised this URL.
    Url(String),
    /// The peer is alive but its address is unknown (empty payload).
    Unknown,
}

impl HeartbeatBody {
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Url(url) => Some(url),
            Self::Unknown => None,
        }
    }
}

pub fn compress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() + 32), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

pub fn decompress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::with_capacity(data.len() * 2);
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Build the datagram body advertising `url`.
pub fn encode_heartbeat(url: &str) -> std::io::Result<Vec<u8>> {
    compress(url.as_bytes())
}

/// Decode a received datagram body. Returns `None` if the body is not gzip
/// or does not decompress to UTF-8.
pub fn decode_heartbeat(data: &[u8]) -> Option<HeartbeatBody> {
    if data.is_empty() {
        return None;
    }
    let raw = decompress(data).ok()?;
    let url = String::from_utf8(raw).ok()?;
    if url.is_empty() {
        Some(HeartbeatBody::Unknown)
    } else {
        Some(HeartbeatBody::Url(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_roundtrip() {
        let body = encode_heartbeat("//10.0.0.5:40001/eventbus").unwrap();
        assert_eq!(
            decode_heartbeat(&body),
            Some(HeartbeatBody::Url("//10.0.0.5:40001/eventbus".to_string()))
        );
    }

    #[test]
    fn test_empty_url_is_unknown() {
        let body = encode_heartbeat("").unwrap();
        // Still a valid gzip stream, never a zero-length datagram
        assert!(!body.is_empty());
        let decoded = decode_heartbeat(&body).unwrap();
        assert_eq!(decoded, HeartbeatBody::Unknown);
        assert!(decoded.url().is_none());
    }

    #[test]
    fn test_gzip_magic() {
        let body = encode_heartbeat("peer-A").unwrap();
        assert_eq!(&body[0..2], &[0x1F, 0x8B]);
    }

    #[test]
    fn test_reject_garbage() {
        assert!(decode_heartbeat(b"peer-A").is_none());
        assert!(decode_heartbeat(&[]).is_none());
    }

    #[test]
    fn test_reject_non_utf8() {
        let body = compress(&[0xC3, 0x28, 0xFF]).unwrap();
        assert!(decode_heartbeat(&body).is_none());
    }
}
