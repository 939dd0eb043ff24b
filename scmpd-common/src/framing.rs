//! Length-framed payload codec for spec.md §3's generic "Channel request"
//! data model: 4 big-endian bytes of length `N`, followed by exactly `N`
//! bytes of content. `russh` parses the actual SSH wire format itself before
//! handing request payloads to this crate's handlers, so this codec is the
//! standalone, spec-level embodiment of that framing invariant rather than
//! something re-applied on top of an already-parsed payload.

use crate::error::ScmpdError;

/// Decode a length-framed payload, returning the trailing `N` bytes.
///
/// Rejects with [`ScmpdError::FrameTooShort`] if `raw` is `<= 4` bytes, and
/// with [`ScmpdError::FrameLengthMismatch`] if the declared length plus the
/// 4-byte header does not exactly equal `raw.len()`.
pub fn decode_payload(raw: &[u8]) -> Result<&[u8], ScmpdError> {
    if raw.len() <= 4 {
        return Err(ScmpdError::FrameTooShort);
    }
    let len = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
    let total = len
        .checked_add(4)
        .ok_or(ScmpdError::FrameLengthMismatch)?;
    if total != raw.len() {
        return Err(ScmpdError::FrameLengthMismatch);
    }
    Ok(&raw[4..])
}

/// Encode `content` as a length-framed payload (inverse of [`decode_payload`]).
pub fn encode_payload(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + 4);
    out.extend_from_slice(&(content.len() as u32).to_be_bytes());
    out.extend_from_slice(content);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_hello() {
        let raw = [0x00, 0x00, 0x00, 0x05, b'H', b'e', b'l', b'l', b'o'];
        assert_eq!(decode_payload(&raw).unwrap(), b"Hello");
    }

    #[test]
    fn rejects_header_only() {
        let raw = [0x00, 0x00, 0x00, 0x05];
        assert!(matches!(decode_payload(&raw), Err(ScmpdError::FrameTooShort)));
    }

    #[test]
    fn rejects_truncated_content() {
        let raw = [0x00, 0x00, 0x00, 0x05, b'H', b'e', b'l'];
        assert!(matches!(
            decode_payload(&raw),
            Err(ScmpdError::FrameLengthMismatch)
        ));
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(decode_payload(&[]), Err(ScmpdError::FrameTooShort)));
    }

    #[test]
    fn round_trips_arbitrary_payloads() {
        for sample in [&b""[..], b"x", b"a command line", &[0u8; 512][..]] {
            let framed = encode_payload(sample);
            assert_eq!(decode_payload(&framed).unwrap(), sample);
        }
    }

    #[test]
    fn rejects_overflowing_length_header() {
        let raw = [0xff, 0xff, 0xff, 0xff, b'x'];
        assert!(matches!(
            decode_payload(&raw),
            Err(ScmpdError::FrameLengthMismatch)
        ));
    }
}
