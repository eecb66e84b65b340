//! Geometry server wire format.
//!
//! Request: 12 bytes, `seed: u32, difficulty: u32, area: u32`, little endian.
//! Response: `length: u32` little endian, then `length` bytes of UTF-8 JSON.

use std::io::{ErrorKind, Read, Write};

use tracing::{error, warn};

use crate::error::{Error, Result};

pub const REQUEST_SIZE: usize = 12;

/// Upper bound on a response body; anything larger is a desynced stream.
pub const MAX_RESPONSE_LEN: u32 = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryRequest {
    pub seed: u32,
    pub difficulty: u32,
    pub area: u32,
}

impl GeometryRequest {
    pub fn new(seed: u32, difficulty: u32, area: u32) -> Self {
        Self {
            seed,
            difficulty,
            area,
        }
    }

    pub fn to_bytes(&self) -> [u8; REQUEST_SIZE] {
        let mut buf = [0u8; REQUEST_SIZE];
        buf[0..4].copy_from_slice(&self.seed.to_le_bytes());
        buf[4..8].copy_from_slice(&self.difficulty.to_le_bytes());
        buf[8..12].copy_from_slice(&self.area.to_le_bytes());
        buf
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

/// One decoded response frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub length: u32,
    /// `None` for "no data": empty frame, blank or unparsable JSON, or an
    /// `error` object.
    pub json: Option<String>,
}

impl ResponseFrame {
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Read one frame. Returns `Ok(None)` on a clean end of stream.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<ResponseFrame>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let length = u32::from_le_bytes(len_buf);
    if length == 0 {
        return Ok(Some(ResponseFrame { length, json: None }));
    }
    if length > MAX_RESPONSE_LEN {
        return Err(Error::CollaboratorProtocol(format!(
            "Response length {} exceeds limit",
            length
        )));
    }

    let mut body = vec![0u8; length as usize];
    match reader.read_exact(&mut body) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    Ok(Some(ResponseFrame {
        length,
        json: decode_body(&body),
    }))
}

/// Validate a response body. Errors are logged and turned into `None`.
pub fn decode_body(body: &[u8]) -> Option<String> {
    let text = match std::str::from_utf8(body) {
        Ok(text) => text,
        Err(e) => {
            error!("Geometry response is not UTF-8: {}", e);
            return None;
        }
    };
    if text.trim().is_empty() {
        return None;
    }

    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            error!("Unable to parse JSON from geometry server: {}", e);
            return None;
        }
    };
    if let Some(message) = value.get("error") {
        warn!("Geometry server error: {}", message);
        return None;
    }
    Some(text.to_string())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn frame(body: &str) -> Vec<u8> {
        let mut out = (body.len() as u32).to_le_bytes().to_vec();
        out.extend_from_slice(body.as_bytes());
        out
    }

    #[test]
    fn test_request_layout() {
        let req = GeometryRequest::new(0x11223344, 2, 46);
        assert_eq!(
            req.to_bytes(),
            [0x44, 0x33, 0x22, 0x11, 2, 0, 0, 0, 46, 0, 0, 0]
        );
    }

    #[test]
    fn test_read_frames() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&0u32.to_le_bytes());
        stream.extend(frame(r#"{"levelOrigin":{"x":1,"y":2}}"#));
        stream.extend(frame(r#"{"error": "bad seed"}"#));
        stream.extend(frame("   "));
        stream.extend(frame("{not json"));
        let mut cursor = Cursor::new(stream);

        let empty = read_frame(&mut cursor).unwrap().unwrap();
        assert!(empty.is_empty());
        assert!(empty.json.is_none());

        let ok = read_frame(&mut cursor).unwrap().unwrap();
        assert!(ok.json.unwrap().contains("levelOrigin"));

        for _ in 0..3 {
            let frame = read_frame(&mut cursor).unwrap().unwrap();
            assert!(!frame.is_empty());
            assert!(frame.json.is_none());
        }

        assert!(read_frame(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn test_truncated_body_is_end_of_stream() {
        let mut bytes = 10u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"{}");
        assert!(read_frame(&mut Cursor::new(bytes)).unwrap().is_none());
    }

    #[test]
    fn test_oversized_length() {
        let bytes = u32::MAX.to_le_bytes().to_vec();
        let err = read_frame(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::CollaboratorProtocol(_)));
    }
}
