//! Decoding structures copied out of game memory.
//!
//! Every remote struct is read in one `read_bytes` call and then decoded from
//! the local copy with `ByteBuffer`, so a struct is either fully read or not
//! read at all.

use crate::error::{Error, Result};

/// Little-endian field access into a local copy of a remote struct.
///
/// # Example
///
/// ```
/// use mapassist_core::process::ByteBuffer;
///
/// let data = [0x00, 0x00, 0x78, 0x56, 0x34, 0x12];
/// let buf = ByteBuffer::new(&data);
///
/// assert_eq!(buf.read_u32_at(2).unwrap(), 0x12345678);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ByteBuffer<'a> {
    data: &'a [u8],
}

impl<'a> ByteBuffer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `len` bytes starting at `offset`.
    pub fn slice_at(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or_else(|| {
                Error::read_failed(
                    offset as u64,
                    format!(
                        "Field of {} bytes at {:#x} is outside a {} byte struct",
                        len,
                        offset,
                        self.data.len()
                    ),
                )
            })
    }

    fn array_at<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
        let bytes = self.slice_at(offset, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u8_at(&self, offset: usize) -> Result<u8> {
        Ok(self.array_at::<1>(offset)?[0])
    }

    pub fn read_bool_at(&self, offset: usize) -> Result<bool> {
        Ok(self.read_u8_at(offset)? != 0)
    }

    pub fn read_u16_at(&self, offset: usize) -> Result<u16> {
        self.array_at(offset).map(u16::from_le_bytes)
    }

    pub fn read_i32_at(&self, offset: usize) -> Result<i32> {
        self.array_at(offset).map(i32::from_le_bytes)
    }

    pub fn read_u32_at(&self, offset: usize) -> Result<u32> {
        self.array_at(offset).map(u32::from_le_bytes)
    }

    pub fn read_u64_at(&self, offset: usize) -> Result<u64> {
        self.array_at(offset).map(u64::from_le_bytes)
    }

    /// Reads a fixed-width, null-padded ASCII field at `offset`.
    pub fn read_ascii_at(&self, offset: usize, width: usize) -> Result<String> {
        Ok(decode_ascii(self.slice_at(offset, width)?))
    }
}

/// Decodes a null-terminated ASCII field, replacing anything non-printable.
pub fn decode_ascii(bytes: &[u8]) -> String {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    bytes[..len]
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '?'
            }
        })
        .collect()
}
