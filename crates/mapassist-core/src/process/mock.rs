//! Mock memory reader for testing
//!
//! Reads from an in-memory image instead of a live process so unit graphs and
//! snapshots can be exercised against hand-built memory layouts.

use crate::error::{Error, Result};
use crate::process::ReadMemory;

/// Mock memory reader backed by one contiguous buffer starting at `base`.
#[derive(Debug, Clone)]
pub struct MockMemoryReader {
    data: Vec<u8>,
    base: u64,
}

impl MockMemoryReader {
    /// Create a new mock reader with the given data at base address 0x1000
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, base: 0x1000 }
    }

    pub fn with_base(data: Vec<u8>, base: u64) -> Self {
        Self { data, base }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl ReadMemory for MockMemoryReader {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        if address < self.base {
            return Err(Error::read_failed(
                address,
                format!("Address below base (base=0x{:X})", self.base),
            ));
        }
        let offset = (address - self.base) as usize;
        offset
            .checked_add(size)
            .and_then(|end| self.data.get(offset..end))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| {
                Error::read_failed(
                    address,
                    format!("{} bytes at image offset {:#x} are unmapped", size, offset),
                )
            })
    }

    fn base_address(&self) -> u64 {
        self.base
    }
}

/// Builder for synthetic memory images.
///
/// Offsets are relative to `base`; the buffer grows as needed.
#[derive(Debug, Clone, Default)]
pub struct MockMemoryBuilder {
    data: Vec<u8>,
    base: u64,
}

impl MockMemoryBuilder {
    /// Create a new builder with default base address (0x1000)
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            base: 0x1000,
        }
    }

    pub fn base(mut self, base: u64) -> Self {
        self.base = base;
        self
    }

    /// Absolute address of `offset` within the image.
    pub fn addr(&self, offset: usize) -> u64 {
        self.base + offset as u64
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.data.resize(size, 0);
        self
    }

    pub fn write_u8(self, offset: usize, value: u8) -> Self {
        self.write_bytes(offset, &[value])
    }

    pub fn write_u16(self, offset: usize, value: u16) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    pub fn write_i32(self, offset: usize, value: i32) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    pub fn write_u32(self, offset: usize, value: u32) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    pub fn write_u64(self, offset: usize, value: u64) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    /// Write a pointer to another location inside the image.
    pub fn write_ptr(self, offset: usize, target_offset: usize) -> Self {
        let target = self.addr(target_offset);
        self.write_u64(offset, target)
    }

    pub fn write_bytes(mut self, offset: usize, bytes: &[u8]) -> Self {
        self.ensure_size(offset + bytes.len());
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    /// Write a null-terminated ASCII string
    pub fn write_ascii(self, offset: usize, text: &str) -> Self {
        let len = text.len();
        self.write_bytes(offset, text.as_bytes()).write_u8(offset + len, 0)
    }

    pub fn build(self) -> MockMemoryReader {
        MockMemoryReader {
            data: self.data,
            base: self.base,
        }
    }

    fn ensure_size(&mut self, required: usize) {
        if self.data.len() < required {
            self.data.resize(required, 0);
        }
    }
}
