#![cfg_attr(not(target_os = "windows"), allow(dead_code, unused_variables))]

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::process::ProcessHandle;
use crate::process::bytes::{ByteBuffer, decode_ascii};

#[cfg(target_os = "windows")]
use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;

/// A fixed-size structure that can be decoded from a copy of remote memory.
///
/// `SIZE` is the number of bytes read in one call; `decode` only ever sees a
/// buffer of exactly that length.
pub trait RemoteStruct: Sized {
    const SIZE: usize;

    fn decode(buf: &ByteBuffer<'_>) -> Result<Self>;
}

/// Read-only access to one process's address space.
///
/// Implemented by the live reader and by [`crate::process::MockMemoryReader`].
pub trait ReadMemory {
    /// Read raw bytes from memory at the given address.
    ///
    /// Implementations return either exactly `size` bytes or an error.
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>>;

    /// Get the base address of the main module
    fn base_address(&self) -> u64;

    fn read_u8(&self, address: u64) -> Result<u8> {
        ByteBuffer::new(&self.read_bytes(address, 1)?).read_u8_at(0)
    }

    fn read_u16(&self, address: u64) -> Result<u16> {
        ByteBuffer::new(&self.read_bytes(address, 2)?).read_u16_at(0)
    }

    fn read_i32(&self, address: u64) -> Result<i32> {
        ByteBuffer::new(&self.read_bytes(address, 4)?).read_i32_at(0)
    }

    fn read_u32(&self, address: u64) -> Result<u32> {
        ByteBuffer::new(&self.read_bytes(address, 4)?).read_u32_at(0)
    }

    fn read_u64(&self, address: u64) -> Result<u64> {
        ByteBuffer::new(&self.read_bytes(address, 8)?).read_u64_at(0)
    }

    /// Read a pointer-sized value. Null is returned as `0`, not as an error.
    fn read_ptr(&self, address: u64) -> Result<u64> {
        self.read_u64(address)
    }

    /// Read a fixed-width, null-padded ASCII field
    fn read_ascii(&self, address: u64, width: usize) -> Result<String> {
        let bytes = self.read_bytes(address, width)?;
        Ok(decode_ascii(&bytes))
    }

    /// Read and decode one struct at `address`.
    ///
    /// A null address is rejected before any read is issued.
    fn read_struct<T: RemoteStruct>(&self, address: u64) -> Result<T>
    where
        Self: Sized,
    {
        if address == 0 {
            return Err(Error::read_failed(address, "Null struct pointer"));
        }
        let bytes = self.read_bytes(address, T::SIZE)?;
        T::decode(&ByteBuffer::new(&bytes))
    }

    /// Read `count` consecutive structs starting at `address` in a single read.
    fn read_array<T: RemoteStruct>(&self, address: u64, count: usize) -> Result<Vec<T>>
    where
        Self: Sized,
    {
        if count == 0 {
            return Ok(Vec::new());
        }
        if address == 0 {
            return Err(Error::read_failed(address, "Null array pointer"));
        }
        let total = T::SIZE
            .checked_mul(count)
            .ok_or_else(|| Error::read_failed(address, "Array size overflow"))?;
        let bytes = self.read_bytes(address, total)?;
        bytes
            .chunks_exact(T::SIZE)
            .map(|chunk| T::decode(&ByteBuffer::new(chunk)))
            .collect()
    }
}

impl<R: ReadMemory + ?Sized> ReadMemory for &R {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        (**self).read_bytes(address, size)
    }

    fn base_address(&self) -> u64 {
        (**self).base_address()
    }
}

/// Reads from a live process through a shared handle.
///
/// Cloning is cheap; the OS handle is closed when the last clone is dropped.
#[derive(Clone)]
pub struct MemoryReader {
    process: Arc<ProcessHandle>,
}

impl MemoryReader {
    pub fn new(process: Arc<ProcessHandle>) -> Self {
        Self { process }
    }

    pub fn process(&self) -> &ProcessHandle {
        &self.process
    }

    #[cfg(target_os = "windows")]
    fn read_bytes_impl(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; size];
        let mut bytes_read = 0;

        // SAFETY: ReadProcessMemory is called with:
        // - A valid process handle from ProcessHandle (obtained via OpenProcess with PROCESS_VM_READ)
        // - A properly allocated buffer of the requested size
        // - A pointer to receive the actual bytes read
        // An invalid address or an exited process makes the call fail, which is mapped to Err.
        unsafe {
            ReadProcessMemory(
                self.process.handle(),
                address as *const _,
                buffer.as_mut_ptr() as *mut _,
                size,
                Some(&mut bytes_read),
            )
            .map_err(|e| Error::read_failed(address, e.to_string()))?;
        }

        // Partial reads are failures: a half-copied struct is never decoded.
        if bytes_read != size {
            return Err(Error::read_failed(
                address,
                format!("Expected {} bytes, read {}", size, bytes_read),
            ));
        }

        Ok(buffer)
    }

    #[cfg(not(target_os = "windows"))]
    fn read_bytes_impl(&self, address: u64, _size: usize) -> Result<Vec<u8>> {
        Err(Error::read_failed(
            address,
            "Windows only: memory reading not supported on this platform",
        ))
    }
}

impl ReadMemory for MemoryReader {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        self.read_bytes_impl(address, size)
    }

    fn base_address(&self) -> u64 {
        self.process.base_address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::mock::{MockMemoryBuilder, MockMemoryReader};

    #[derive(Debug, PartialEq)]
    struct Pair {
        a: u16,
        b: u32,
    }

    impl RemoteStruct for Pair {
        const SIZE: usize = 8;

        fn decode(buf: &ByteBuffer<'_>) -> Result<Self> {
            Ok(Self {
                a: buf.read_u16_at(0)?,
                b: buf.read_u32_at(4)?,
            })
        }
    }

    #[test]
    fn test_read_i32_negative() {
        let reader = MockMemoryReader::new(vec![0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(reader.read_i32(0x1000).unwrap(), -1);
    }

    #[test]
    fn test_read_u16_and_u8() {
        let reader = MockMemoryReader::new(vec![0x34, 0x12, 0x7F]);
        assert_eq!(reader.read_u16(0x1000).unwrap(), 0x1234);
        assert_eq!(reader.read_u8(0x1002).unwrap(), 0x7F);
    }

    #[test]
    fn test_read_ptr() {
        let reader = MockMemoryBuilder::new().write_u64(0, 0x7FF6_0000_1234).build();
        assert_eq!(reader.read_ptr(0x1000).unwrap(), 0x7FF6_0000_1234);
    }

    #[test]
    fn test_read_ascii() {
        let reader = MockMemoryBuilder::new()
            .with_size(16)
            .write_bytes(0, b"Amazon")
            .build();
        assert_eq!(reader.read_ascii(0x1000, 16).unwrap(), "Amazon");
    }

    #[test]
    fn test_read_struct() {
        let reader = MockMemoryBuilder::new()
            .write_u16(0, 7)
            .write_u32(4, 99)
            .build();

        let pair: Pair = reader.read_struct(0x1000).unwrap();
        assert_eq!(pair, Pair { a: 7, b: 99 });
    }

    #[test]
    fn test_read_struct_null_pointer() {
        let reader = MockMemoryReader::new(vec![0; 16]);
        assert!(reader.read_struct::<Pair>(0).is_err());
    }

    #[test]
    fn test_read_struct_short_read_is_error() {
        let reader = MockMemoryReader::new(vec![0; 6]);
        assert!(reader.read_struct::<Pair>(0x1000).is_err());
    }

    #[test]
    fn test_read_array() {
        let reader = MockMemoryBuilder::new()
            .write_u16(0, 1)
            .write_u32(4, 10)
            .write_u16(8, 2)
            .write_u32(12, 20)
            .build();

        let pairs: Vec<Pair> = reader.read_array(0x1000, 2).unwrap();
        assert_eq!(pairs, vec![Pair { a: 1, b: 10 }, Pair { a: 2, b: 20 }]);
        assert!(reader.read_array::<Pair>(0x1000, 3).is_err());
        assert!(reader.read_array::<Pair>(0, 0).unwrap().is_empty());
    }

    #[test]
    fn test_read_through_reference() {
        let reader = MockMemoryReader::new(vec![0x2A, 0, 0, 0]);
        let by_ref = &reader;
        assert_eq!(by_ref.read_u32(0x1000).unwrap(), 42);
        assert_eq!(by_ref.base_address(), 0x1000);
    }
}
