//! Chunked copy of the main module image.
//!
//! The game image is tens of megabytes and contains unreadable guard pages,
//! so it is copied in fixed-size chunks rather than one call.

use tracing::debug;

use super::ReadMemory;

/// Default chunk size for module reads (4MB).
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Copy `size` bytes of the main module starting at the reader's base address.
///
/// Unreadable chunks are left zero-filled so offsets inside the returned
/// buffer stay equal to RVAs.
pub fn read_module_image<R: ReadMemory>(reader: &R, size: usize, chunk_size: usize) -> Vec<u8> {
    let base = reader.base_address();
    let mut image = vec![0u8; size];
    let mut skipped = 0usize;

    for (index, chunk) in image.chunks_mut(chunk_size.max(1)).enumerate() {
        let address = base + (index * chunk_size.max(1)) as u64;
        match reader.read_bytes(address, chunk.len()) {
            Ok(data) => chunk.copy_from_slice(&data),
            Err(e) => {
                debug!("Skipping unreadable module chunk at {:#x}: {}", address, e);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        debug!("Module image copied with {} unreadable chunks", skipped);
    }
    image
}
