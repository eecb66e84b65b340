mod bytes;
pub mod chunked_reader;
mod handle;
pub mod layout;
pub mod pattern;
pub mod provider;
mod reader;

// Mock memory reader for testing (always available for unit and integration tests)
#[doc(hidden)]
pub mod mock;

pub use bytes::{ByteBuffer, decode_ascii};
pub use chunked_reader::{DEFAULT_CHUNK_SIZE, read_module_image};
pub use handle::*;
pub use provider::{ProcessInfo, ProcessProvider, SystemProcessProvider};
pub use reader::{MemoryReader, ReadMemory, RemoteStruct};

#[doc(hidden)]
pub use mock::{MockMemoryBuilder, MockMemoryReader};
