//! Locating version-specific root pointers in the game module.

mod collection;
mod loader;
mod resolver;
mod signature;

pub use collection::{OffsetName, ResolvedOffsets};
pub use loader::{load_offsets, save_offsets};
pub use resolver::{
    OffsetResolver, OffsetSource, SignatureScan, StaticOffsets, resolve_signature,
};
pub use signature::{
    CodeSignature, OffsetSignatureEntry, OffsetSignatureSet, builtin_signatures, format_pattern,
    load_signatures, parse_pattern, save_signatures,
};
