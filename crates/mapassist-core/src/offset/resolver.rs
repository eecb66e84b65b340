use std::path::Path;
use std::sync::OnceLock;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::offset::{
    CodeSignature, OffsetName, OffsetSignatureSet, ResolvedOffsets, builtin_signatures,
    format_pattern, load_offsets,
};
use crate::process::pattern::find_signature;
use crate::process::{DEFAULT_CHUNK_SIZE, ReadMemory, read_module_image};

/// Anything that can produce the root offsets for an attached process.
pub trait OffsetSource: Send + Sync {
    fn resolve(&self, reader: &dyn ReadMemory) -> Result<ResolvedOffsets>;
}

/// Find one signature in a module image and return the RVA it points at.
pub fn resolve_signature(image: &[u8], signature: &CodeSignature) -> Result<u64> {
    let pattern = signature.pattern_bytes()?;
    let match_rva = find_signature(image, &pattern)
        .ok_or_else(|| Error::PatternNotFound(format_pattern(&pattern)))?;
    signature.resolve_in_image(image, match_rva)
}

/// Resolves offsets by scanning a copy of the main module.
pub struct SignatureScan {
    signatures: OffsetSignatureSet,
    module_size: usize,
    chunk_size: usize,
}

impl SignatureScan {
    pub fn new(module_size: usize) -> Self {
        Self::with_signatures(builtin_signatures(), module_size)
    }

    pub fn with_signatures(signatures: OffsetSignatureSet, module_size: usize) -> Self {
        Self {
            signatures,
            module_size,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    fn resolve_entry(
        &self,
        reader: &dyn ReadMemory,
        image: &[u8],
        signatures: &[CodeSignature],
    ) -> Option<u64> {
        for signature in signatures {
            let rva = match resolve_signature(image, signature) {
                Ok(rva) => rva,
                Err(e) => {
                    debug!("Signature '{}' did not resolve: {}", signature.pattern, e);
                    continue;
                }
            };

            if !signature.deref {
                return Some(rva);
            }

            let base = reader.base_address();
            match reader.read_ptr(base + rva) {
                Ok(ptr) if ptr > base => return Some(ptr - base),
                Ok(ptr) => debug!("Dereferenced pointer {:#x} is below module base", ptr),
                Err(e) => debug!("Dereference at {:#x} failed: {}", base + rva, e),
            }
        }
        None
    }
}

impl OffsetSource for SignatureScan {
    fn resolve(&self, reader: &dyn ReadMemory) -> Result<ResolvedOffsets> {
        let image = read_module_image(&reader, self.module_size, self.chunk_size);
        let mut offsets = ResolvedOffsets {
            version: self.signatures.version.clone(),
            ..Default::default()
        };

        for entry in &self.signatures.entries {
            let Some(name) = entry.offset_name() else {
                warn!("Unknown offset name in signature set: '{}'", entry.name);
                continue;
            };

            match self.resolve_entry(reader, &image, &entry.signatures) {
                Some(rva) => {
                    info!("Resolved {} at {:#x}", name, rva);
                    offsets.set(name, rva);
                }
                None if name.is_required() => {
                    return Err(Error::PatternNotFound(name.to_string()));
                }
                None => warn!("Could not resolve optional offset {}", name),
            }
        }

        for name in offsets.missing() {
            if name.is_required() {
                return Err(Error::PatternNotFound(name.to_string()));
            }
        }

        Ok(offsets)
    }
}

/// Offsets supplied by configuration instead of a scan.
#[derive(Debug, Clone)]
pub struct StaticOffsets {
    offsets: ResolvedOffsets,
}

impl StaticOffsets {
    pub fn new(offsets: ResolvedOffsets) -> Self {
        Self { offsets }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(load_offsets(path)?))
    }
}

impl OffsetSource for StaticOffsets {
    fn resolve(&self, _reader: &dyn ReadMemory) -> Result<ResolvedOffsets> {
        if !self.offsets.is_valid() {
            let missing: Vec<String> = self
                .offsets
                .missing()
                .into_iter()
                .filter(|n| OffsetName::is_required(*n))
                .map(|n| n.to_string())
                .collect();
            return Err(Error::InvalidOffset(format!(
                "Static offsets are missing {}",
                missing.join(", ")
            )));
        }
        Ok(self.offsets.clone())
    }
}

/// Memoizes one [`OffsetSource`] for the lifetime of an attach.
///
/// Create a new resolver (or call [`OffsetResolver::invalidate`]) when
/// re-attaching; the module base and even the game build may differ.
pub struct OffsetResolver {
    source: Box<dyn OffsetSource>,
    resolved: OnceLock<ResolvedOffsets>,
}

impl OffsetResolver {
    pub fn new(source: impl OffsetSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            resolved: OnceLock::new(),
        }
    }

    pub fn resolve(&self, reader: &dyn ReadMemory) -> Result<&ResolvedOffsets> {
        if let Some(offsets) = self.resolved.get() {
            return Ok(offsets);
        }
        let offsets = self.source.resolve(reader)?;
        Ok(self.resolved.get_or_init(|| offsets))
    }

    pub fn cached(&self) -> Option<&ResolvedOffsets> {
        self.resolved.get()
    }

    pub fn invalidate(&mut self) {
        self.resolved = OnceLock::new();
    }
}
