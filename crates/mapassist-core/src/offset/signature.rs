use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::offset::OffsetName;

/// A byte pattern around an instruction with a RIP-relative operand.
///
/// The target RVA is `match + instr_offset + instr_len + disp32`, with the
/// displacement read at `match + instr_offset + disp_offset`. When `deref` is
/// set the resolved slot holds a pointer and the value it points to, relative
/// to the module base, becomes the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSignature {
    pub pattern: String,
    pub instr_offset: usize,
    pub disp_offset: usize,
    pub instr_len: usize,
    #[serde(default)]
    pub deref: bool,
    #[serde(default)]
    pub addend: i64,
}

impl CodeSignature {
    pub fn new(pattern: &str, instr_offset: usize, disp_offset: usize, instr_len: usize) -> Self {
        Self {
            pattern: pattern.to_string(),
            instr_offset,
            disp_offset,
            instr_len,
            deref: false,
            addend: 0,
        }
    }

    pub fn pattern_bytes(&self) -> Result<Vec<Option<u8>>> {
        parse_pattern(&self.pattern)
    }

    /// Compute the target RVA from a match position inside the module image.
    pub fn resolve_in_image(&self, image: &[u8], match_rva: usize) -> Result<u64> {
        let disp_at = match_rva + self.instr_offset + self.disp_offset;
        let disp = image
            .get(disp_at..disp_at + 4)
            .and_then(|b| b.try_into().ok())
            .map(i32::from_le_bytes)
            .ok_or_else(|| {
                Error::InvalidOffset(format!("Displacement at {:#x} is out of the image", disp_at))
            })?;

        let next_ip = (match_rva + self.instr_offset + self.instr_len) as i64;
        let target = next_ip + disp as i64 + self.addend;
        u64::try_from(target)
            .map_err(|_| Error::InvalidOffset(format!("Negative target RVA {}", target)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffsetSignatureEntry {
    pub name: String,
    pub signatures: Vec<CodeSignature>,
}

impl OffsetSignatureEntry {
    /// The logical root this entry resolves, if the name is known.
    pub fn offset_name(&self) -> Option<OffsetName> {
        self.name.parse().ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffsetSignatureSet {
    pub version: String,
    pub entries: Vec<OffsetSignatureEntry>,
}

impl OffsetSignatureSet {
    pub fn entry(&self, name: &str) -> Option<&OffsetSignatureEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
    }
}

pub fn load_signatures<P: AsRef<Path>>(path: P) -> Result<OffsetSignatureSet> {
    let content = fs::read_to_string(&path)?;
    let data = serde_json::from_str(&content)?;
    Ok(data)
}

pub fn save_signatures<P: AsRef<Path>>(path: P, signatures: &OffsetSignatureSet) -> Result<()> {
    let content = serde_json::to_string_pretty(signatures)?;
    fs::write(path, content)?;
    Ok(())
}

/// Parse a space separated hex pattern. `?` and `??` are wildcards.
pub fn parse_pattern(pattern: &str) -> Result<Vec<Option<u8>>> {
    let mut bytes = Vec::new();
    for token in pattern.split_whitespace() {
        if token == "??" || token == "?" {
            bytes.push(None);
            continue;
        }

        let value = u8::from_str_radix(token, 16).map_err(|e| {
            Error::InvalidOffset(format!("Invalid signature token '{}': {}", token, e))
        })?;
        bytes.push(Some(value));
    }

    if bytes.is_empty() {
        return Err(Error::InvalidOffset(
            "Signature pattern is empty".to_string(),
        ));
    }

    Ok(bytes)
}

pub fn format_pattern(bytes: &[Option<u8>]) -> String {
    bytes
        .iter()
        .map(|b| match b {
            Some(value) => format!("{:02X}", value),
            None => "??".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn entry(name: OffsetName, signatures: Vec<CodeSignature>) -> OffsetSignatureEntry {
    OffsetSignatureEntry {
        name: name.to_string(),
        signatures,
    }
}

pub fn builtin_signatures() -> OffsetSignatureSet {
    OffsetSignatureSet {
        version: "*".to_string(),
        entries: vec![
            // push rdi; sub rsp, ?; xor edi, edi; lea rax, [rip+disp]
            entry(
                OffsetName::UnitHashTable,
                vec![
                    CodeSignature::new("57 48 83 EC ?? 33 FF 48 8D 05", 7, 3, 7),
                    CodeSignature::new("48 8D ?? ?? ?? ?? ?? 8B D1", 0, 3, 7),
                ],
            ),
            // test bpl, bpl; sete byte ptr [rip+disp]
            entry(
                OffsetName::UiMapFlag,
                vec![CodeSignature::new("40 84 ED 0F 94 05", 3, 3, 7)],
            ),
            entry(
                OffsetName::GameIpOffset,
                vec![CodeSignature::new("48 8D 0D ?? ?? ?? ?? 44 88 2D", 0, 3, 7)],
            ),
            entry(
                OffsetName::MenuDataOffset,
                vec![CodeSignature::new("8B 05 ?? ?? ?? ?? 89 44 24 20 74 07", 0, 2, 6)],
            ),
            entry(
                OffsetName::RosterDataOffset,
                // disp32 ends with the literal 0x02
                vec![CodeSignature::new("?? ?? ?? 02 45 33 D2 4D 8B", 0, 0, 4)],
            ),
            entry(
                OffsetName::ExpansionCheck,
                vec![CodeSignature::new("48 8B 05 ?? ?? ?? ?? 48 8B D9 F3 0F 10 50", 0, 3, 7)],
            ),
        ],
    }
}
