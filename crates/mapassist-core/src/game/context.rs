use crate::error::{Error, Result};
use crate::offset::{OffsetName, ResolvedOffsets};
use crate::process::ReadMemory;
use crate::process::layout::session;
use crate::unit::UnitGraph;

/// Everything needed to read one attached game process.
///
/// Lives exactly as long as the attach; a new context is created when the
/// game restarts.
pub struct GameContext<R: ReadMemory> {
    reader: R,
    offsets: ResolvedOffsets,
    process_id: u32,
}

impl<R: ReadMemory> GameContext<R> {
    pub fn new(reader: R, offsets: ResolvedOffsets, process_id: u32) -> Self {
        Self {
            reader,
            offsets,
            process_id,
        }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn offsets(&self) -> &ResolvedOffsets {
        &self.offsets
    }

    pub fn process_id(&self) -> u32 {
        self.process_id
    }

    /// Absolute address of a root, or `None` if it was not resolved.
    pub fn address(&self, name: OffsetName) -> Option<u64> {
        self.offsets.address(self.reader.base_address(), name)
    }

    fn required(&self, name: OffsetName) -> Result<u64> {
        self.address(name)
            .ok_or_else(|| Error::InvalidOffset(format!("{} is not resolved", name)))
    }

    pub fn unit_graph(&self) -> Result<UnitGraph<&R>> {
        Ok(UnitGraph::new(
            &self.reader,
            self.required(OffsetName::UnitHashTable)?,
        ))
    }

    /// Whether the running character is an expansion character.
    pub fn is_expansion(&self) -> Result<bool> {
        let address = self.required(OffsetName::ExpansionCheck)?;
        Ok(self.reader.read_u8(address)? == 1)
    }

    /// Whether the in-game automap is shown. `false` if the flag is unknown.
    pub fn map_shown(&self) -> Result<bool> {
        match self.address(OffsetName::UiMapFlag) {
            Some(address) => Ok(self.reader.read_u8(address)? != 0),
            None => Ok(false),
        }
    }

    /// IP of the game server. Empty if the offset is unknown.
    pub fn game_ip(&self) -> Result<String> {
        match self.address(OffsetName::GameIpOffset) {
            Some(address) => self
                .reader
                .read_ascii(address + session::GAME_IP, session::GAME_IP_LEN),
            None => Ok(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::MockMemoryBuilder;

    #[test]
    fn test_optional_roots() {
        let reader = MockMemoryBuilder::new()
            .write_u8(0x10, 1)
            .write_u8(0x11, 1)
            .write_ascii(0x20, "10.0.0.7")
            .with_size(0x80)
            .build();
        let ctx = GameContext::new(
            reader,
            ResolvedOffsets {
                expansion_check: 0x10,
                ui_map_flag: 0x11,
                game_ip: 0x20,
                ..Default::default()
            },
            42,
        );

        assert!(ctx.is_expansion().unwrap());
        assert!(ctx.map_shown().unwrap());
        assert_eq!(ctx.game_ip().unwrap(), "10.0.0.7");
        assert!(ctx.unit_graph().is_err());
        assert_eq!(ctx.process_id(), 42);
    }

    #[test]
    fn test_unknown_optional_roots_default() {
        let ctx = GameContext::new(MockMemoryBuilder::new().build(), ResolvedOffsets::default(), 1);
        assert!(!ctx.map_shown().unwrap());
        assert_eq!(ctx.game_ip().unwrap(), "");
        assert!(ctx.is_expansion().is_err());
    }
}
