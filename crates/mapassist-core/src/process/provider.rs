//! Process discovery behind traits, so attach logic can be driven by mocks.

use crate::error::Result;
use crate::process::handle::{DEFAULT_PROCESS_NAME, ProcessHandle};

/// Properties of an attached process.
pub trait ProcessInfo {
    fn pid(&self) -> u32;

    /// Base address of the main module.
    fn base_address(&self) -> u64;

    fn module_size(&self) -> u32;

    fn is_alive(&self) -> bool;
}

/// Finds and opens the game process.
pub trait ProcessProvider {
    type Process: ProcessInfo;

    fn find_process(&self) -> Result<Self::Process>;

    fn open_process(&self, pid: u32) -> Result<Self::Process>;
}

/// Provider backed by the OS process list.
#[derive(Debug, Clone)]
pub struct SystemProcessProvider {
    process_name: String,
}

impl SystemProcessProvider {
    pub fn new(process_name: impl Into<String>) -> Self {
        Self {
            process_name: process_name.into(),
        }
    }

    pub fn process_name(&self) -> &str {
        &self.process_name
    }
}

impl Default for SystemProcessProvider {
    fn default() -> Self {
        Self::new(DEFAULT_PROCESS_NAME)
    }
}

impl ProcessProvider for SystemProcessProvider {
    type Process = ProcessHandle;

    fn find_process(&self) -> Result<ProcessHandle> {
        ProcessHandle::find_and_open(&self.process_name)
    }

    fn open_process(&self, pid: u32) -> Result<ProcessHandle> {
        ProcessHandle::open(pid)
    }
}
