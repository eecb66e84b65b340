use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Failed to open process: {0}")]
    ProcessOpenFailed(String),

    #[error("Process {0} has exited")]
    ProcessExited(u32),

    #[error("Failed to read process memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u64, message: String },

    #[error("Pattern not found: {0}")]
    PatternNotFound(String),

    #[error("Invalid offset: {0}")]
    InvalidOffset(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Geometry server unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("Geometry server protocol error: {0}")]
    CollaboratorProtocol(String),

    #[error("Config parse error: {0}")]
    ConfigParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn read_failed(address: u64, message: impl Into<String>) -> Self {
        Error::MemoryReadFailed {
            address,
            message: message.into(),
        }
    }

    /// Failures that only cost the current frame or request.
    ///
    /// The caller drops whatever it was building and tries again on the next
    /// cycle. Everything else is either fatal at startup or means the target
    /// process is gone.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::MemoryReadFailed { .. }
                | Error::InvalidSnapshot(_)
                | Error::CollaboratorProtocol(_)
                | Error::Json(_)
        )
    }

    /// Errors that must stop the program before the render loop starts.
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            Error::CollaboratorUnavailable(_) | Error::ConfigParseError(_)
        )
    }
}
