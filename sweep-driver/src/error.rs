use std::io;
use sweep_data::DeviceState;

pub type Result<T> = std::result::Result<T, SweepError>;

#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    /// The transport could not be opened or is no longer usable.
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Operation timed out")]
    Timeout,

    #[error("Checksum mismatched. Calculated = {calculated:02X}, expected = {expected:02X}.")]
    Checksum { expected: u8, calculated: u8 },

    #[error("Malformed frame: {0}")]
    Frame(String),

    #[error("Cannot {operation} while the session is {state}")]
    InvalidState {
        operation: &'static str,
        state: DeviceState,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported firmware version {major}.{minor}")]
    IncompatibleDevice { major: u8, minor: u8 },

    /// The device reported a fault or the session entered the error state.
    #[error("Device error: {0}")]
    Device(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl SweepError {
    /// Codec noise that the reader absorbs by resynchronizing.
    pub fn is_protocol_noise(&self) -> bool {
        matches!(self, SweepError::Checksum { .. } | SweepError::Frame(_))
    }

    /// Failures of the link itself; these move a session to the error state.
    pub fn is_transport_fault(&self) -> bool {
        matches!(
            self,
            SweepError::Connection(_) | SweepError::Io(_) | SweepError::Serial(_)
        )
    }
}
