//! Protocol errors

use thiserror::Error;

use crate::state::StateBit;

/// Errors that can occur while talking to the controller bus
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The serial port could not be opened or used
    #[error("Serial port error: {0}")]
    SerialError(String),

    /// No byte arrived within the read timeout
    #[error("Read timeout")]
    Timeout,

    /// The adapter could not be reached
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The adapter closed the connection
    #[error("Connection closed by peer")]
    ConnectionClosed,

    /// Bytes kept arriving but none of them started a frame
    #[error("No frame start sequence within the read timeout")]
    FrameTimeout,

    /// The frame's checksum does not match its content
    #[error("Checksum mismatch: expected {expected:#06x}, got {actual:#06x}")]
    ChecksumMismatch {
        /// Sum computed over the received content
        expected: u16,
        /// Checksum carried by the frame
        actual: u16,
    },

    /// The body cannot hold a type and a checksum
    #[error("Frame too short: {0} bytes")]
    FrameTooShort(usize),

    /// No end sequence within the maximum frame length
    #[error("Buffer overflow: frame too large")]
    BufferOverflow,

    /// A stop was requested while waiting for a frame
    #[error("Stopped while waiting for a frame")]
    Stopped,

    /// Any other I/O failure
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ProtocolError {
    /// Frame-level errors are recoverable: the reader skips the frame and
    /// resynchronises on the next start sequence.
    pub fn is_frame_error(&self) -> bool {
        matches!(
            self,
            ProtocolError::FrameTimeout
                | ProtocolError::ChecksumMismatch { .. }
                | ProtocolError::FrameTooShort(_)
                | ProtocolError::BufferOverflow
        )
    }
}

/// Errors returned by the command API
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// No key changes this state
    #[error("State {0} cannot be changed from the keypad")]
    Unsupported(StateBit),
}
