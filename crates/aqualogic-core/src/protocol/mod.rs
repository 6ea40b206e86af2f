//! AquaLogic Bus Protocol
//!
//! Implements the framed RS-485 protocol spoken by AquaLogic/ProLogic
//! controllers and their keypads.
//!
//! Each frame begins with a DLE (10H) STX (02H) start sequence, followed by a
//! 2 to 61 byte Command/Data field, a 2-byte checksum and a DLE (10H) ETX (03H)
//! end sequence. Any DLE inside the Command/Data field or checksum is followed
//! by an inserted NULL (00H) which the receiver removes.

mod error;
pub mod frame;
pub mod keys;
pub mod serial;
pub mod transport;

use std::time::Duration;

pub use error::{CommandError, ProtocolError};
pub use frame::{encode_frame, key_event_frame, Frame, FrameReader, FrameType};
pub use keys::Key;
pub use serial::{list_ports, open_port, PortInfo};
pub use transport::{ReplayTransport, SerialTransport, TcpTransport, Transport};

/// Data link escape
pub const FRAME_DLE: u8 = 0x10;
/// Start of text, follows DLE at the start of a frame
pub const FRAME_STX: u8 = 0x02;
/// End of text, follows DLE at the end of a frame
pub const FRAME_ETX: u8 = 0x03;

/// Per-byte read timeout and start-of-frame search timeout
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Serial line speed used by the controller bus
pub const SERIAL_BAUD_RATE: u32 = 19200;

/// Delay between transmitting a state change and checking that it took
pub const VERIFY_DELAY: Duration = Duration::from_secs(2);

/// Transmission budget for a state change request
pub const DEFAULT_RETRIES: u32 = 10;

/// Largest de-stuffed frame body accepted before the frame is discarded
pub const MAX_FRAME_LEN: usize = 256;
