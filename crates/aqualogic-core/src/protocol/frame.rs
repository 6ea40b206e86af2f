//! Frame encoding/decoding
//!
//! Frame format:
//! - 2 bytes: DLE STX
//! - 2 bytes: frame type
//! - N bytes: data
//! - 2 bytes: checksum (big-endian), sum of DLE, STX, type and data
//! - 2 bytes: DLE ETX
//!
//! Every DLE between the start and end sequences, checksum included, is
//! followed by an inserted 0x00 on the wire.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{Key, ProtocolError, Transport, FRAME_DLE, FRAME_ETX, FRAME_STX, MAX_FRAME_LEN, READ_TIMEOUT};

/// Frame types seen on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Local wired panel (black face with service button)
    LocalWiredKeyEvent,
    /// Remote wired panel (white face)
    RemoteWiredKeyEvent,
    /// Wireless remote
    WirelessKeyEvent,
    /// Seems to only work for some keys
    OnOffEvent,
    /// Sent by the controller when keypads may transmit
    KeepAlive,
    /// LED on and flashing masks
    Leds,
    /// One line of display text
    DisplayUpdate,
    /// Display text for newer panels
    LongDisplayUpdate,
    /// Controller asking a variable speed pump for a speed
    PumpSpeedRequest,
    /// Variable speed pump reporting back
    PumpStatus,
    /// Any other type field
    Unknown([u8; 2]),
}

impl FrameType {
    /// Decode the 2-byte type field
    pub fn from_tag(tag: [u8; 2]) -> Self {
        match tag {
            [0x00, 0x02] => FrameType::LocalWiredKeyEvent,
            [0x00, 0x03] => FrameType::RemoteWiredKeyEvent,
            [0x00, 0x83] => FrameType::WirelessKeyEvent,
            [0x00, 0x05] => FrameType::OnOffEvent,
            [0x01, 0x01] => FrameType::KeepAlive,
            [0x01, 0x02] => FrameType::Leds,
            [0x01, 0x03] => FrameType::DisplayUpdate,
            [0x04, 0x0a] => FrameType::LongDisplayUpdate,
            [0x0c, 0x01] => FrameType::PumpSpeedRequest,
            [0x00, 0x0c] => FrameType::PumpStatus,
            other => FrameType::Unknown(other),
        }
    }

    /// The 2-byte type field
    pub fn tag(self) -> [u8; 2] {
        match self {
            FrameType::LocalWiredKeyEvent => [0x00, 0x02],
            FrameType::RemoteWiredKeyEvent => [0x00, 0x03],
            FrameType::WirelessKeyEvent => [0x00, 0x83],
            FrameType::OnOffEvent => [0x00, 0x05],
            FrameType::KeepAlive => [0x01, 0x01],
            FrameType::Leds => [0x01, 0x02],
            FrameType::DisplayUpdate => [0x01, 0x03],
            FrameType::LongDisplayUpdate => [0x04, 0x0a],
            FrameType::PumpSpeedRequest => [0x0c, 0x01],
            FrameType::PumpStatus => [0x00, 0x0c],
            FrameType::Unknown(tag) => tag,
        }
    }
}

/// A decoded, checksum-verified frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Decoded type field
    pub frame_type: FrameType,
    /// Data field, without type, checksum or stuffing
    pub data: Vec<u8>,
}

impl Frame {
    /// Frame with the given type and data field
    pub fn new(frame_type: FrameType, data: Vec<u8>) -> Self {
        Self { frame_type, data }
    }

    /// Decode a de-stuffed body (type, data, checksum) as read between the
    /// start and end sequences
    pub fn from_body(body: &[u8]) -> Result<Self, ProtocolError> {
        if body.len() < 4 {
            return Err(ProtocolError::FrameTooShort(body.len()));
        }

        let (content, crc) = body.split_at(body.len() - 2);
        let received = BigEndian::read_u16(crc);
        let expected = checksum(content);
        if received != expected {
            return Err(ProtocolError::ChecksumMismatch {
                expected,
                actual: received,
            });
        }

        Ok(Self {
            frame_type: FrameType::from_tag([content[0], content[1]]),
            data: content[2..].to_vec(),
        })
    }

    /// Encode the frame for transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        encode_frame(self.frame_type.tag(), &self.data)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {:02x?}", self.frame_type, self.data)
    }
}

/// Checksum over type and data; DLE and STX are included in the sum
pub fn checksum(content: &[u8]) -> u16 {
    content
        .iter()
        .fold(FRAME_DLE as u16 + FRAME_STX as u16, |acc, &b| {
            acc.wrapping_add(b as u16)
        })
}

/// Append bytes, inserting a 0x00 after every DLE
fn append_stuffed(frame: &mut Vec<u8>, data: &[u8]) {
    for &byte in data {
        frame.push(byte);
        if byte == FRAME_DLE {
            frame.push(0);
        }
    }
}

/// Build a complete wire frame from a type and data field
pub fn encode_frame(tag: [u8; 2], data: &[u8]) -> Vec<u8> {
    let mut content = Vec::with_capacity(2 + data.len());
    content.extend_from_slice(&tag);
    content.extend_from_slice(data);

    let mut crc = [0u8; 2];
    BigEndian::write_u16(&mut crc, checksum(&content));

    let mut frame = Vec::with_capacity(content.len() * 2 + 8);
    frame.push(FRAME_DLE);
    frame.push(FRAME_STX);
    append_stuffed(&mut frame, &content);
    append_stuffed(&mut frame, &crc);
    frame.push(FRAME_DLE);
    frame.push(FRAME_ETX);
    frame
}

/// Build the key event frame a keypad sends when `key` is pressed
///
/// Wired keys are sent as a local wired key event carrying the 16-bit code
/// twice. Wireless-only keys go out as a wireless key event: a 0x01 marker,
/// the 32-bit code twice and a trailing 0x00.
pub fn key_event_frame(key: Key) -> Vec<u8> {
    let code = key.code();
    if key.is_wireless() {
        let mut data = [0u8; 10];
        data[0] = 0x01;
        LittleEndian::write_u32(&mut data[1..5], code);
        LittleEndian::write_u32(&mut data[5..9], code);
        encode_frame(FrameType::WirelessKeyEvent.tag(), &data)
    } else {
        let mut data = [0u8; 4];
        LittleEndian::write_u16(&mut data[0..2], code as u16);
        LittleEndian::write_u16(&mut data[2..4], code as u16);
        encode_frame(FrameType::LocalWiredKeyEvent.tag(), &data)
    }
}

/// Pulls frames out of a transport's byte stream
#[derive(Debug, Clone)]
pub struct FrameReader {
    frame_timeout: Duration,
    stop: Option<Arc<AtomicBool>>,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReader {
    /// Reader with the standard start-of-frame search limit
    pub fn new() -> Self {
        Self::with_timeout(READ_TIMEOUT)
    }

    /// Use a different limit for the start-of-frame search
    pub fn with_timeout(frame_timeout: Duration) -> Self {
        Self {
            frame_timeout,
            stop: None,
        }
    }

    /// Abandon the start-of-frame search with [`ProtocolError::Stopped`]
    /// once `stop` is set
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    fn stop_requested(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|stop| stop.load(Ordering::SeqCst))
    }

    /// Read the next frame
    ///
    /// Transport errors are returned as-is and end the session. Frame errors
    /// ([`ProtocolError::is_frame_error`]) only lose the current frame; call
    /// again to resynchronise on the next start sequence.
    pub fn read_frame<T: Transport + ?Sized>(&self, transport: &mut T) -> Result<Frame, ProtocolError> {
        self.find_start(transport)?;
        let body = self.read_body(transport)?;
        Frame::from_body(&body)
    }

    /// Consume bytes up to and including DLE STX
    fn find_start<T: Transport + ?Sized>(&self, transport: &mut T) -> Result<(), ProtocolError> {
        let started = Instant::now();
        let mut byte = transport.read_byte()?;
        loop {
            if self.stop_requested() {
                return Err(ProtocolError::Stopped);
            }
            if started.elapsed() > self.frame_timeout {
                return Err(ProtocolError::FrameTimeout);
            }
            if byte == FRAME_DLE {
                let next = transport.read_byte()?;
                if next == FRAME_STX {
                    return Ok(());
                }
                // The byte after a lone DLE may itself start a frame
                byte = next;
                continue;
            }
            byte = transport.read_byte()?;
        }
    }

    /// Consume and de-stuff bytes up to and including DLE ETX
    fn read_body<T: Transport + ?Sized>(&self, transport: &mut T) -> Result<Vec<u8>, ProtocolError> {
        let mut body = Vec::new();
        loop {
            let byte = transport.read_byte()?;
            if byte == FRAME_DLE {
                let next = transport.read_byte()?;
                match next {
                    FRAME_ETX => return Ok(body),
                    0 => {}
                    // Should be ETX or 0; keep the DLE and drop the stray byte
                    other => tracing::debug!("Unexpected byte {:#04x} after DLE", other),
                }
            }
            if body.len() >= MAX_FRAME_LEN {
                return Err(ProtocolError::BufferOverflow);
            }
            body.push(byte);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ReplayTransport;

    fn decode(bytes: &[u8]) -> Result<Frame, ProtocolError> {
        FrameReader::new().read_frame(&mut ReplayTransport::new(bytes.to_vec()))
    }

    #[test]
    fn test_keep_alive_bytes() {
        let bytes = encode_frame(FrameType::KeepAlive.tag(), &[]);
        assert_eq!(bytes, vec![0x10, 0x02, 0x01, 0x01, 0x00, 0x14, 0x10, 0x03]);
    }

    #[test]
    fn test_wired_key_bytes() {
        let bytes = key_event_frame(Key::Filter);
        assert_eq!(
            bytes,
            vec![0x10, 0x02, 0x00, 0x02, 0x80, 0x00, 0x80, 0x00, 0x01, 0x14, 0x10, 0x03]
        );
    }

    #[test]
    fn test_wired_key_roundtrip_with_dle() {
        // MINUS is 0x0010, so every code byte pair needs stuffing
        let bytes = key_event_frame(Key::Minus);
        assert_eq!(
            bytes,
            vec![
                0x10, 0x02, 0x00, 0x02, 0x10, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x34, 0x10,
                0x03
            ]
        );

        let frame = decode(&bytes).unwrap();
        assert_eq!(frame.frame_type, FrameType::LocalWiredKeyEvent);
        assert_eq!(frame.data, vec![0x10, 0x00, 0x10, 0x00]);
    }

    #[test]
    fn test_wireless_key_roundtrip() {
        let bytes = key_event_frame(Key::Aux8);
        let frame = decode(&bytes).unwrap();
        assert_eq!(frame.frame_type, FrameType::WirelessKeyEvent);
        assert_eq!(
            frame.data,
            vec![0x01, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00]
        );
        assert_eq!(LittleEndian::read_u32(&frame.data[1..5]), Key::Aux8.code());
    }

    #[test]
    fn test_checksum_with_dle_is_stuffed() {
        // Sum is exactly 0x1000, so the checksum's high byte is a DLE
        let mut data = vec![0xFF; 13];
        data.push(0xFD);
        let bytes = encode_frame([0xFF, 0xFF], &data);
        assert!(bytes.ends_with(&[0xFD, 0x10, 0x00, 0x00, 0x10, 0x03]));

        let frame = decode(&bytes).unwrap();
        assert_eq!(frame.frame_type, FrameType::Unknown([0xFF, 0xFF]));
        assert_eq!(frame.data, data);
    }

    #[test]
    fn test_skips_noise_before_start() {
        let mut bytes = vec![0x00, 0x10, 0x05, 0x42, 0x10];
        bytes.extend(encode_frame(FrameType::KeepAlive.tag(), &[]));
        let frame = decode(&bytes).unwrap();
        assert_eq!(frame.frame_type, FrameType::KeepAlive);
    }

    #[test]
    fn test_single_bit_corruption_detected() {
        let good = encode_frame(
            FrameType::Leds.tag(),
            &[0x28, 0x00, 0x00, 0x00, 0x20, 0x00, 0x00, 0x00],
        );
        assert!(decode(&good).is_ok());

        // Everything between DLE STX and DLE ETX
        for pos in 2..good.len() - 2 {
            for bit in 0..8 {
                let mut bad = good.clone();
                bad[pos] ^= 1 << bit;
                let result = decode(&bad);
                assert!(
                    matches!(&result, Err(e) if e.is_frame_error()),
                    "corruption at byte {} bit {} not detected: {:?}",
                    pos,
                    bit,
                    result
                );
            }
        }
    }

    #[test]
    fn test_short_body_rejected() {
        let bytes = vec![0x10, 0x02, 0x01, 0x10, 0x03];
        assert!(matches!(decode(&bytes), Err(ProtocolError::FrameTooShort(1))));
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut bytes = vec![0x10, 0x02];
        bytes.extend(std::iter::repeat(0x55).take(MAX_FRAME_LEN + 1));
        bytes.extend([0x10, 0x03]);
        assert!(matches!(decode(&bytes), Err(ProtocolError::BufferOverflow)));
    }

    #[test]
    fn test_stray_byte_after_dle_dropped() {
        // DLE 0x07 in the body keeps the DLE and loses the 0x07
        let content = [0x01, 0x03, 0x10];
        let crc = checksum(&content);
        let bytes = vec![
            0x10, 0x02, 0x01, 0x03, 0x10, 0x07, (crc >> 8) as u8, crc as u8, 0x10, 0x03,
        ];
        let frame = decode(&bytes).unwrap();
        assert_eq!(frame.frame_type, FrameType::DisplayUpdate);
        assert_eq!(frame.data, vec![0x10]);
    }

    #[test]
    fn test_frame_type_tags_roundtrip() {
        for tag in [[0x00, 0x02], [0x01, 0x01], [0x04, 0x0a], [0x00, 0x0c], [0x7f, 0x7f]] {
            assert_eq!(FrameType::from_tag(tag).tag(), tag);
        }
    }

    #[test]
    fn test_stop_flag_ends_start_search() {
        let stop = Arc::new(AtomicBool::new(true));
        let reader = FrameReader::new().with_stop_flag(Arc::clone(&stop));
        let mut noise = ReplayTransport::new(vec![0x55; 64]);
        assert!(matches!(
            reader.read_frame(&mut noise),
            Err(ProtocolError::Stopped)
        ));

        stop.store(false, Ordering::SeqCst);
        let mut input = ReplayTransport::new(encode_frame(FrameType::KeepAlive.tag(), &[]));
        assert!(reader.read_frame(&mut input).is_ok());
    }

    #[test]
    fn test_transport_error_propagates() {
        let result = decode(&[0x10, 0x02, 0x01]);
        assert!(matches!(result, Err(ProtocolError::ConnectionClosed)));
    }
}
