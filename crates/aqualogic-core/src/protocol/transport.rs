//! Byte transports feeding the frame reader
//!
//! The controller bus is reached either through an RS-485 to Ethernet adapter
//! (TCP) or a local RS-485 serial adapter. Both present the same contract: one
//! byte at a time with a fixed timeout, and writes that are flushed before
//! returning. Reconnecting is the caller's business.

use serialport::SerialPort;
use std::collections::VecDeque;
use std::io::{self, BufReader, Read, Write};
use std::net::TcpStream;
use std::sync::{Arc, Mutex, PoisonError};

use super::serial::open_port;
use super::{ProtocolError, READ_TIMEOUT};

/// Abstraction over the physical link to the controller bus
pub trait Transport: Send {
    /// Read a single byte, failing with [`ProtocolError::Timeout`] when
    /// nothing arrives within the read timeout
    fn read_byte(&mut self) -> Result<u8, ProtocolError>;

    /// Write the bytes and wait until they have left the host
    fn write(&mut self, data: &[u8]) -> Result<(), ProtocolError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read_byte(&mut self) -> Result<u8, ProtocolError> {
        (**self).read_byte()
    }

    fn write(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        (**self).write(data)
    }
}

/// Read one byte from a buffered reader, mapping timeouts and EOF
fn read_one<R: Read>(reader: &mut R) -> Result<u8, ProtocolError> {
    let mut buf = [0u8; 1];
    loop {
        return match reader.read(&mut buf) {
            Ok(0) => Err(ProtocolError::ConnectionClosed),
            Ok(_) => Ok(buf[0]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e)
                if e.kind() == io::ErrorKind::TimedOut
                    || e.kind() == io::ErrorKind::WouldBlock =>
            {
                Err(ProtocolError::Timeout)
            }
            Err(e) => Err(ProtocolError::IoError(e)),
        };
    }
}

/// TCP transport for RS-485 to Ethernet adapters
pub struct TcpTransport {
    stream: BufReader<TcpStream>,
}

impl TcpTransport {
    /// Connect to the adapter at `host:port`
    pub fn connect(host: &str, port: u16) -> Result<Self, ProtocolError> {
        let stream = TcpStream::connect((host, port))
            .map_err(|e| ProtocolError::ConnectionFailed(format!("{}:{}: {}", host, port, e)))?;
        stream.set_read_timeout(Some(READ_TIMEOUT))?;
        stream.set_nodelay(true)?;
        tracing::info!("Connected to {}:{}", host, port);
        Ok(Self::new(stream))
    }

    /// Wrap an already connected stream; the caller owns its timeouts
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }
}

impl Transport for TcpTransport {
    fn read_byte(&mut self) -> Result<u8, ProtocolError> {
        read_one(&mut self.stream)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        let stream = self.stream.get_mut();
        stream.write_all(data)?;
        stream.flush()?;
        Ok(())
    }
}

/// Serial transport for a local RS-485 adapter
pub struct SerialTransport {
    port: BufReader<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// Open the serial device at `path` with the bus line settings
    pub fn open(path: &str) -> Result<Self, ProtocolError> {
        let port = open_port(path)?;
        tracing::info!("Opened serial port {}", path);
        Ok(Self::new(port))
    }

    /// Wrap an already configured port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self {
            port: BufReader::new(port),
        }
    }
}

impl Transport for SerialTransport {
    fn read_byte(&mut self) -> Result<u8, ProtocolError> {
        read_one(&mut self.port)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        let port = self.port.get_mut();
        port.write_all(data)
            .map_err(|e| ProtocolError::SerialError(e.to_string()))?;
        port.flush()
            .map_err(|e| ProtocolError::SerialError(e.to_string()))
    }
}

/// In-memory transport replaying a captured byte stream
///
/// Reads drain the queued input and report [`ProtocolError::ConnectionClosed`]
/// once it is exhausted. Everything written is appended to a shared buffer
/// obtained through [`ReplayTransport::written`].
#[derive(Debug, Default)]
pub struct ReplayTransport {
    input: VecDeque<u8>,
    written: Arc<Mutex<Vec<u8>>>,
}

impl ReplayTransport {
    /// Create a transport that will replay `input`
    pub fn new(input: impl Into<Vec<u8>>) -> Self {
        Self {
            input: input.into().into(),
            written: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue more bytes to be read
    pub fn push(&mut self, data: &[u8]) {
        self.input.extend(data.iter().copied());
    }

    /// Number of bytes left to read
    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    /// Handle on everything written so far
    pub fn written(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.written)
    }
}

impl Transport for ReplayTransport {
    fn read_byte(&mut self) -> Result<u8, ProtocolError> {
        self.input.pop_front().ok_or(ProtocolError::ConnectionClosed)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
        Ok(())
    }
}
