//! Byte transports the protocol engine talks through.
//!
//! The engine only needs two operations: write a whole frame, and read until
//! the frame delimiter. Timeouts are applied by the caller.

use crate::constants::{MAX_FRAME_BYTES, SOI};
use crate::error::{Jc03Error, Result};
use async_trait::async_trait;
use log::debug;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};

/// Duplex byte channel to a BMS
#[async_trait]
pub trait Transport: Send {
    /// Write `frame` and flush it to the device
    async fn write_frame(&mut self, frame: &[u8]) -> io::Result<()>;

    /// Read bytes up to and including `delimiter`
    async fn read_until(&mut self, delimiter: u8) -> io::Result<Vec<u8>>;
}

/// [`Transport`] over any async byte stream.
///
/// `read_until` is cancel safe: bytes of a frame whose read was abandoned are
/// kept, and the next request discards that frame's remainder before reading
/// the reply.
pub struct StreamTransport<S> {
    stream: BufReader<S>,
    max_frame: usize,
    partial: Vec<u8>,
    resync: bool,
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> StreamTransport<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
            max_frame: MAX_FRAME_BYTES,
            partial: Vec::new(),
            resync: false,
        }
    }

    /// Limit how many bytes may be buffered while looking for a delimiter
    #[must_use]
    pub fn max_frame(mut self, max_frame: usize) -> Self {
        self.max_frame = max_frame;
        self
    }

    /// Drop anything already buffered but not yet read
    pub fn discard_buffered(&mut self) {
        let pending = self.stream.buffer().len();
        self.stream.consume(pending);
    }

    pub fn get_ref(&self) -> &S {
        self.stream.get_ref()
    }

    /// Drop the abandoned frame left by a cancelled read, if any
    fn abandon_partial(&mut self) {
        if !self.partial.is_empty() {
            debug!("Dropping {} bytes of an abandoned frame", self.partial.len());
            self.partial.clear();
            self.resync = true;
        }
    }
}

#[async_trait]
impl<S: AsyncRead + AsyncWrite + Unpin + Send> Transport for StreamTransport<S> {
    async fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.abandon_partial();
        let stream = self.stream.get_mut();
        stream.write_all(frame).await?;
        stream.flush().await
    }

    async fn read_until(&mut self, delimiter: u8) -> io::Result<Vec<u8>> {
        loop {
            let available = self.stream.fill_buf().await?;
            if available.is_empty() {
                let len = self.partial.len();
                self.partial.clear();
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("stream closed after {len} bytes"),
                ));
            }

            if self.resync {
                // Skip the tail of the abandoned frame, stopping at the start of the next one
                let (done, skipped) = match available.iter().position(|&b| b == delimiter || b == SOI) {
                    Some(i) if available[i] == delimiter => (true, i + 1),
                    Some(i) => (true, i),
                    None => (false, available.len()),
                };
                self.stream.consume(skipped);
                self.resync = !done;
                continue;
            }

            let (found, used) = match available.iter().position(|&b| b == delimiter) {
                Some(i) => (true, i + 1),
                None => (false, available.len()),
            };
            self.partial.extend_from_slice(&available[..used]);
            self.stream.consume(used);

            if found {
                return Ok(std::mem::take(&mut self.partial));
            }
            if self.partial.len() > self.max_frame {
                self.partial.clear();
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("no delimiter within {} bytes", self.max_frame),
                ));
            }
        }
    }
}

/// Serial port transport (RS485/RS232 adapter)
pub struct SerialTransport {
    inner: StreamTransport<SerialStream>,
}

impl SerialTransport {
    /// Open `path` at `baud_rate`, 8N1
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .open_native_async()
            .map_err(|source| Jc03Error::Connection {
                path: path.to_string(),
                source,
            })?;

        Ok(Self {
            inner: StreamTransport::new(port),
        })
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        // Anything received before the request belongs to an abandoned reply
        self.inner.discard_buffered();
        self.inner
            .get_ref()
            .clear(tokio_serial::ClearBuffer::Input)
            .map_err(io::Error::from)?;
        self.inner.write_frame(frame).await
    }

    async fn read_until(&mut self, delimiter: u8) -> io::Result<Vec<u8>> {
        self.inner.read_until(delimiter).await
    }
}
