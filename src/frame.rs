//! Wire frame format: `[type:u8][length:u32 big-endian][payload:length bytes]`
//!
//! Every message between the host and the extension-manager process travels in
//! one frame. The payload of a `Data` frame is a serialized [`IpcMessage`].
//!
//! [`IpcMessage`]: crate::protocol::IpcMessage

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::HostError;

/// Frame types for the wire protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    Data = 0x01,
    Error = 0x02,
    Close = 0x03,
}

impl TryFrom<u8> for FrameType {
    type Error = HostError;
    fn try_from(value: u8) -> Result<Self, <Self as TryFrom<u8>>::Error> {
        match value {
            0x01 => Ok(Self::Data),
            0x02 => Ok(Self::Error),
            0x03 => Ok(Self::Close),
            _ => Err(HostError::Frame(format!(
                "Unknown frame type: 0x{:02x}",
                value
            ))),
        }
    }
}

/// Maximum payload size: 16 MiB
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;
const HEADER_SIZE: usize = 5;

/// A framed message on the wire.
#[derive(Debug, Clone)]
pub struct Frame {
    pub frame_type: FrameType,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a new data frame
    pub fn data(payload: Vec<u8>) -> Self {
        Self {
            frame_type: FrameType::Data,
            payload,
        }
    }

    /// Create an error frame
    pub fn error(message: &str) -> Self {
        Self {
            frame_type: FrameType::Error,
            payload: message.as_bytes().to_vec(),
        }
    }

    /// Create a close frame
    pub fn close() -> Self {
        Self {
            frame_type: FrameType::Close,
            payload: Vec::new(),
        }
    }

    /// Encode this frame into bytes for the wire.
    pub fn encode(&self) -> Result<Vec<u8>, HostError> {
        let len = self.payload.len() as u32;
        if len > MAX_PAYLOAD_SIZE {
            return Err(HostError::Frame(format!(
                "Payload too large: {} bytes (max {})",
                len, MAX_PAYLOAD_SIZE
            )));
        }
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.payload.len());
        buf.put_u8(self.frame_type as u8);
        buf.put_u32(len);
        buf.put_slice(&self.payload);
        Ok(buf.to_vec())
    }

    /// Decode a frame from bytes.
    /// Returns the frame and the number of bytes consumed, or None if incomplete.
    pub fn decode(buf: &[u8]) -> Result<Option<(Self, usize)>, HostError> {
        if buf.len() < HEADER_SIZE {
            return Ok(None);
        }
        let frame_type = FrameType::try_from(buf[0])?;
        let len = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);
        if len > MAX_PAYLOAD_SIZE {
            return Err(HostError::Frame(format!(
                "Payload too large: {} bytes (max {})",
                len, MAX_PAYLOAD_SIZE
            )));
        }
        let total = HEADER_SIZE + len as usize;
        if buf.len() < total {
            return Ok(None);
        }
        let payload = buf[HEADER_SIZE..total].to_vec();
        Ok(Some((
            Self {
                frame_type,
                payload,
            },
            total,
        )))
    }
}

/// Reads whole frames from any async byte stream.
pub struct FrameReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read the next frame. Returns `None` on clean EOF at a frame boundary.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, HostError> {
        let mut header = [0u8; HEADER_SIZE];
        match self.inner.read_exact(&mut header).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(HostError::Frame(e.to_string())),
        }

        let frame_type = FrameType::try_from(header[0])?;
        let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
        if len > MAX_PAYLOAD_SIZE {
            return Err(HostError::Frame(format!(
                "Payload too large: {} bytes (max {})",
                len, MAX_PAYLOAD_SIZE
            )));
        }

        let mut payload = vec![0u8; len as usize];
        self.inner
            .read_exact(&mut payload)
            .await
            .map_err(|e| HostError::Frame(e.to_string()))?;

        Ok(Some(Frame {
            frame_type,
            payload,
        }))
    }
}

/// Writes whole frames to any async byte stream.
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), HostError> {
        let bytes = frame.encode()?;
        self.inner
            .write_all(&bytes)
            .await
            .map_err(|e| HostError::Frame(e.to_string()))?;
        self.inner
            .flush()
            .await
            .map_err(|e| HostError::Frame(e.to_string()))
    }
}
