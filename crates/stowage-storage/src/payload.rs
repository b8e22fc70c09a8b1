//! Upload content in the shapes callers hand it over.

use bytes::Bytes;
use std::fmt;
use std::pin::Pin;
use stowage_core::{AttachmentError, AttachmentResult};
use tokio::io::{AsyncRead, AsyncReadExt};

const PREALLOCATE_LIMIT: u64 = 8 * 1024 * 1024;

/// Readable source of attachment content
pub type ContentReader = Pin<Box<dyn AsyncRead + Send>>;

/// Content of an attachment upload.
///
/// A buffer already knows its length. A stream may carry a declared length
/// (`Sized`) or be read to its end (`Stream`). Every variant is normalized to a
/// single buffer with a known length before it reaches the backend.
pub enum BinaryPayload {
    Buffer(Bytes),
    Sized { len: u64, reader: ContentReader },
    Stream(ContentReader),
}

impl BinaryPayload {
    pub fn sized(len: u64, reader: impl AsyncRead + Send + 'static) -> Self {
        Self::Sized {
            len,
            reader: Box::pin(reader),
        }
    }

    pub fn stream(reader: impl AsyncRead + Send + 'static) -> Self {
        Self::Stream(Box::pin(reader))
    }

    /// Length known without reading, if any
    pub fn declared_len(&self) -> Option<u64> {
        match self {
            Self::Buffer(bytes) => Some(bytes.len() as u64),
            Self::Sized { len, .. } => Some(*len),
            Self::Stream(_) => None,
        }
    }

    /// Read the payload into one buffer.
    ///
    /// Fails with a validation error when a sized stream yields more or fewer
    /// bytes than it declared, and with an I/O error when the reader fails.
    pub async fn into_bytes(self) -> AttachmentResult<Bytes> {
        match self {
            Self::Buffer(bytes) => Ok(bytes),
            Self::Sized { len, reader } => {
                let mut buffer = Vec::with_capacity(len.min(PREALLOCATE_LIMIT) as usize);
                // one extra byte is enough to detect an over-long stream
                reader
                    .take(len.saturating_add(1))
                    .read_to_end(&mut buffer)
                    .await?;

                let read = buffer.len() as u64;
                if read != len {
                    return Err(AttachmentError::Validation(format!(
                        "Content length mismatch: declared {} bytes, stream {}",
                        len,
                        if read > len {
                            "is longer".to_string()
                        } else {
                            format!("ended after {} bytes", read)
                        }
                    )));
                }
                Ok(Bytes::from(buffer))
            }
            Self::Stream(mut reader) => {
                let mut buffer = Vec::new();
                reader.read_to_end(&mut buffer).await?;
                Ok(Bytes::from(buffer))
            }
        }
    }
}

impl fmt::Debug for BinaryPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffer(bytes) => f.debug_tuple("Buffer").field(&bytes.len()).finish(),
            Self::Sized { len, .. } => f.debug_struct("Sized").field("len", len).finish(),
            Self::Stream(_) => f.write_str("Stream"),
        }
    }
}

impl From<Bytes> for BinaryPayload {
    fn from(bytes: Bytes) -> Self {
        Self::Buffer(bytes)
    }
}

impl From<Vec<u8>> for BinaryPayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Buffer(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for BinaryPayload {
    fn from(bytes: &'static [u8]) -> Self {
        Self::Buffer(Bytes::from_static(bytes))
    }
}

impl From<String> for BinaryPayload {
    fn from(text: String) -> Self {
        Self::Buffer(Bytes::from(text))
    }
}
