//! Length-prefixed framing.
//!
//! Wire format, one frame per message:
//!
//! ```text
//! [u32 little-endian length N][N payload bytes]
//! ```

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::ChannelError;

/// Size of the length header in bytes.
pub const HEADER_LEN: usize = 4;

/// Encode `payload` as a single frame (header followed by payload).
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, ChannelError> {
    let len =
        u32::try_from(payload.len()).map_err(|_| ChannelError::FrameTooLarge(payload.len()))?;

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Read one frame. Returns `Ok(None)` on a clean EOF before the header.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, ChannelError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(ChannelError::Io(e)),
    }

    let len = u32::from_le_bytes(header) as usize;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

/// Writes frames to an async byte sink.
///
/// Each frame goes out with a single `write_all`, which suspends while the
/// sink reports backpressure. Taking `&mut self` keeps frames from ever
/// interleaving.
pub struct FrameWriter<W> {
    inner: W,
    frames_sent: u64,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            frames_sent: 0,
        }
    }

    /// Write one frame and flush it.
    pub async fn send(&mut self, payload: &[u8]) -> Result<(), ChannelError> {
        let frame = encode_frame(payload)?;
        self.inner
            .write_all(&frame)
            .await
            .map_err(ChannelError::Write)?;
        self.inner.flush().await.map_err(ChannelError::Write)?;

        self.frames_sent += 1;
        trace!(bytes = payload.len(), seq = self.frames_sent, "Frame sent");
        Ok(())
    }

    /// Signal end of input to the reader.
    pub async fn shutdown(&mut self) -> Result<(), ChannelError> {
        self.inner.shutdown().await.map_err(ChannelError::Write)
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    async fn sent_bytes(payloads: &[Vec<u8>]) -> Vec<u8> {
        let mut writer = FrameWriter::new(Vec::new());
        for payload in payloads {
            writer.send(payload).await.unwrap();
        }
        writer.into_inner()
    }

    #[tokio::test]
    async fn test_header_matches_payload_length() {
        for size in [0usize, 1, 255, 256, 65_535, 65_536, 70_000] {
            let bytes = sent_bytes(&[vec![b'x'; size]]).await;
            assert_eq!(bytes.len(), HEADER_LEN + size);
            let header = u32::from_le_bytes(bytes[..4].try_into().unwrap());
            assert_eq!(header as usize, size, "size {}", size);
        }
    }

    #[tokio::test]
    async fn test_header_is_little_endian() {
        let bytes = sent_bytes(&[vec![0u8; 0x0102]]).await;
        assert_eq!(&bytes[..4], &[0x02, 0x01, 0x00, 0x00]);
    }

    #[tokio::test]
    async fn test_frames_keep_send_order() {
        let payloads = vec![b"first".to_vec(), Vec::new(), b"third".to_vec()];
        let bytes = sent_bytes(&payloads).await;

        let mut reader = bytes.as_slice();
        for expected in &payloads {
            let frame = read_frame(&mut reader).await.unwrap().unwrap();
            assert_eq!(&frame, expected);
        }
        assert!(read_frame(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_truncated_payload_is_error() {
        let mut bytes = encode_frame(b"hello").unwrap();
        bytes.truncate(bytes.len() - 2);
        let mut reader = bytes.as_slice();
        assert!(read_frame(&mut reader).await.is_err());
    }

    #[tokio::test]
    async fn test_backpressure_preserves_frames() {
        // Tiny pipe buffer forces write_all to suspend repeatedly
        let (client, mut server) = tokio::io::duplex(64);
        let payloads: Vec<Vec<u8>> = (0..8u8).map(|i| vec![i; 10_000]).collect();

        let expected = payloads.clone();
        let writer_task = tokio::spawn(async move {
            let mut writer = FrameWriter::new(client);
            for payload in &payloads {
                writer.send(payload).await.unwrap();
            }
            writer.frames_sent()
        });

        for payload in &expected {
            let frame = read_frame(&mut server).await.unwrap().unwrap();
            assert_eq!(&frame, payload);
        }
        assert_eq!(writer_task.await.unwrap(), 8);
    }

    proptest! {
        #[test]
        fn prop_frame_header_is_payload_length(
            payload in prop::collection::vec(any::<u8>(), 0..2048),
        ) {
            let frame = encode_frame(&payload).unwrap();
            let header = u32::from_le_bytes(frame[..4].try_into().unwrap());
            prop_assert_eq!(header as usize, payload.len());
            prop_assert_eq!(&frame[4..], payload.as_slice());
        }
    }
}
