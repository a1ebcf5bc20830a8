//! Frame writer for sending protocol messages to a stream

use tokio::io::AsyncWriteExt;

use super::error::FrameError;
use super::frame::RawFrame;
use super::message_id::MessageId;

/// Writes protocol frames to an async writer
pub struct FrameWriter<W> {
    writer: W,
}

impl<W> FrameWriter<W> {
    /// Create a new frame writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Underlying writer, e.g. to shut the stream down
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }
}

impl<W: AsyncWriteExt + Unpin> FrameWriter<W> {
    /// Write one encoded frame and flush, so each request or chunk goes out
    /// as soon as it is produced
    pub async fn write_frame(&mut self, frame: &RawFrame) -> Result<(), FrameError> {
        let bytes = frame.to_bytes();
        self.writer.write_all(&bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Encode and write a frame from its parts
    pub async fn write(
        &mut self,
        message_id: MessageId,
        message_type: &str,
        payload: &[u8],
    ) -> Result<(), FrameError> {
        let frame = RawFrame::new(message_id, message_type.to_string(), payload.to_vec());
        self.write_frame(&frame).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_frame_writer() {
        let mut buffer = Vec::new();
        let id = MessageId::new();

        {
            let mut writer = FrameWriter::new(Cursor::new(&mut buffer));
            let frame = RawFrame::new(
                id,
                "DownloadFile".to_string(),
                b"{\"name\":\"a\"}".to_vec(),
            );
            writer.write_frame(&frame).await.unwrap();
        }

        let expected = format!("FD|12|DownloadFile|{}|12|{{\"name\":\"a\"}}\n", id);
        assert_eq!(buffer, expected.as_bytes());
    }

    #[tokio::test]
    async fn test_frame_writer_convenience_method() {
        let mut buffer = Vec::new();
        let id = MessageId::new();

        {
            let mut writer = FrameWriter::new(Cursor::new(&mut buffer));
            writer.write(id, "FileData", &[0x01, 0x02, 0x03]).await.unwrap();
        }

        let mut expected = format!("FD|8|FileData|{}|3|", id).into_bytes();
        expected.extend_from_slice(&[0x01, 0x02, 0x03, b'\n']);
        assert_eq!(buffer, expected);
    }
}
