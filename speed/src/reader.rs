use crate::error::Error;
use crate::models::io::Message;
use crate::types::ByteString;
use crate::{parser, utils};
use common::BUFFER_SIZE;
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace};

/// Turns a byte stream into whole messages, however the bytes happen to be chunked.
pub struct FrameReader<R> {
    stream: R,
    buffer: [u8; BUFFER_SIZE],
    queue: ByteString,
}
impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(stream: R) -> Self {
        Self {
            stream,
            buffer: [0u8; BUFFER_SIZE],
            queue: Vec::new(),
        }
    }

    /// Next complete message, waiting on the stream for as long as it takes to get one.
    ///
    /// Returns `Ok(None)` once the stream ends between messages. Ending part way through a
    /// message is a transport error, and an unrecognised message type is a protocol error;
    /// there is no resynchronising after either.
    pub async fn next_message(&mut self) -> Result<Option<Message>, Error> {
        loop {
            // Not enough data has been received by the TCP stream until this returns something.
            if let Some((message, drain)) = parser::nom(&self.queue)? {
                self.queue.drain(..drain);
                return Ok(Some(message));
            }

            match self.stream.read(&mut self.buffer).await {
                // See https://doc.rust-lang.org/std/io/trait.Read.html#tymethod.read
                Ok(0) if self.queue.is_empty() => return Ok(None),
                Ok(0) => {
                    return Err(std::io::Error::new(
                        ErrorKind::UnexpectedEof,
                        format!("stream ended with {} bytes of an unfinished message", self.queue.len()),
                    )
                    .into())
                }
                Ok(n) => {
                    trace!("<<< {}", utils::u8s_to_hex_str(&self.buffer[..n]));
                    self.queue.extend_from_slice(&self.buffer[..n]);
                }
                Err(err) if self.queue.is_empty() => {
                    debug!("Read failed between messages: {err}");
                    return Ok(None);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FrameReader;
    use crate::error::Error;
    use crate::models::{io::Message, Camera};
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_several_messages_in_one_read() {
        let bytes: &[u8] = &[
            0x80, 0x00, 0x42, 0x00, 0x08, 0x00, 0x3c, 0x20, 0x04, 0x55, 0x4e, 0x31, 0x58, 0x00, 0x00, 0x00, 0x00,
        ];
        let mut reader = FrameReader::new(bytes);

        assert_eq!(
            Message::IAmCamera(Camera {
                road: 66,
                mile: 8,
                limit: 60
            }),
            reader.next_message().await.expect("Should decode").expect("Should not be at end")
        );
        assert_eq!(
            Message::Plate {
                plate: "UN1X".to_string(),
                timestamp: 0
            },
            reader.next_message().await.expect("Should decode").expect("Should not be at end")
        );
        assert!(reader.next_message().await.expect("Clean end").is_none());
    }

    #[tokio::test]
    async fn test_message_split_across_reads() {
        let (mut client, server) = tokio::io::duplex(64);
        tokio::spawn(async move {
            for chunk in [&[0x20u8, 0x04, 0x55][..], &[0x4e, 0x31], &[0x58, 0x00, 0x00, 0x00], &[0x2d, 0x41]] {
                client.write_all(chunk).await.expect("Duplex write");
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });
        let mut reader = FrameReader::new(server);

        assert_eq!(
            Some(Message::Plate {
                plate: "UN1X".to_string(),
                timestamp: 45
            }),
            reader.next_message().await.expect("Should decode")
        );
        assert_eq!(Some(Message::Heartbeat), reader.next_message().await.expect("Should decode"));
        assert_eq!(None, reader.next_message().await.expect("Clean end"));
    }

    #[tokio::test]
    async fn test_unknown_type() {
        let bytes: &[u8] = &[0x40, 0x00, 0x00, 0x00, 0x00, 0x99, 0x01];
        let mut reader = FrameReader::new(bytes);

        assert_eq!(Some(Message::WantHeartbeat(0)), reader.next_message().await.expect("Should decode"));
        assert!(matches!(reader.next_message().await, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn test_end_mid_message() {
        let bytes: &[u8] = &[0x80, 0x00, 0x42, 0x00];
        let mut reader = FrameReader::new(bytes);

        assert!(matches!(reader.next_message().await, Err(Error::Transport(_))));
    }
}
