//! Output sink shared by sweeps that run side by side

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

/// Cloneable sink that hands every write to a single writer task.
///
/// Each `poll_write` is forwarded as one chunk, so a line the sweep writes
/// with one `write_all` reaches the writer whole, whatever the other clones
/// are writing at the time.
#[derive(Clone)]
pub struct LineSink {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl LineSink {
    /// Spawn the writer task. It hands the writer back once every clone is dropped.
    pub fn spawn<W>(mut writer: W) -> (Self, JoinHandle<W>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();

        let handle = tokio::spawn(async move {
            while let Some(chunk) = rx.recv().await {
                let result = async {
                    writer.write_all(&chunk).await?;
                    writer.flush().await
                }
                .await;

                if let Err(e) = result {
                    warn!(error = %e, "Failed to write to sweep output");
                }
            }
            writer
        });

        (Self { tx }, handle)
    }
}

impl AsyncWrite for LineSink {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        match self.tx.send(buf.to_vec()) {
            Ok(()) => Poll::Ready(Ok(buf.len())),
            Err(_) => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "sweep output writer stopped",
            ))),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_writer_receives_chunks_from_every_clone() {
        let (sink, writer) = LineSink::spawn(Vec::new());

        let mut first = sink.clone();
        let mut second = sink;
        first.write_all(b"one\n").await.unwrap();
        second.write_all(b"two\n").await.unwrap();
        first.write_all(b"three\n").await.unwrap();
        drop(first);
        drop(second);

        let written = writer.await.unwrap();
        assert_eq!(written, b"one\ntwo\nthree\n".to_vec());
    }
}
