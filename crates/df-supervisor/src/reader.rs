use crate::process::{OutputStream, ProcessEvent};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

/// Forwards every line of `source` as an `OutputLine` event until EOF.
/// Invalid UTF-8 is replaced rather than ending the stream.
pub(crate) fn spawn_line_forwarder<R>(
    source: R,
    stream: OutputStream,
    events_tx: mpsc::UnboundedSender<ProcessEvent>,
    pid: u32,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        forward_lines(source, stream, events_tx).await;
        tracing::trace!(pid, stream = stream.as_str(), "output stream closed");
    });
}

async fn forward_lines<R>(source: R, stream: OutputStream, events_tx: mpsc::UnboundedSender<ProcessEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(source);
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\n', '\r'])
                    .to_string();
                // Keep draining even with no receiver so the child never
                // blocks on a full pipe.
                let _ = events_tx.send(ProcessEvent::OutputLine { stream, line });
            }
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => {
                tracing::warn!(stream = stream.as_str(), error = %err, "output read error");
                break;
            }
        }
    }
}
