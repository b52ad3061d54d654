//! JSON-lines framing over any async byte stream.
//!
//! The bridge talks to its controller over stdin/stdout: one JSON object per
//! line in each direction.  Both halves are generic over
//! `AsyncBufRead`/`AsyncWrite` so tests can drive them with in-memory
//! buffers.
//!
//! A malformed input line is not fatal.  It is logged, reported back as an
//! `Error` event, and the reader moves on to the next line.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::domain::{BridgeEvent, Intent};

/// Reads intents line by line until EOF or until the intent receiver is
/// dropped.
///
/// # Errors
///
/// Returns the underlying I/O error if reading fails.
pub async fn read_intents<R>(
    reader: R,
    intents: mpsc::Sender<Intent>,
    events: mpsc::Sender<BridgeEvent>,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Intent>(line) {
            Ok(intent) => {
                debug!(?intent, "intent received");
                if intents.send(intent).await.is_err() {
                    debug!("dispatcher gone; stopping reader");
                    return Ok(());
                }
            }
            Err(e) => {
                warn!("malformed intent: {e}");
                let _ = events
                    .send(BridgeEvent::error(format!("malformed intent: {e}")))
                    .await;
            }
        }
    }
    debug!("input closed");
    Ok(())
}

/// Writes events as JSON lines until every sender is dropped.
///
/// # Errors
///
/// Returns the underlying I/O error if a write fails.
pub async fn write_events<W>(
    writer: &mut W,
    mut events: mpsc::Receiver<BridgeEvent>,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(event) = events.recv().await {
        let mut line = serde_json::to_vec(&event)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use kvm_hid_core::PasteOutcome;

    #[tokio::test]
    async fn test_reader_parses_each_line() {
        // Arrange
        let input: &[u8] = b"{\"type\":\"KeyDown\",\"code\":\"KeyA\"}\n\n{\"type\":\"ReleaseAll\"}\n";
        let (intent_tx, mut intent_rx) = mpsc::channel(8);
        let (event_tx, mut event_rx) = mpsc::channel(8);

        // Act
        read_intents(input, intent_tx, event_tx).await.unwrap();

        // Assert
        assert_eq!(
            intent_rx.recv().await,
            Some(Intent::KeyDown {
                code: "KeyA".to_string()
            })
        );
        assert_eq!(intent_rx.recv().await, Some(Intent::ReleaseAll));
        assert_eq!(intent_rx.recv().await, None);
        assert_eq!(event_rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_malformed_line_becomes_error_event_and_reading_continues() {
        let input: &[u8] = b"not json\n{\"type\":\"CancelPaste\"}\n";
        let (intent_tx, mut intent_rx) = mpsc::channel(8);
        let (event_tx, mut event_rx) = mpsc::channel(8);

        read_intents(input, intent_tx, event_tx).await.unwrap();

        match event_rx.recv().await {
            Some(BridgeEvent::Error { message }) => assert!(message.starts_with("malformed intent")),
            other => panic!("expected error event, got {other:?}"),
        }
        assert_eq!(intent_rx.recv().await, Some(Intent::CancelPaste));
    }

    #[tokio::test]
    async fn test_reader_stops_when_dispatcher_is_gone() {
        let input: &[u8] = b"{\"type\":\"ReleaseAll\"}\n{\"type\":\"ReleaseAll\"}\n";
        let (intent_tx, intent_rx) = mpsc::channel(8);
        let (event_tx, _event_rx) = mpsc::channel(8);
        drop(intent_rx);

        let result = read_intents(input, intent_tx, event_tx).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_writer_emits_one_line_per_event() {
        // Arrange
        let mut writer = tokio_test::io::Builder::new()
            .write(b"{\"type\":\"PasteFinished\",\"outcome\":{\"status\":\"completed\",\"typed\":2,\"skipped\":0}}\n")
            .write(b"{\"type\":\"Error\",\"message\":\"boom\"}\n")
            .build();
        let (tx, rx) = mpsc::channel(4);
        tx.send(BridgeEvent::PasteFinished {
            outcome: PasteOutcome::Completed { typed: 2, skipped: 0 },
        })
        .await
        .unwrap();
        tx.send(BridgeEvent::error("boom")).await.unwrap();
        drop(tx);

        // Act / Assert: the mock panics on any unexpected write.
        write_events(&mut writer, rx).await.unwrap();
    }
}
