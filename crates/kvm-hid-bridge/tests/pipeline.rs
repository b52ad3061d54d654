//! End-to-end tests: JSON lines in, HID reports and JSON events out.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};

use kvm_hid_bridge::application::Dispatcher;
use kvm_hid_bridge::domain::BridgeConfig;
use kvm_hid_bridge::infrastructure::{read_intents, write_events};
use kvm_hid_core::transport::mock::RecordingTransport;
use kvm_hid_core::{InputSession, ReportTransport};

/// Runs `input` through reader → dispatcher → writer and returns the
/// recorded reports' bytes and the event lines.
async fn run_pipeline(config: &BridgeConfig, input: &'static [u8]) -> (Vec<Vec<u8>>, Vec<String>) {
    let transport = Arc::new(RecordingTransport::new());
    let session = Arc::new(Mutex::new(InputSession::new(
        &config.session_config(),
        Arc::clone(&transport) as Arc<dyn ReportTransport>,
    )));
    let (intent_tx, intent_rx) = mpsc::channel(16);
    let (event_tx, event_rx) = mpsc::channel(16);
    let dispatcher = Dispatcher::new(session, event_tx.clone());

    let writer = tokio::spawn(async move {
        let mut out: Vec<u8> = Vec::new();
        write_events(&mut out, event_rx).await.unwrap();
        out
    });

    read_intents(input, intent_tx, event_tx).await.unwrap();
    dispatcher.run(intent_rx).await;
    while dispatcher.paste_in_progress() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    dispatcher.shutdown().await;
    drop(dispatcher);

    let out = writer.await.unwrap();
    let events = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    let reports = transport
        .reports()
        .iter()
        .map(|r| r.as_bytes().to_vec())
        .collect();
    (reports, events)
}

#[tokio::test]
async fn test_key_press_and_release_reach_transport() {
    // Arrange
    let input: &[u8] =
        b"{\"type\":\"KeyDown\",\"code\":\"ShiftLeft\"}\n{\"type\":\"KeyDown\",\"code\":\"KeyA\"}\n{\"type\":\"KeyUp\",\"code\":\"KeyA\"}\n";

    // Act
    let (reports, events) = run_pipeline(&BridgeConfig::default(), input).await;

    // Assert: three key reports, then the shutdown release of both devices.
    assert_eq!(reports[0], vec![0x02, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(reports[1], vec![0x02, 0, 0x04, 0, 0, 0, 0, 0]);
    assert_eq!(reports[2], vec![0x02, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(reports[3], vec![0; 8]);
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_paste_emits_progress_and_finished_events() {
    let input: &[u8] = b"{\"type\":\"Paste\",\"text\":\"Ab\"}\n";

    let (reports, events) = run_pipeline(&BridgeConfig::default(), input).await;

    // "A": Shift down, A down, A up, Shift up.  "b": B down, B up.
    assert_eq!(
        &reports[..6],
        &[
            vec![0x02, 0, 0, 0, 0, 0, 0, 0],
            vec![0x02, 0, 0x04, 0, 0, 0, 0, 0],
            vec![0x02, 0, 0, 0, 0, 0, 0, 0],
            vec![0; 8],
            vec![0, 0, 0x05, 0, 0, 0, 0, 0],
            vec![0; 8],
        ]
    );
    let finished = events.last().expect("at least one event");
    assert_eq!(
        finished,
        r#"{"type":"PasteFinished","outcome":{"status":"completed","typed":2,"skipped":0}}"#
    );
}

#[tokio::test]
async fn test_bad_lines_are_reported_and_do_not_stop_the_bridge() {
    let input: &[u8] = b"garbage\n{\"type\":\"KeyDown\",\"code\":\"Nope\"}\n{\"type\":\"MouseScroll\",\"delta\":-1}\n";

    let (reports, events) = run_pipeline(&BridgeConfig::default(), input).await;

    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.starts_with(r#"{"type":"Error""#)));
    // Absolute mode by default: 6-byte report with wheel 0xFF.
    assert_eq!(reports[0], vec![0, 0, 0, 0, 0, 0xFF]);
}
