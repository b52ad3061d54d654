//! One controller's input session.
//!
//! An [`InputSession`] owns every piece of mutable input state for one
//! controller connection: the keyboard state, the mouse encoder, the selected
//! layout and the jiggler.  Nothing is global; two sessions on two transports
//! never see each other's state.
//!
//! All methods take `&mut self`, so a session has exactly one writer at a
//! time.  Callers that share a session between tasks wrap it in a
//! `tokio::sync::Mutex`.  The jiggler's own timer task writes through the same
//! transport but keeps its state separate (see [`crate::jiggler`]).

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::jiggler::{Jiggler, JigglerMode};
use crate::keymap::{BuiltinLayouts, HidKeyCode, LayoutId, LayoutProvider};
use crate::paste::{PasteError, PasteJob, PasteOutcome, PasteProgress, PasteStep, PasteTypist};
use crate::report::keyboard::KeyboardState;
use crate::report::mouse::{MouseButton, MouseEncoder, MouseMode, MouseReport};
use crate::sequencer::{SequenceError, SequencerConfig, ShortcutSequencer};
use crate::transport::{HidReport, ReportTransport, TransportError};

pub struct InputSession {
    keyboard: KeyboardState,
    mouse: MouseEncoder,
    transport: Arc<dyn ReportTransport>,
    sequencer: ShortcutSequencer,
    typist: PasteTypist,
    layout: LayoutId,
    jiggler: Arc<Jiggler>,
}

impl InputSession {
    /// Creates a session over `transport` using the built-in layouts.
    ///
    /// If `config.jiggler.enabled` is set the jiggler starts immediately, which
    /// requires a running tokio runtime.
    pub fn new(config: &SessionConfig, transport: Arc<dyn ReportTransport>) -> Self {
        Self::with_layout_provider(config, transport, Arc::new(BuiltinLayouts))
    }

    pub fn with_layout_provider(
        config: &SessionConfig,
        transport: Arc<dyn ReportTransport>,
        provider: Arc<dyn LayoutProvider>,
    ) -> Self {
        let jiggler = Arc::new(Jiggler::new(&config.jiggler, Arc::clone(&transport)));
        if config.jiggler.enabled {
            jiggler.set_mode(JigglerMode::Enabled);
        }
        info!(
            layout = %config.keyboard.layout,
            mouse_mode = %config.mouse.mode,
            "input session created"
        );
        Self {
            keyboard: KeyboardState::new(),
            mouse: MouseEncoder::with_mode(config.mouse.mode, config.mouse.screen()),
            transport,
            sequencer: ShortcutSequencer::new(SequencerConfig::from(&config.shortcut)),
            typist: PasteTypist::with_provider(config.paste.clone(), provider),
            layout: config.keyboard.layout,
            jiggler,
        }
    }

    // ── Keyboard ──────────────────────────────────────────────────────────────

    pub async fn key_down(&mut self, key: HidKeyCode) -> Result<(), TransportError> {
        let report = self.keyboard.key_down(key);
        self.send(report.into()).await
    }

    pub async fn key_up(&mut self, key: HidKeyCode) -> Result<(), TransportError> {
        let report = self.keyboard.key_up(key);
        self.send(report.into()).await
    }

    /// Releases every key and mouse button.
    ///
    /// Both release reports are attempted even if the first fails; the first
    /// error is returned.
    pub async fn release_all(&mut self) -> Result<(), TransportError> {
        let keyboard = self.keyboard.reset();
        let mouse = self.mouse.release_all();
        let first = self.send(keyboard.into()).await;
        let second = self.send(mouse.into()).await;
        first.and(second)
    }

    pub async fn send_shortcut(&mut self, keys: &[HidKeyCode]) -> Result<(), SequenceError> {
        self.sequencer
            .send_shortcut(&mut self.keyboard, self.transport.as_ref(), keys)
            .await
    }

    pub fn keyboard(&self) -> &KeyboardState {
        &self.keyboard
    }

    // ── Mouse ─────────────────────────────────────────────────────────────────

    /// Moves the pointer: to `(x, y)` in absolute mode, by `(x, y)` in
    /// relative mode.
    pub async fn mouse_move(&mut self, x: i32, y: i32) -> Result<(), TransportError> {
        let report = self.mouse.build_report(x, y, 0);
        self.send_motion(report).await
    }

    pub async fn mouse_button(
        &mut self,
        button: MouseButton,
        pressed: bool,
    ) -> Result<(), TransportError> {
        let report = if pressed {
            self.mouse.press(button)
        } else {
            self.mouse.release(button)
        };
        self.send_motion(report).await
    }

    pub async fn mouse_scroll(&mut self, delta: i32) -> Result<(), TransportError> {
        let report = self.mouse.scroll(delta);
        self.send_motion(report).await
    }

    pub fn mouse_mode(&self) -> MouseMode {
        self.mouse.mode()
    }

    // ── Paste ─────────────────────────────────────────────────────────────────

    /// Prepares a paste of `text` on `layout`, or on the session layout when
    /// `None`.  Drive it with [`paste_step`](Self::paste_step).
    pub fn start_paste(&self, text: &str, layout: Option<LayoutId>) -> PasteJob {
        self.typist.start(text, layout.unwrap_or(self.layout))
    }

    /// Handles the next character of `job` against this session's keyboard.
    pub async fn paste_step(&mut self, job: &mut PasteJob) -> Result<PasteStep, PasteError> {
        job.next(&mut self.keyboard, self.transport.as_ref()).await
    }

    /// Types `text` to the end, forwarding progress if a sender is given.
    ///
    /// Holds `&mut self` for the whole paste; use
    /// [`start_paste`](Self::start_paste) and [`paste_step`](Self::paste_step)
    /// to interleave other work.
    pub async fn paste(
        &mut self,
        text: &str,
        layout: Option<LayoutId>,
        progress: Option<&tokio::sync::mpsc::Sender<PasteProgress>>,
    ) -> Result<PasteOutcome, PasteError> {
        let mut job = self.start_paste(text, layout);
        job.run(&mut self.keyboard, self.transport.as_ref(), progress)
            .await
    }

    pub fn layout(&self) -> LayoutId {
        self.layout
    }

    pub fn set_layout(&mut self, layout: LayoutId) {
        if self.layout != layout {
            info!(from = %self.layout, to = %layout, "keyboard layout changed");
            self.layout = layout;
        }
    }

    // ── Jiggler ───────────────────────────────────────────────────────────────

    pub fn set_jiggler(&self, enabled: bool) {
        self.jiggler.set_mode(JigglerMode::from(enabled));
    }

    pub fn jiggler(&self) -> &Arc<Jiggler> {
        &self.jiggler
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Stops the jiggler and releases everything.
    pub async fn shutdown(&mut self) -> Result<(), TransportError> {
        info!("input session shutting down");
        self.jiggler.set_mode(JigglerMode::Disabled);
        self.release_all().await
    }

    async fn send_motion(&mut self, report: MouseReport) -> Result<(), TransportError> {
        self.jiggler.notify_motion();
        self.send(report.into()).await
    }

    async fn send(&self, report: HidReport) -> Result<(), TransportError> {
        debug!(bytes = ?report.as_bytes(), "transmit");
        self.transport.transmit(&report).await
    }
}

impl std::fmt::Debug for InputSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputSession")
            .field("keyboard", &self.keyboard)
            .field("mouse", &self.mouse)
            .field("layout", &self.layout)
            .field("jiggler", &self.jiggler)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::RecordingTransport;
    use std::time::Duration;

    fn session_with(config: SessionConfig) -> (InputSession, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::new());
        let session = InputSession::new(&config, Arc::clone(&transport) as Arc<dyn ReportTransport>);
        (session, transport)
    }

    fn relative_config() -> SessionConfig {
        let mut config = SessionConfig::default();
        config.mouse.mode = MouseMode::Relative;
        config
    }

    #[tokio::test]
    async fn test_key_down_and_up_send_keyboard_reports() {
        // Arrange
        let (mut session, transport) = session_with(SessionConfig::default());

        // Act
        session.key_down(HidKeyCode::ShiftLeft).await.unwrap();
        session.key_down(HidKeyCode::KeyA).await.unwrap();
        session.key_up(HidKeyCode::KeyA).await.unwrap();

        // Assert
        let reports = transport.keyboard_reports();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[1].bytes(), [0x02, 0, 0x04, 0, 0, 0, 0, 0]);
        assert_eq!(session.keyboard().pressed_keys(), &[] as &[HidKeyCode]);
    }

    #[tokio::test]
    async fn test_release_all_clears_keyboard_and_mouse() {
        let (mut session, transport) = session_with(relative_config());
        session.key_down(HidKeyCode::KeyQ).await.unwrap();
        session.mouse_button(MouseButton::Left, true).await.unwrap();
        transport.clear();

        session.release_all().await.unwrap();

        let reports = transport.reports();
        assert_eq!(reports.len(), 2);
        assert!(reports[0].as_bytes().iter().all(|&b| b == 0));
        assert_eq!(reports[1].as_bytes(), &[0, 0, 0, 0]);
        assert!(session.keyboard().is_clear());
    }

    #[tokio::test]
    async fn test_mouse_mode_follows_config() {
        let (mut session, transport) = session_with(SessionConfig::default());

        session.mouse_move(960, 540).await.unwrap();

        assert_eq!(session.mouse_mode(), MouseMode::Absolute);
        assert_eq!(transport.reports()[0].len(), 6);
    }

    #[tokio::test]
    async fn test_relative_scroll_sends_wheel_only() {
        let (mut session, transport) = session_with(relative_config());

        session.mouse_scroll(-2).await.unwrap();

        assert_eq!(transport.mouse_reports()[0].as_bytes(), &[0, 0, 0, 0xFE]);
    }

    #[tokio::test]
    async fn test_paste_uses_session_layout_by_default() {
        // Arrange: 'y' and 'z' swap places on de-DE.
        let mut config = SessionConfig::default();
        config.keyboard.layout = LayoutId::DeDe;
        let (mut session, transport) = session_with(config);

        // Act
        session.paste("z", None, None).await.unwrap();

        // Assert
        assert_eq!(transport.keyboard_reports()[0].key_slots()[0], 0x1C);
    }

    #[tokio::test]
    async fn test_paste_layout_override_wins() {
        let (mut session, transport) = session_with(SessionConfig::default());
        session.set_layout(LayoutId::DeDe);

        session.paste("z", Some(LayoutId::EnUs), None).await.unwrap();

        assert_eq!(transport.keyboard_reports()[0].key_slots()[0], 0x1D);
        assert_eq!(session.layout(), LayoutId::DeDe);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_shortcut_uses_configured_timing() {
        let mut config = SessionConfig::default();
        config.shortcut.press_delay_ms = 5;
        config.shortcut.hold_ms = 0;
        let (mut session, transport) = session_with(config);
        let start = tokio::time::Instant::now();

        session
            .send_shortcut(&[HidKeyCode::ControlLeft, HidKeyCode::KeyC])
            .await
            .unwrap();

        assert_eq!(transport.len(), 5);
        assert_eq!(start.elapsed(), Duration::from_millis(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mouse_activity_suppresses_jiggle() {
        // Arrange
        let (mut session, transport) = session_with(relative_config());
        session.set_jiggler(true);

        // Act: keep moving every 10 s for a minute.
        for _ in 0..6 {
            tokio::time::sleep(Duration::from_secs(10)).await;
            session.mouse_move(1, 0).await.unwrap();
        }

        // Assert: only the six real moves were sent.
        assert_eq!(transport.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_can_start_jiggler_enabled() {
        let mut config = SessionConfig::default();
        config.jiggler.enabled = true;
        let (session, transport) = session_with(config);

        tokio::time::sleep(Duration::from_millis(15_001)).await;

        assert!(session.jiggler().is_enabled());
        assert_eq!(transport.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_disables_jiggler_and_releases() {
        let (mut session, transport) = session_with(SessionConfig::default());
        session.set_jiggler(true);
        session.key_down(HidKeyCode::KeyA).await.unwrap();

        session.shutdown().await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(!session.jiggler().is_enabled());
        assert!(session.keyboard().is_clear());
        // key down, keyboard release, mouse release
        assert_eq!(transport.len(), 3);
    }
}
