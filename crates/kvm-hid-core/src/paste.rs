//! Paste typist: types arbitrary text one character at a time.
//!
//! # Per-character report sequence
//!
//! For a character that needs modifiers, e.g. `'A'` → (KeyA, LShift):
//!
//! ```text
//! LShift down      [02 00 00 00 00 00 00 00]
//! KeyA   down      [02 00 04 00 00 00 00 00]
//! KeyA   up        [02 00 00 00 00 00 00 00]
//! LShift up        [00 00 00 00 00 00 00 00]
//! ```
//!
//! Modifiers go down in ascending bit order and come up in reverse.  A plain
//! character is just key down, key up.  One character is fully released before
//! the next begins, so the keyboard is clear between characters.
//!
//! # Intentional lossy behaviour
//!
//! Characters the layout cannot type are skipped, not fatal.  Each skip is
//! reported in the progress stream with `skipped = true`.
//!
//! # Cancellation
//!
//! A [`CancelHandle`] is a shared flag checked before each character's first
//! report.  A report already in flight is not interrupted.  Once the flag is
//! seen, the job sends one reset report and ends with
//! [`PasteOutcome::Cancelled`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::PasteConfig;
use crate::keymap::{BuiltinLayouts, KeyStroke, LayoutId, LayoutProvider};
use crate::report::keyboard::KeyboardState;
use crate::sequencer::release_best_effort;
use crate::transport::{HidReport, ReportTransport, TransportError};

/// Error type for paste jobs.
#[derive(Debug, Error)]
pub enum PasteError {
    /// A report could not be sent.  The job is finished.
    #[error("paste aborted: {0}")]
    Transport(#[from] TransportError),
}

/// Progress after one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasteProgress {
    /// Characters handled so far, typed or skipped.
    pub processed: usize,
    pub total: usize,
    /// `true` if this character could not be typed on the layout.
    pub skipped: bool,
}

/// How a paste job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PasteOutcome {
    Completed { typed: usize, skipped: usize },
    Cancelled { processed: usize },
}

/// One step of a [`PasteJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteStep {
    /// A character was typed or skipped.
    Progress(PasteProgress),
    /// The job is over.  Every later call returns the same outcome.
    Done(PasteOutcome),
}

/// Cloneable cancellation flag for a running paste.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Creates paste jobs with a shared configuration and layout provider.
#[derive(Clone)]
pub struct PasteTypist {
    config: PasteConfig,
    provider: Arc<dyn LayoutProvider>,
}

impl PasteTypist {
    /// A typist backed by the built-in layout tables.
    pub fn new(config: PasteConfig) -> Self {
        Self::with_provider(config, Arc::new(BuiltinLayouts))
    }

    pub fn with_provider(config: PasteConfig, provider: Arc<dyn LayoutProvider>) -> Self {
        Self { config, provider }
    }

    pub fn config(&self) -> &PasteConfig {
        &self.config
    }

    /// Prepares a job for `text` on `layout`.  Nothing is sent until the job
    /// is driven.
    ///
    /// Text longer than `max_chars` characters is truncated.
    pub fn start(&self, text: &str, layout: LayoutId) -> PasteJob {
        let mut chars: Vec<char> = text.chars().collect();
        if chars.len() > self.config.max_chars {
            warn!(
                requested = chars.len(),
                max_chars = self.config.max_chars,
                "paste text truncated"
            );
            chars.truncate(self.config.max_chars);
        }
        info!(total = chars.len(), %layout, "paste started");
        PasteJob {
            chars,
            position: 0,
            layout,
            provider: Arc::clone(&self.provider),
            cancel: CancelHandle::new(),
            per_char_delay: self.config.per_char_delay(),
            typed: 0,
            skipped: 0,
            outcome: None,
        }
    }
}

impl std::fmt::Debug for PasteTypist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasteTypist")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// A single paste in progress.
///
/// Drive it with [`next`](Self::next) one character at a time, or with
/// [`run`](Self::run) to the end.  A finished job cannot be restarted.
pub struct PasteJob {
    chars: Vec<char>,
    position: usize,
    layout: LayoutId,
    provider: Arc<dyn LayoutProvider>,
    cancel: CancelHandle,
    per_char_delay: Duration,
    typed: usize,
    skipped: usize,
    outcome: Option<PasteOutcome>,
}

impl PasteJob {
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn total(&self) -> usize {
        self.chars.len()
    }

    pub fn processed(&self) -> usize {
        self.position
    }

    pub fn layout(&self) -> LayoutId {
        self.layout
    }

    /// Pause the driver should leave between characters.
    pub fn per_char_delay(&self) -> Duration {
        self.per_char_delay
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Handles the next character.
    ///
    /// Returns [`PasteStep::Done`] once the text is exhausted or the job has
    /// been cancelled.  Does not sleep; pacing is the driver's job.
    ///
    /// Keys held on `keyboard` before a character (for example by key
    /// intents interleaved with the paste) are released first, and the job
    /// always finishes with `keyboard` in the reset state.
    ///
    /// # Errors
    ///
    /// Returns [`PasteError::Transport`] if a report could not be sent.  The
    /// keyboard is reset, a reset report is attempted, and the job is
    /// finished.
    pub async fn next(
        &mut self,
        keyboard: &mut KeyboardState,
        transport: &dyn ReportTransport,
    ) -> Result<PasteStep, PasteError> {
        if let Some(outcome) = self.outcome {
            return Ok(PasteStep::Done(outcome));
        }

        if self.cancel.is_cancelled() {
            let report = keyboard.reset();
            let outcome = self.finish(PasteOutcome::Cancelled {
                processed: self.position,
            });
            transport.transmit(&HidReport::Keyboard(report)).await?;
            return Ok(PasteStep::Done(outcome));
        }

        let Some(&ch) = self.chars.get(self.position) else {
            let outcome = self.finish(PasteOutcome::Completed {
                typed: self.typed,
                skipped: self.skipped,
            });
            if !keyboard.is_clear() {
                let report = keyboard.reset();
                transport.transmit(&HidReport::Keyboard(report)).await?;
            }
            return Ok(PasteStep::Done(outcome));
        };

        let skipped = match self.provider.resolve(self.layout, ch) {
            Ok(stroke) => {
                let typed = match clear_held_keys(keyboard, transport).await {
                    Ok(()) => type_stroke(keyboard, transport, stroke).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = typed {
                    self.finish(PasteOutcome::Cancelled {
                        processed: self.position,
                    });
                    release_best_effort(keyboard, transport).await;
                    return Err(e.into());
                }
                self.typed += 1;
                false
            }
            Err(e) => {
                debug!("skipping character: {e}");
                self.skipped += 1;
                true
            }
        };
        self.position += 1;

        Ok(PasteStep::Progress(PasteProgress {
            processed: self.position,
            total: self.chars.len(),
            skipped,
        }))
    }

    /// Drives the job to the end, sleeping `per_char_delay` between
    /// characters and forwarding progress to `progress` if given.
    ///
    /// A closed progress channel does not stop the job.
    ///
    /// # Errors
    ///
    /// See [`next`](Self::next).
    pub async fn run(
        &mut self,
        keyboard: &mut KeyboardState,
        transport: &dyn ReportTransport,
        progress: Option<&mpsc::Sender<PasteProgress>>,
    ) -> Result<PasteOutcome, PasteError> {
        loop {
            match self.next(keyboard, transport).await? {
                PasteStep::Progress(p) => {
                    if let Some(tx) = progress {
                        let _ = tx.send(p).await;
                    }
                    if !self.per_char_delay.is_zero() && p.processed < p.total {
                        tokio::time::sleep(self.per_char_delay).await;
                    }
                }
                PasteStep::Done(outcome) => return Ok(outcome),
            }
        }
    }

    fn finish(&mut self, outcome: PasteOutcome) -> PasteOutcome {
        info!(?outcome, "paste finished");
        self.outcome = Some(outcome);
        outcome
    }
}

impl std::fmt::Debug for PasteJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasteJob")
            .field("total", &self.chars.len())
            .field("position", &self.position)
            .field("layout", &self.layout)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

/// Releases anything held from outside the paste, so a pasted character is
/// never combined with a key or modifier the user is holding.
async fn clear_held_keys(
    keyboard: &mut KeyboardState,
    transport: &dyn ReportTransport,
) -> Result<(), TransportError> {
    if keyboard.is_clear() {
        return Ok(());
    }
    debug!(held = ?keyboard.pressed_keys(), "releasing held keys before pasted character");
    let report = keyboard.reset();
    transport.transmit(&HidReport::Keyboard(report)).await
}

async fn type_stroke(
    keyboard: &mut KeyboardState,
    transport: &dyn ReportTransport,
    stroke: KeyStroke,
) -> Result<(), TransportError> {
    for modifier in stroke.modifiers.keys() {
        let report = keyboard.key_down(modifier);
        transport.transmit(&HidReport::Keyboard(report)).await?;
    }
    let report = keyboard.key_down(stroke.key);
    transport.transmit(&HidReport::Keyboard(report)).await?;
    let report = keyboard.key_up(stroke.key);
    transport.transmit(&HidReport::Keyboard(report)).await?;
    for modifier in stroke.modifiers.keys().rev() {
        let report = keyboard.key_up(modifier);
        transport.transmit(&HidReport::Keyboard(report)).await?;
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
