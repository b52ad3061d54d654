//! Applies controller intents to the input session.
//!
//! # Serialisation
//!
//! The session sits behind a `tokio::sync::Mutex`, so intents are applied one
//! at a time in arrival order.  A shortcut holds the lock for its whole
//! press/hold/release script; other intents wait for it.
//!
//! # Pastes run in the background
//!
//! A paste can take a long time, and the controller must be able to cancel
//! it.  The dispatcher therefore spawns each paste as its own task, which
//! takes the session lock for one character at a time and sleeps the
//! per-character delay outside the lock.  Key and mouse intents interleave
//! between characters; `CancelPaste` flips the job's cancel flag and the task
//! stops before the next character.
//!
//! Only one paste runs at a time.  A second `Paste` while one is in progress
//! is rejected with [`DispatchError::PasteBusy`].

use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use kvm_hid_core::{
    CancelHandle, HidKeyCode, InputSession, KeymapError, LayoutId, PasteError, PasteJob,
    PasteStep, SequenceError, TransportError,
};

use crate::domain::{BridgeEvent, Intent};

/// Errors that can occur while applying one intent.
///
/// None of these stop the dispatcher; [`Dispatcher::run`] reports them to the
/// controller as [`BridgeEvent::Error`] and carries on.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A key or layout name in the intent was not recognised.
    #[error(transparent)]
    Keymap(#[from] KeymapError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Sequence(#[from] SequenceError),

    /// A paste was requested while another is still typing.
    #[error("a paste is already in progress")]
    PasteBusy,
}

struct ActivePaste {
    cancel: CancelHandle,
    task: JoinHandle<()>,
}

/// Routes intents to a shared [`InputSession`].
pub struct Dispatcher {
    session: Arc<Mutex<InputSession>>,
    events: mpsc::Sender<BridgeEvent>,
    paste: StdMutex<Option<ActivePaste>>,
}

impl Dispatcher {
    pub fn new(session: Arc<Mutex<InputSession>>, events: mpsc::Sender<BridgeEvent>) -> Self {
        Self {
            session,
            events,
            paste: StdMutex::new(None),
        }
    }

    /// Applies intents until the channel closes.  Errors become
    /// [`BridgeEvent::Error`] events.
    pub async fn run(&self, mut intents: mpsc::Receiver<Intent>) {
        while let Some(intent) = intents.recv().await {
            if let Err(e) = self.dispatch(intent).await {
                warn!("intent failed: {e}");
                let _ = self.events.send(BridgeEvent::error(&e)).await;
            }
        }
        debug!("intent stream closed");
    }

    /// Applies a single intent.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if a key name does not parse, the transport
    /// fails, or a paste is already running.
    pub async fn dispatch(&self, intent: Intent) -> Result<(), DispatchError> {
        match intent {
            Intent::KeyDown { code } => {
                let key: HidKeyCode = code.parse()?;
                self.session.lock().await.key_down(key).await?;
            }
            Intent::KeyUp { code } => {
                let key: HidKeyCode = code.parse()?;
                self.session.lock().await.key_up(key).await?;
            }
            Intent::ReleaseAll => self.session.lock().await.release_all().await?,
            Intent::MouseMove { x, y } => self.session.lock().await.mouse_move(x, y).await?,
            Intent::MouseButton { button, pressed } => {
                self.session
                    .lock()
                    .await
                    .mouse_button(button, pressed)
                    .await?;
            }
            Intent::MouseScroll { delta } => self.session.lock().await.mouse_scroll(delta).await?,
            Intent::Shortcut { keys } => {
                let keys = keys.resolve()?;
                self.session.lock().await.send_shortcut(&keys).await?;
            }
            Intent::Paste { text, layout } => self.start_paste(&text, layout).await?,
            Intent::CancelPaste => self.cancel_paste(),
            Intent::Jiggler { enabled } => self.session.lock().await.set_jiggler(enabled),
            Intent::SetLayout { layout } => self.session.lock().await.set_layout(layout),
        }
        Ok(())
    }

    /// `true` while a paste task is still typing.
    pub fn paste_in_progress(&self) -> bool {
        self.paste
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|active| !active.task.is_finished())
    }

    /// Cancels any running paste, waits for it to stop, then shuts the
    /// session down (jiggler off, everything released).
    pub async fn shutdown(&self) {
        let active = self
            .paste
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(active) = active {
            active.cancel.cancel();
            if let Err(e) = active.task.await {
                warn!("paste task ended abnormally: {e}");
            }
        }
        if let Err(e) = self.session.lock().await.shutdown().await {
            warn!("final release failed: {e}");
        }
    }

    async fn start_paste(
        &self,
        text: &str,
        layout: Option<LayoutId>,
    ) -> Result<(), DispatchError> {
        if self.paste_in_progress() {
            return Err(DispatchError::PasteBusy);
        }
        let job = self.session.lock().await.start_paste(text, layout);
        let cancel = job.cancel_handle();
        let task = tokio::spawn(drive_paste(
            Arc::clone(&self.session),
            job,
            self.events.clone(),
        ));
        *self.paste.lock().unwrap_or_else(PoisonError::into_inner) = Some(ActivePaste { cancel, task });
        Ok(())
    }

    fn cancel_paste(&self) {
        let guard = self.paste.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(active) if !active.task.is_finished() => {
                info!("paste cancellation requested");
                active.cancel.cancel();
            }
            _ => debug!("no paste in progress; cancel ignored"),
        }
    }
}

/// Types `job` one character per session lock, reporting progress.
async fn drive_paste(
    session: Arc<Mutex<InputSession>>,
    mut job: PasteJob,
    events: mpsc::Sender<BridgeEvent>,
) {
    let delay = job.per_char_delay();
    loop {
        let step: Result<PasteStep, PasteError> = session.lock().await.paste_step(&mut job).await;
        match step {
            Ok(PasteStep::Progress(progress)) => {
                let _ = events.send(BridgeEvent::PasteProgress(progress)).await;
                if !delay.is_zero() && progress.processed < progress.total {
                    tokio::time::sleep(delay).await;
                }
            }
            Ok(PasteStep::Done(outcome)) => {
                let _ = events.send(BridgeEvent::PasteFinished { outcome }).await;
                return;
            }
            Err(e) => {
                warn!("paste failed: {e}");
                let _ = events.send(BridgeEvent::error(&e)).await;
                return;
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
