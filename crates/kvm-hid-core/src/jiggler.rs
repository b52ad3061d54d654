//! Idle jiggler: keeps the target awake while nobody moves the mouse.
//!
//! # How it works (for beginners)
//!
//! Many machines lock the screen or go to sleep after a period without input.
//! When the jiggler is enabled it checks, five times per idle threshold,
//! whether any real pointer motion has been seen recently.  If the pointer has
//! been still for at least the threshold, it sends two relative mouse reports:
//! a small diagonal move and its exact inverse.  The pointer ends up where it
//! started, but the target has seen input.
//!
//! ```text
//!  Disabled ──set_mode(Enabled)──► Enabled   (timer scheduled, period = threshold / 5)
//!  Enabled ──set_mode(Disabled)──► Disabled  (timer cancelled)
//! ```
//!
//! # Pure core, scheduled shell
//!
//! [`JigglerCore`] holds the state machine and decides, for a given instant,
//! whether to jiggle.  It performs no I/O and never reads the clock itself, so
//! tests drive it with explicit instants.  [`Jiggler`] wraps a core in an
//! `Arc<Mutex<_>>`, owns the [`TimerHandle`] and sends the reports.
//!
//! Real motion and the timer both write the last-motion timestamp.
//! Last-write-wins is fine: both writes only ever move it to "now".

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::JigglerConfig;
use crate::report::mouse::{MouseEncoder, MouseReport};
use crate::timer::TimerHandle;
use crate::transport::{HidReport, ReportTransport};

/// Checks per idle threshold.
const TICKS_PER_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JigglerMode {
    #[default]
    Disabled,
    Enabled,
}

impl From<bool> for JigglerMode {
    fn from(enabled: bool) -> Self {
        if enabled {
            JigglerMode::Enabled
        } else {
            JigglerMode::Disabled
        }
    }
}

// ── Core ──────────────────────────────────────────────────────────────────────

/// The jiggler's decision logic, free of timers and I/O.
#[derive(Debug)]
pub struct JigglerCore {
    mode: JigglerMode,
    idle_threshold: Duration,
    delta: i32,
    last_motion: Instant,
    /// Never has buttons latched, so jiggles always carry a zero button byte.
    encoder: MouseEncoder,
}

impl JigglerCore {
    /// A disabled core that considers `now` the last motion.
    pub fn new(idle_threshold: Duration, delta: u8, now: Instant) -> Self {
        Self {
            mode: JigglerMode::Disabled,
            idle_threshold,
            delta: i32::from(delta),
            last_motion: now,
            encoder: MouseEncoder::relative(),
        }
    }

    pub fn mode(&self) -> JigglerMode {
        self.mode
    }

    /// Switches mode.  Returns `true` if the mode actually changed.
    pub fn set_mode(&mut self, mode: JigglerMode) -> bool {
        let changed = self.mode != mode;
        self.mode = mode;
        changed
    }

    pub fn idle_threshold(&self) -> Duration {
        self.idle_threshold
    }

    /// How often [`tick`](Self::tick) should be called while enabled.
    pub fn tick_period(&self) -> Duration {
        (self.idle_threshold / TICKS_PER_THRESHOLD).max(Duration::from_millis(1))
    }

    pub fn last_motion(&self) -> Instant {
        self.last_motion
    }

    /// Records genuine pointer motion at `now`.  Updated in either mode.
    pub fn notify_motion(&mut self, now: Instant) {
        self.last_motion = now;
    }

    /// Decides whether to jiggle at `now`.
    ///
    /// Returns the move/inverse pair to send, or `None` when disabled or when
    /// motion was seen within the idle threshold.  A jiggle restarts the idle
    /// period, so the next one comes no sooner than a full threshold later.
    pub fn tick(&mut self, now: Instant) -> Option<[MouseReport; 2]> {
        if self.mode == JigglerMode::Disabled {
            return None;
        }
        if now.saturating_duration_since(self.last_motion) < self.idle_threshold {
            return None;
        }
        self.last_motion = now;
        let d = self.delta;
        Some([
            self.encoder.build_report(d, d, 0),
            self.encoder.build_report(-d, -d, 0),
        ])
    }
}

// ── Scheduled jiggler ─────────────────────────────────────────────────────────

/// A [`JigglerCore`] driven by a repeating timer, sending through a transport.
///
/// One per input session.  Dropping it cancels the timer.
pub struct Jiggler {
    core: Arc<Mutex<JigglerCore>>,
    transport: Arc<dyn ReportTransport>,
    timer: Mutex<Option<TimerHandle>>,
}

impl Jiggler {
    /// A disabled jiggler.  Call [`set_mode`](Self::set_mode) to start it.
    pub fn new(config: &JigglerConfig, transport: Arc<dyn ReportTransport>) -> Self {
        let core = JigglerCore::new(config.idle_threshold(), config.delta, Instant::now());
        Self {
            core: Arc::new(Mutex::new(core)),
            transport,
            timer: Mutex::new(None),
        }
    }

    pub fn mode(&self) -> JigglerMode {
        lock(&self.core).mode()
    }

    pub fn is_enabled(&self) -> bool {
        self.mode() == JigglerMode::Enabled
    }

    /// Enables or disables the jiggler.  Setting the current mode is a no-op.
    ///
    /// Enabling spawns the timer task, so it must be called from within a
    /// tokio runtime.
    pub fn set_mode(&self, mode: JigglerMode) {
        let period = {
            let mut core = lock(&self.core);
            if !core.set_mode(mode) {
                return;
            }
            core.tick_period()
        };

        let mut timer = lock(&self.timer);
        match mode {
            JigglerMode::Enabled => {
                *timer = Some(self.schedule(period));
                info!(period_ms = period.as_millis() as u64, "jiggler enabled");
            }
            JigglerMode::Disabled => {
                if let Some(handle) = timer.take() {
                    handle.cancel();
                }
                info!("jiggler disabled");
            }
        }
    }

    /// Records genuine pointer motion now.
    pub fn notify_motion(&self) {
        lock(&self.core).notify_motion(Instant::now());
    }

    fn schedule(&self, period: Duration) -> TimerHandle {
        let core = Arc::clone(&self.core);
        let transport = Arc::clone(&self.transport);
        TimerHandle::every(period, move || {
            let core = Arc::clone(&core);
            let transport = Arc::clone(&transport);
            async move {
                let pair = lock(&core).tick(Instant::now());
                let Some(reports) = pair else {
                    return;
                };
                debug!("idle threshold reached; jiggling");
                for report in reports {
                    if let Err(e) = transport.transmit(&HidReport::Mouse(report)).await {
                        warn!("jiggle failed: {e}");
                        return;
                    }
                }
            }
        })
    }
}

impl std::fmt::Debug for Jiggler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Jiggler")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
