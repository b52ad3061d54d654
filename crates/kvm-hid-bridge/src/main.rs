//! KVM-HID bridge entry point.
//!
//! Reads controller intents as JSON lines on stdin, types them into the
//! target machine through the USB HID gadget, and writes progress and error
//! events as JSON lines on stdout.  Logs go to stderr so they never mix with
//! the event stream.
//!
//! # Usage
//!
//! ```text
//! kvm-hid-bridge [OPTIONS]
//!
//! Options:
//!   --config <PATH>                 TOML config file [default: /etc/kvm-hid/bridge.toml]
//!   --keyboard-device <PATH>        Keyboard gadget device
//!   --mouse-absolute-device <PATH>  Absolute mouse gadget device
//!   --mouse-relative-device <PATH>  Relative mouse gadget device
//!   --mouse-mode <MODE>             absolute | relative
//!   --layout <TAG>                  en-US | de-DE | fr-FR
//!   --jiggler                       Start with the mouse jiggler enabled
//!   --dry-run                       Log reports instead of writing devices
//! ```
//!
//! # Precedence
//!
//! Built-in defaults, then the config file, then CLI flags / environment
//! variables.  `RUST_LOG`, when set, overrides `log_level` from the file.
//!
//! | Variable               | Flag                      |
//! |------------------------|---------------------------|
//! | `KVM_HID_CONFIG`       | `--config`                |
//! | `KVM_HID_KEYBOARD`     | `--keyboard-device`       |
//! | `KVM_HID_MOUSE_ABS`    | `--mouse-absolute-device` |
//! | `KVM_HID_MOUSE_REL`    | `--mouse-relative-device` |
//! | `KVM_HID_MOUSE_MODE`   | `--mouse-mode`            |
//! | `KVM_HID_LAYOUT`       | `--layout`                |

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kvm_hid_bridge::application::Dispatcher;
use kvm_hid_bridge::domain::BridgeConfig;
use kvm_hid_bridge::infrastructure::{
    read_intents, write_events, GadgetTransport, LoggingTransport,
};
use kvm_hid_core::{InputSession, LayoutId, MouseMode, ReportTransport};

/// Capacity of the intent and event channels.
const CHANNEL_CAPACITY: usize = 64;

/// How long to wait for queued events to reach stdout on shutdown.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

// ── CLI argument definitions ──────────────────────────────────────────────────

/// KVM-HID bridge.
///
/// Turns JSON input intents on stdin into USB HID reports on the gadget
/// device files.
#[derive(Debug, Parser)]
#[command(
    name = "kvm-hid-bridge",
    about = "Controller-to-USB-gadget bridge for KVM-HID",
    version
)]
struct Cli {
    /// Path to the TOML configuration file.  A missing file means defaults.
    #[arg(long, default_value = "/etc/kvm-hid/bridge.toml", env = "KVM_HID_CONFIG")]
    config: PathBuf,

    /// Keyboard gadget device (overrides `devices.keyboard`).
    #[arg(long, env = "KVM_HID_KEYBOARD")]
    keyboard_device: Option<PathBuf>,

    /// Absolute mouse gadget device (overrides `devices.mouse_absolute`).
    #[arg(long, env = "KVM_HID_MOUSE_ABS")]
    mouse_absolute_device: Option<PathBuf>,

    /// Relative mouse gadget device (overrides `devices.mouse_relative`).
    #[arg(long, env = "KVM_HID_MOUSE_REL")]
    mouse_relative_device: Option<PathBuf>,

    /// Mouse encoding: `absolute` or `relative`.
    #[arg(long, env = "KVM_HID_MOUSE_MODE")]
    mouse_mode: Option<MouseMode>,

    /// Keyboard layout used for paste: `en-US`, `de-DE` or `fr-FR`.
    #[arg(long, env = "KVM_HID_LAYOUT")]
    layout: Option<LayoutId>,

    /// Start with the mouse jiggler enabled.
    #[arg(long)]
    jiggler: bool,

    /// Log reports instead of writing them to the gadget devices.
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    /// Applies the CLI overrides on top of `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the merged configuration fails validation.
    fn into_bridge_config(self, base: BridgeConfig) -> anyhow::Result<BridgeConfig> {
        let mut config = base;

        if let Some(path) = self.keyboard_device {
            config.devices.keyboard = path;
        }
        if let Some(path) = self.mouse_absolute_device {
            config.devices.mouse_absolute = path;
        }
        if let Some(path) = self.mouse_relative_device {
            config.devices.mouse_relative = path;
        }
        if let Some(mode) = self.mouse_mode {
            config.mouse.mode = mode;
        }
        if let Some(layout) = self.layout {
            config.keyboard.layout = layout;
        }
        if self.jiggler {
            config.jiggler.enabled = true;
        }

        config
            .validate()
            .context("invalid configuration after applying command-line overrides")?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. CLI arguments are parsed and the config file is loaded.
/// 2. `tracing_subscriber` is initialised, writing to stderr.  `RUST_LOG`
///    wins over the file's `log_level`.
/// 3. The transport is built: gadget device files, or the dry-run logger.
/// 4. One [`InputSession`] is created and handed to the [`Dispatcher`].
/// 5. A reader task feeds stdin intents to the dispatcher and a writer task
///    drains events to stdout.
/// 6. On EOF or Ctrl+C the dispatcher cancels any paste, stops the jiggler
///    and releases every key and button.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Parse CLI arguments and load config ───────────────────────────────────
    let cli = Cli::parse();
    let dry_run = cli.dry_run;
    let base = BridgeConfig::load(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    let config = cli.into_bridge_config(base)?;

    // ── Logging setup ─────────────────────────────────────────────────────────
    let log_level = config.log_level.clone();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .init();

    info!(
        "KVM-HID bridge starting — layout={}, mouse={}, jiggler={}, dry_run={dry_run}",
        config.keyboard.layout, config.mouse.mode, config.jiggler.enabled
    );

    // ── Transport and session ─────────────────────────────────────────────────
    let transport: Arc<dyn ReportTransport> = if dry_run {
        Arc::new(LoggingTransport::new())
    } else {
        info!(
            "gadget devices: keyboard={}, absolute={}, relative={}",
            config.devices.keyboard.display(),
            config.devices.mouse_absolute.display(),
            config.devices.mouse_relative.display()
        );
        Arc::new(GadgetTransport::new(&config.devices))
    };
    let session = Arc::new(Mutex::new(InputSession::new(
        &config.session_config(),
        transport,
    )));

    // ── Channels and I/O tasks ────────────────────────────────────────────────
    let (intent_tx, intent_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let dispatcher = Dispatcher::new(session, event_tx.clone());

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        if let Err(e) = write_events(&mut stdout, event_rx).await {
            warn!("event writer stopped: {e}");
        }
    });
    let reader = tokio::spawn(async move {
        let stdin = BufReader::new(tokio::io::stdin());
        if let Err(e) = read_intents(stdin, intent_tx, event_tx).await {
            warn!("intent reader stopped: {e}");
        }
    });

    // ── Main loop ─────────────────────────────────────────────────────────────
    tokio::select! {
        () = dispatcher.run(intent_rx) => info!("controller closed the input stream"),
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => info!("received Ctrl+C — initiating graceful shutdown"),
            Err(e) => tracing::error!("failed to listen for Ctrl+C signal: {e}"),
        },
    }

    // ── Shutdown ──────────────────────────────────────────────────────────────
    dispatcher.shutdown().await;
    reader.abort();
    drop(dispatcher);
    if tokio::time::timeout(FLUSH_TIMEOUT, writer).await.is_err() {
        warn!("timed out flushing events to stdout");
    }

    info!("KVM-HID bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
