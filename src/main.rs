//! TitleSwipe - Two-finger title-bar flicks for macOS
//!
//! Main entry point. `run` starts the gesture daemon; every other subcommand
//! is handed to the CLI executor.

use clap::Parser;
use std::path::PathBuf;
use titleswipe::{
    cli::{run_cli, Commands, TitleSwipeCli},
    logging::{init_logging, LogConfig},
    Result, TitleSwipeError,
};
use tracing::error;

#[cfg(target_os = "macos")]
mod daemon {
    use std::path::PathBuf;
    use std::sync::Arc;
    use titleswipe::{
        config::preferences::PreferenceStore,
        macos::{
            core_graphics::SystemDisplayProvider, event_tap::EventTapMonitor,
            permissions::PermissionReport, window_list::WindowListProvider,
        },
        services::{AccessibilityPlacementExecutor, GestureClassifier, GestureServices},
        Result, TitleSwipeError,
    };
    use tokio::{
        signal,
        sync::broadcast,
        time::{interval, Duration},
    };
    use tracing::{debug, error, info, instrument, warn};

    /// Running gesture daemon
    pub struct TitleSwipeApp {
        classifier: Option<GestureClassifier>,
        preferences: Arc<PreferenceStore>,
        shutdown_tx: broadcast::Sender<()>,
        shutdown_rx: broadcast::Receiver<()>,
    }

    impl TitleSwipeApp {
        #[instrument(skip_all)]
        pub async fn new(preferences_path: PathBuf) -> Result<Self> {
            info!("TitleSwipe v{}", env!("CARGO_PKG_VERSION"));

            let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

            Self::check_initial_permissions()?;

            let preferences = Arc::new(PreferenceStore::open(preferences_path)?);
            let monitor = Arc::new(EventTapMonitor::start()?);
            let windows = Arc::new(WindowListProvider::new());
            if !windows.can_move_windows() {
                warn!(
                    "Windows come from the read-only Quartz window list; flicks are classified \
                     and logged but windows will not move"
                );
            }
            let displays = Arc::new(SystemDisplayProvider::new());
            let executor = Arc::new(AccessibilityPlacementExecutor::new(
                windows.clone(),
                displays.clone(),
            ));

            let classifier = GestureClassifier::new(
                monitor,
                GestureServices {
                    registry: windows.clone(),
                    accessibility: windows,
                    displays,
                    executor,
                    preferences: preferences.clone(),
                },
            )?;
            debug!("Gesture classifier registered");

            Ok(Self {
                classifier: Some(classifier),
                preferences,
                shutdown_tx,
                shutdown_rx,
            })
        }

        #[instrument(skip_all)]
        pub async fn run(&mut self) -> Result<()> {
            let shutdown_tx = self.shutdown_tx.clone();
            tokio::spawn(async move {
                if let Err(e) = Self::setup_signal_handlers(shutdown_tx).await {
                    error!("Failed to setup signal handlers: {}", e);
                }
            });

            info!("TitleSwipe is watching for title-bar flicks");

            let mut metrics_tick = interval(Duration::from_secs(30));
            let mut preferences_tick = interval(Duration::from_secs(5));

            loop {
                tokio::select! {
                    _ = self.shutdown_rx.recv() => {
                        info!("Shutdown signal received");
                        break;
                    }

                    _ = metrics_tick.tick() => self.log_metrics(),

                    _ = preferences_tick.tick() => {
                        if let Err(e) = self.preferences.reload() {
                            warn!("Preferences reload failed: {}", e);
                        }
                    }
                }
            }

            self.shutdown()
        }

        fn shutdown(&mut self) -> Result<()> {
            info!("Shutting down TitleSwipe...");
            self.log_metrics();
            if let Some(classifier) = self.classifier.take() {
                classifier.close()?;
            }
            info!("TitleSwipe shutdown complete");
            Ok(())
        }

        fn log_metrics(&self) {
            if let Some(classifier) = &self.classifier {
                let metrics = classifier.metrics();
                debug!(?metrics, "Classifier metrics");
            }
        }

        fn check_initial_permissions() -> Result<()> {
            let report = PermissionReport::current()?;
            if report.can_observe_scroll_events() {
                info!(?report, "Permissions verified");
                return Ok(());
            }

            error!(
                "Scroll events cannot be observed without Accessibility or Input Monitoring \
                 permission"
            );
            println!("\nRun `titleswipe permissions request accessibility` and restart TitleSwipe.");
            Err(TitleSwipeError::PermissionDenied(
                "Accessibility or Input Monitoring permission is required".to_string(),
            )
            .into())
        }

        async fn setup_signal_handlers(shutdown_tx: broadcast::Sender<()>) -> Result<()> {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            tokio::select! {
                res = signal::ctrl_c() => {
                    match res {
                        Ok(_) => info!("Received SIGINT (Ctrl+C)"),
                        Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
                    }
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM");
                }
            }

            if shutdown_tx.send(()).is_err() {
                warn!("Failed to send shutdown signal - no receivers");
            }

            Ok(())
        }
    }
}

#[cfg(target_os = "macos")]
async fn run_daemon(preferences_path: PathBuf) -> Result<()> {
    let mut app = daemon::TitleSwipeApp::new(preferences_path).await?;
    app.run().await
}

#[cfg(not(target_os = "macos"))]
async fn run_daemon(_preferences_path: PathBuf) -> Result<()> {
    Err(TitleSwipeError::MacOSAPIError(
        "the gesture daemon requires macOS; use `titleswipe replay` elsewhere".to_string(),
    )
    .into())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = TitleSwipeCli::parse();

    let log_config = LogConfig::from_env().with_verbosity(cli.verbose);
    init_logging(&log_config).map_err(|e| {
        TitleSwipeError::ConfigurationError(format!("Failed to initialize logging: {}", e))
    })?;

    if let Commands::Run = cli.command {
        if let Err(e) = run_daemon(cli.preferences_path()).await {
            error!("Application error: {}", e);
            std::process::exit(1);
        }
        return Ok(());
    }

    run_cli(cli).await
}
