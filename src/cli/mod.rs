//! Command-line interface for TitleSwipe
//!
//! `run` starts the gesture daemon from `main`; every other command is handled
//! here by [`TitleSwipeCliExecutor`].

use crate::config::preferences::Preferences;
use crate::macos::permissions::{
    open_privacy_pane, prompt_accessibility_permission, prompt_input_monitoring_permission,
    PermissionReport, PrivacyPane,
};
use crate::replay::{replay_trace, GestureTrace, ReplayReport};
use crate::{trace_performance, Result, TitleSwipeError};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{error, info};

/// TitleSwipe command-line interface
#[derive(Parser, Debug)]
#[command(name = "titleswipe")]
#[command(about = "Two-finger title-bar flicks for window placement on macOS")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "TitleSwipe Team")]
pub struct TitleSwipeCli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Preferences file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable JSON output for machine-readable results
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl TitleSwipeCli {
    pub fn preferences_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Preferences::default_path)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch scroll events and classify title-bar flicks
    ///
    /// Windows are read from the Quartz window list, which cannot move them,
    /// so every flick is logged as a failed placement. Use `replay` to see
    /// the resulting frames.
    Run,

    /// Feed a recorded gesture trace through the classifier
    Replay {
        /// JSON trace file
        trace: PathBuf,
    },

    /// Preference management commands
    Preferences(PreferenceCommands),

    /// Permission management commands
    Permissions(PermissionCommands),
}

#[derive(Args, Debug)]
pub struct PreferenceCommands {
    #[command(subcommand)]
    pub action: PreferenceActions,
}

#[derive(Subcommand, Debug)]
pub enum PreferenceActions {
    /// Show the effective preferences
    Show,

    /// Print the preferences file location
    Path,

    /// Turn title-bar flicks on
    Enable,

    /// Turn title-bar flicks off
    Disable,
}

#[derive(Args, Debug)]
pub struct PermissionCommands {
    #[command(subcommand)]
    pub action: PermissionActions,
}

#[derive(Subcommand, Debug)]
pub enum PermissionActions {
    /// Check permission status
    Status,

    /// Trigger the system permission prompt
    Request {
        #[arg(value_enum)]
        permission: PermissionKind,
    },

    /// Open the matching System Settings pane
    Open {
        #[arg(value_enum)]
        permission: PermissionKind,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionKind {
    Accessibility,
    InputMonitoring,
}

impl From<PermissionKind> for PrivacyPane {
    fn from(kind: PermissionKind) -> Self {
        match kind {
            PermissionKind::Accessibility => PrivacyPane::Accessibility,
            PermissionKind::InputMonitoring => PrivacyPane::InputMonitoring,
        }
    }
}

/// CLI command executor
pub struct TitleSwipeCliExecutor {
    preferences_path: PathBuf,
    json_output: bool,
}

impl TitleSwipeCliExecutor {
    pub fn new(preferences_path: PathBuf, json_output: bool) -> Self {
        Self {
            preferences_path,
            json_output,
        }
    }

    /// Execute a CLI command
    pub async fn execute(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Run => Err(TitleSwipeError::ConfigurationError(
                "the run command is handled by the daemon entry point".into(),
            )
            .into()),
            Commands::Replay { trace } => self.execute_replay(trace).await,
            Commands::Preferences(cmd) => self.execute_preference_command(cmd).await,
            Commands::Permissions(cmd) => self.execute_permission_command(cmd).await,
        }
    }

    async fn execute_replay(&self, path: PathBuf) -> Result<()> {
        info!(path = %path.display(), "Replaying gesture trace");

        let trace = GestureTrace::load(&path)?;
        let report = trace_performance!("replay_trace", { replay_trace(&trace)? });

        if self.json_output {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_replay_report(&report);
        }
        Ok(())
    }

    async fn execute_preference_command(&self, cmd: PreferenceCommands) -> Result<()> {
        match cmd.action {
            PreferenceActions::Show => {
                let preferences = Preferences::load(&self.preferences_path)?.with_env_overrides();
                if self.json_output {
                    println!("{}", serde_json::to_string_pretty(&preferences)?);
                } else {
                    println!("Preferences ({}):", self.preferences_path.display());
                    println!("  Title swipes enabled: {}", preferences.enable_title_swipes);
                }
            }
            PreferenceActions::Path => {
                println!("{}", self.preferences_path.display());
            }
            PreferenceActions::Enable => self.set_title_swipes(true)?,
            PreferenceActions::Disable => self.set_title_swipes(false)?,
        }

        Ok(())
    }

    fn set_title_swipes(&self, enabled: bool) -> Result<()> {
        let mut preferences = Preferences::load(&self.preferences_path)?;
        preferences.enable_title_swipes = enabled;
        preferences.save(&self.preferences_path)?;

        info!(enabled, path = %self.preferences_path.display(), "Updated title swipe preference");
        if !self.json_output {
            let state = if enabled { "enabled" } else { "disabled" };
            println!("Title swipes {state}");
        }
        Ok(())
    }

    async fn execute_permission_command(&self, cmd: PermissionCommands) -> Result<()> {
        match cmd.action {
            PermissionActions::Status => {
                let report = PermissionReport::current()?;
                if self.json_output {
                    let status_json = serde_json::json!({
                        "accessibility": report.accessibility,
                        "input_monitoring": report.input_monitoring,
                        "can_observe_scroll_events": report.can_observe_scroll_events(),
                    });
                    println!("{}", serde_json::to_string_pretty(&status_json)?);
                } else {
                    println!("Permission Status:");
                    println!("  Accessibility: {}", report.accessibility);
                    println!("  Input Monitoring: {}", report.input_monitoring);
                    println!(
                        "  Scroll events observable: {}",
                        report.can_observe_scroll_events()
                    );
                }
            }
            PermissionActions::Request { permission } => {
                info!(?permission, "Requesting permission");
                let granted = match permission {
                    PermissionKind::Accessibility => prompt_accessibility_permission()?,
                    PermissionKind::InputMonitoring => prompt_input_monitoring_permission()?,
                };
                if granted {
                    println!("Permission granted");
                } else {
                    println!("Permission not granted yet - approve it in System Settings");
                }
            }
            PermissionActions::Open { permission } => {
                open_privacy_pane(permission.into())?;
            }
        }

        Ok(())
    }
}

fn print_replay_report(report: &ReplayReport) {
    println!("Dispatched actions: {}", report.dispatched.len());
    for record in &report.dispatched {
        println!(
            "  window {} -> {} (screen {})",
            record.window_id, record.action, record.screen_id
        );
    }

    println!("Final frames:");
    for entry in &report.final_frames {
        let frame = entry.frame;
        println!(
            "  window {}: x={} y={} w={} h={}",
            entry.window_id, frame.origin.x, frame.origin.y, frame.size.width, frame.size.height
        );
    }

    let metrics = &report.metrics;
    println!(
        "Events seen: {}, flicks: {}, title bar hits: {}",
        metrics.events_seen, metrics.flicks_triggered, metrics.title_bar_hits
    );
}

/// Execute a non-daemon command, reporting failures the way `--json` asks
pub async fn run_cli(cli: TitleSwipeCli) -> Result<()> {
    let executor = TitleSwipeCliExecutor::new(cli.preferences_path(), cli.json);

    if let Err(e) = executor.execute(cli.command).await {
        if cli.json {
            let error_json = serde_json::json!({
                "error": true,
                "message": e.to_string()
            });
            println!("{}", serde_json::to_string_pretty(&error_json)?);
        } else {
            error!("Command failed: {}", e);
        }
        std::process::exit(1);
    }

    Ok(())
}
