//! Structured logging configuration for TitleSwipe

use std::str::FromStr;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{
    fmt::{self, time::UtcTime, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logging configuration for TitleSwipe
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Required for file output
    pub file_path: Option<String>,
    /// Include source file and line numbers
    pub include_source: bool,
    pub include_thread_names: bool,
    /// Trace every event through the gesture path
    pub gesture_tracing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable, multi-line
    Pretty,
    Compact,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogOutput {
    Stdout,
    File,
    Both,
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stdout" => Ok(LogOutput::Stdout),
            "file" => Ok(LogOutput::File),
            "both" => Ok(LogOutput::Both),
            _ => Err(format!("Invalid log output: {}", s)),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            include_source: false,
            include_thread_names: false,
            gesture_tracing: false,
        }
    }
}

fn env_value<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|value| value.parse().ok())
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|value| value.eq_ignore_ascii_case("true") || value == "1")
}

impl LogConfig {
    /// Verbose configuration for working on the gesture engine
    pub fn development() -> Self {
        Self {
            level: LogLevel::Debug,
            format: LogFormat::Pretty,
            include_source: true,
            gesture_tracing: true,
            ..Self::default()
        }
    }

    /// Load configuration from `TITLESWIPE_LOG_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(level) = env_value("TITLESWIPE_LOG_LEVEL") {
            config.level = level;
        }
        if let Some(format) = env_value("TITLESWIPE_LOG_FORMAT") {
            config.format = format;
        }
        if let Some(output) = env_value("TITLESWIPE_LOG_OUTPUT") {
            config.output = output;
        }
        if let Ok(file_path) = std::env::var("TITLESWIPE_LOG_FILE") {
            config.file_path = Some(file_path);
        }
        if let Some(include_source) = env_flag("TITLESWIPE_LOG_SOURCE") {
            config.include_source = include_source;
        }
        if let Some(gesture_tracing) = env_flag("TITLESWIPE_LOG_GESTURES") {
            config.gesture_tracing = gesture_tracing;
        }

        config
    }

    /// Raise the level to debug when `verbose` is set
    pub fn with_verbosity(mut self, verbose: bool) -> Self {
        if verbose && matches!(self.level, LogLevel::Info | LogLevel::Warn | LogLevel::Error) {
            self.level = LogLevel::Debug;
        }
        self
    }

    fn filter_directives(&self) -> String {
        let mut directives = format!("titleswipe={}", self.level.as_directive());
        if self.gesture_tracing {
            directives.push_str(",titleswipe::services::gesture_classifier=trace");
            directives.push_str(",titleswipe::macos::event_monitor=trace");
        }
        directives
    }
}

/// Install the global tracing subscriber
pub fn init_logging(config: &LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let layers: Vec<BoxedLayer> = match (config.output, &config.file_path) {
        (LogOutput::Stdout, _) => vec![fmt_layer(config, std::io::stdout)],
        (LogOutput::File, Some(path)) => vec![file_layer(config, path)?],
        (LogOutput::Both, Some(path)) => {
            vec![fmt_layer(config, std::io::stdout), file_layer(config, path)?]
        }
        (LogOutput::File | LogOutput::Both, None) => {
            return Err("File path required for file output".into());
        }
    };

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directives()));

    tracing_subscriber::registry()
        .with(layers.with_filter(filter))
        .try_init()?;

    info!("Logging initialized with config: {:?}", config);
    Ok(())
}

fn file_layer(config: &LogConfig, path: &str) -> Result<BoxedLayer, Box<dyn std::error::Error>> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    Ok(fmt_layer(config, Mutex::new(file)))
}

fn fmt_layer<W>(config: &LogConfig, writer: W) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer::<Registry>()
        .with_writer(writer)
        .with_timer(UtcTime::rfc_3339())
        .with_thread_names(config.include_thread_names)
        .with_file(config.include_source)
        .with_line_number(config.include_source);

    match config.format {
        LogFormat::Pretty => Box::new(layer.pretty()),
        LogFormat::Compact => Box::new(layer.compact()),
        LogFormat::Json => Box::new(layer.json()),
    }
}

/// Time a block and log its duration
#[macro_export]
macro_rules! trace_performance {
    ($name:expr, $block:block) => {{
        let span = tracing::info_span!("performance", operation = $name);
        let _enter = span.enter();
        let start = std::time::Instant::now();

        let result = $block;

        tracing::info!(
            operation = $name,
            duration_ms = start.elapsed().as_millis() as u64,
            "Performance trace"
        );
        result
    }};
}
