//! Structured logging setup for diffsync servers
//!
//! The store and engine crates only emit `tracing` events. This crate turns
//! them into output:
//!
//! - **Console**: JSON lines (default) or human-readable
//! - **File**: JSON lines through `tracing-appender`, rotated daily, hourly,
//!   or never
//! - **Filtering**: `RUST_LOG` when set, otherwise the configured level
//!
//! # Quick Start
//!
//! ```ignore
//! use diffsync_logging::{LogBuilder, LogConfig};
//!
//! // Keep the guard alive for as long as file output is needed
//! let _guard = LogBuilder::new()
//!     .with_config(LogConfig::development())
//!     .try_init()?;
//!
//! tracing::info!(document_id = "1234", "Serving document");
//! ```

pub mod config;
pub mod error;

pub use config::{ConsoleFormat, FileConfig, FileRotation, LogConfig};
pub use error::{LoggingError, LoggingResult};
pub use tracing_appender::non_blocking::WorkerGuard;

use std::fs::{self, File};

use tracing::Subscriber;
use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Builder for configuring and installing the diffsync subscriber
///
/// By default, console output uses JSON lines. Use
/// [`LogConfig::development()`] for human-readable output.
#[derive(Debug, Clone, Default)]
pub struct LogBuilder {
    config: LogConfig,
}

impl LogBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.level = level.into();
        self
    }

    /// Enable or disable console output
    ///
    /// Enabling keeps an already configured format, JSON otherwise.
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console = match (enabled, self.config.console) {
            (false, _) => None,
            (true, Some(format)) => Some(format),
            (true, None) => Some(ConsoleFormat::Json),
        };
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// Build the subscriber without installing it
    ///
    /// The returned guard, if any, flushes file output when dropped.
    pub fn build(
        self,
    ) -> LoggingResult<(impl Subscriber + Send + Sync + 'static, Option<WorkerGuard>)> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&self.config.level)?,
        };

        let mut layers: Vec<BoxedLayer> = Vec::new();
        if let Some(format) = self.config.console {
            layers.push(self.console_layer(format));
        }

        let mut guard = None;
        if let Some(file) = &self.config.file {
            let (writer, file_guard) = file_writer(file)?;
            layers.push(json_layer(&self.config, writer));
            guard = Some(file_guard);
        }

        let subscriber = tracing_subscriber::registry().with(layers).with(filter);
        Ok((subscriber, guard))
    }

    /// Install the subscriber globally
    ///
    /// # Errors
    ///
    /// Fails if the level is not a valid filter, the log file cannot be
    /// opened, or a global subscriber is already set.
    pub fn try_init(self) -> LoggingResult<Option<WorkerGuard>> {
        let (subscriber, guard) = self.build()?;
        subscriber.try_init()?;
        Ok(guard)
    }

    fn console_layer(&self, format: ConsoleFormat) -> BoxedLayer {
        match format {
            ConsoleFormat::Pretty { ansi } => fmt::layer().with_ansi(ansi).with_target(true).boxed(),
            ConsoleFormat::Json => json_layer(&self.config, std::io::stdout),
        }
    }
}

/// JSON lines with event fields flattened to the top level
fn json_layer<W>(config: &LogConfig, writer: W) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(config.include_spans)
        .flatten_event(true)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_writer(writer)
        .boxed()
}

/// Open the file writer; `Never` truncates a single file, the others append
/// to rolling files
fn file_writer(config: &FileConfig) -> LoggingResult<(NonBlocking, WorkerGuard)> {
    fs::create_dir_all(&config.directory)?;

    let rotation = match config.rotation {
        FileRotation::Never => {
            let file = File::create(config.directory.join(format!("{}.log", config.prefix)))?;
            return Ok(tracing_appender::non_blocking(file));
        }
        FileRotation::Daily => Rotation::DAILY,
        FileRotation::Hourly => Rotation::HOURLY,
    };

    let appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(config.prefix.as_str())
        .filename_suffix("log")
        .build(&config.directory)?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Install quiet logging for tests, ignoring an already installed subscriber
pub fn init_testing() {
    let _ = LogBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}
