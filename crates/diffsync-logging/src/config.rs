//! Logging configuration
//!
//! A [`LogConfig`] is plain serde data so servers can load it from their own
//! config files. Presets cover the three ways diffsync runs: an interactive
//! developer session, a test binary, and a long-running server.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `"info"` or
    /// `"diffsync_engine=debug,info"`
    pub level: String,

    /// Console output; `None` disables it
    pub console: Option<ConsoleFormat>,

    /// JSON lines file output; `None` disables it
    pub file: Option<FileConfig>,

    /// Attach the entered spans (`patch`, `diff`) to JSON events
    pub include_spans: bool,

    /// Attach source file and line to JSON events
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console: Some(ConsoleFormat::Json),
            file: None,
            include_spans: true,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Colored human-readable console at `debug`
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            console: Some(ConsoleFormat::Pretty { ansi: true }),
            include_location: true,
            ..Self::default()
        }
    }

    /// Uncolored console at `warn`, so test output stays readable
    pub fn testing() -> Self {
        Self {
            level: "warn".to_string(),
            console: Some(ConsoleFormat::Pretty { ansi: false }),
            include_spans: false,
            ..Self::default()
        }
    }

    /// Daily rotated JSON lines under `log_dir`, no console
    pub fn production(log_dir: PathBuf) -> Self {
        Self {
            console: None,
            file: Some(FileConfig::new(log_dir)),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleFormat {
    /// One JSON object per event
    Json,
    /// Human-readable lines
    Pretty { ansi: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    pub directory: PathBuf,
    /// File name prefix; files are named `<prefix>.log` or
    /// `<prefix>.<date>.log` when rotated
    pub prefix: String,
    pub rotation: FileRotation,
}

impl FileConfig {
    /// Daily rotated `diffsync` files in `directory`
    pub fn new(directory: PathBuf) -> Self {
        Self {
            directory,
            prefix: "diffsync".to_string(),
            rotation: FileRotation::Daily,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRotation {
    #[default]
    Daily,
    Hourly,
    /// A single file, truncated on startup
    Never,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_json_console() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.console, Some(ConsoleFormat::Json));
        assert!(config.file.is_none());
    }

    #[test]
    fn test_presets() {
        let dev = LogConfig::development();
        assert_eq!(dev.console, Some(ConsoleFormat::Pretty { ansi: true }));
        assert!(dev.include_location);

        let test = LogConfig::testing();
        assert_eq!(test.level, "warn");
        assert_eq!(test.console, Some(ConsoleFormat::Pretty { ansi: false }));

        let prod = LogConfig::production(PathBuf::from("/var/log/diffsync"));
        assert!(prod.console.is_none());
        assert_eq!(
            prod.file,
            Some(FileConfig::new(PathBuf::from("/var/log/diffsync")))
        );
    }

    #[test]
    fn test_config_loads_from_json() {
        let config: LogConfig = serde_json::from_str(
            r#"{
                "level": "diffsync_engine=debug,warn",
                "console": { "pretty": { "ansi": false } },
                "file": { "directory": "/tmp/diffsync", "prefix": "sync", "rotation": "hourly" },
                "include_spans": false,
                "include_location": false
            }"#,
        )
        .unwrap();

        assert_eq!(config.console, Some(ConsoleFormat::Pretty { ansi: false }));
        let file = config.file.unwrap();
        assert_eq!(file.prefix, "sync");
        assert_eq!(file.rotation, FileRotation::Hourly);
    }
}
