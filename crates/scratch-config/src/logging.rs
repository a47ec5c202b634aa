use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Once};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt, TestWriter};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level for all scratch crates, or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs in JSON format.
    #[serde(default)]
    pub json: bool,

    /// Write logs to stderr.
    #[serde(default = "LoggingConfig::default_stderr")]
    pub stderr: bool,

    /// Append logs to the given file path.
    ///
    /// If the file cannot be opened, file logging is disabled while stderr stays active.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    fn default_stderr() -> bool {
        true
    }

    /// Canonical form of a bare level (any case, `warning` accepted). Anything that is not a
    /// bare level passes through as an `EnvFilter` directive string; blank means `info`.
    pub(crate) fn directives_for(level: &str) -> String {
        let level = level.trim();
        if level.is_empty() {
            return Self::default_level();
        }
        match level.to_ascii_lowercase().as_str() {
            "warning" => "warn".to_owned(),
            bare @ ("trace" | "debug" | "info" | "warn" | "error") => bare.to_owned(),
            _ => level.to_owned(),
        }
    }

    fn configured_filter(&self) -> EnvFilter {
        parse_filter(&Self::directives_for(&self.level)).unwrap_or_else(|| EnvFilter::new("info"))
    }

    /// The filter installed by [`init_tracing`].
    ///
    /// `RUST_LOG`, when set, is appended to the configured directives; for a target named in
    /// both, the `RUST_LOG` entry applies. An unparsable combination falls back to `RUST_LOG`
    /// alone, then to the configured level.
    pub fn env_filter(&self) -> EnvFilter {
        let from_env = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        let Some(from_env) = from_env else {
            return self.configured_filter();
        };

        let configured = Self::directives_for(&self.level);
        parse_filter(&format!("{configured},{from_env}"))
            .or_else(|| parse_filter(&from_env))
            .unwrap_or_else(|| self.configured_filter())
    }
}

fn parse_filter(directives: &str) -> Option<EnvFilter> {
    EnvFilter::try_new(directives).ok()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: Self::default_stderr(),
            file: None,
        }
    }
}

/// Append-mode log file shared by every event writer.
struct LogFile(Arc<Mutex<std::fs::File>>);

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogFileWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LogFileWriter(self.0.lock())
    }
}

// Holds the lock for one formatted event so lines from different threads don't interleave.
struct LogFileWriter<'a>(parking_lot::MutexGuard<'a, std::fs::File>);

impl Write for LogFileWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

fn build_writer(config: &LoggingConfig) -> (BoxMakeWriter, bool) {
    let file = config
        .file
        .as_ref()
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        })
        .map(|file| Arc::new(Mutex::new(file)));
    let file_open_failed = config.file.is_some() && file.is_none();

    let mut sinks = BoxMakeWriter::new(io::sink);
    if config.stderr {
        // Debug builds go through `TestWriter` so `cargo test` captures the output.
        sinks = if cfg!(debug_assertions) {
            BoxMakeWriter::new(sinks.and(TestWriter::with_stderr))
        } else {
            BoxMakeWriter::new(sinks.and(io::stderr))
        };
    }
    if let Some(file) = file {
        sinks = BoxMakeWriter::new(sinks.and(LogFile(file)));
    }
    (sinks, file_open_failed)
}

static TRACING_INIT: Once = Once::new();

/// Installs the global `tracing` subscriber.
///
/// Safe to call multiple times; only the first call installs a subscriber.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = config.env_filter();
        let (make_writer, file_open_failed) = build_writer(config);

        let layer: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(filter).with(layer);
        if tracing::subscriber::set_global_default(subscriber).is_ok() && file_open_failed {
            if let Some(path) = config.file.as_ref() {
                tracing::warn!(
                    target: "scratch.config",
                    path = %path.display(),
                    "failed to open log file; file logging is disabled"
                );
            }
        }
    });
}
