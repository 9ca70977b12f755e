//! Logging setup for the `xtraq` binary.
//!
//! stdout is reserved for command output; all logging goes to stderr,
//! either human-readable or JSON lines depending on `--debug`/`XTRAQ_LOG`.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Human,
    Jsonl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
        };
        write!(f, "{s}")
    }
}

pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl LogConfig {
    pub fn from_flags(verbose: bool, debug: bool) -> Self {
        let level = if debug {
            LogLevel::Debug
        } else if verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };
        let format = match std::env::var("XTRAQ_LOG_FORMAT").ok().as_deref() {
            Some("jsonl") | Some("json") => LogFormat::Jsonl,
            _ => LogFormat::Human,
        };
        LogConfig { level, format }
    }
}

/// Must be called once at startup before any `tracing` event is emitted.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("xtraq={}", config.level)));

    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    match config.format {
        LogFormat::Human => {
            tracing_subscriber::registry().with(filter).with(fmt_layer).init();
        }
        LogFormat::Jsonl => {
            tracing_subscriber::registry().with(filter).with(fmt_layer.json()).init();
        }
    }
}
