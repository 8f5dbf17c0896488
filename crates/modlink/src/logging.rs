use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Target prefix shared by every modlink crate (`modlink_frame`,
/// `modlink_channel`, `modlink_module`, and the binary itself).
const TARGET_PREFIX: &str = "modlink";

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }

    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// `level` for modlink's own targets; dependencies (libloading, clap) never
/// log above `warn`, so `--log-level trace` traces frames, not the world.
pub fn env_filter(level: LogLevel) -> EnvFilter {
    let dependencies = level.as_filter().min(LevelFilter::WARN);
    EnvFilter::builder()
        .with_default_directive(dependencies.into())
        .parse_lossy(format!("{TARGET_PREFIX}={}", level.as_directive()))
}

/// Install the stderr subscriber.
///
/// Only events from this process's copy of the modlink crates are seen.
/// A module built as a separate `cdylib` has its own tracing dispatcher.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter(level))
        .with_ansi(false)
        .with_target(level.as_filter() >= LevelFilter::DEBUG);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}
