//! Logging service

use serde::{Deserialize, Serialize};

/// Log verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Initialize logging with the specified level
pub fn init_logging(level: LogLevel) -> Result<(), Box<dyn std::error::Error>> {
    let filter = match level {
        LogLevel::Error => "cropflow=error",
        LogLevel::Warn => "cropflow=warn",
        LogLevel::Info => "cropflow=info",
        LogLevel::Debug => "cropflow=debug",
        LogLevel::Trace => "cropflow=trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
