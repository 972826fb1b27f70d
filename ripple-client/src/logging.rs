use log::LevelFilter;
use simplelog::{ConfigBuilder, WriteLogger};
use std::fs::File;
use std::path::PathBuf;

/// Logging configuration for the client SDK
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Master switch to enable/disable all logging
    pub enabled: bool,
    /// Path to the log file
    pub log_file: PathBuf,
    /// Whether to truncate the log file on startup
    pub clear_on_startup: bool,
    /// Feature flags for specific logging categories
    pub features: LogFeatures,
    /// Overall log level
    pub level: LevelFilter,
}

/// Feature flags for specific logging categories
#[derive(Debug, Clone)]
pub struct LogFeatures {
    /// Log outgoing API calls and retries
    pub api_calls: bool,
    /// Log session refresh activity
    pub auth: bool,
    /// Log optimistic store mutations and rollbacks
    pub stores: bool,
    /// Log inbound socket events and echo suppression
    pub socket: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_file: PathBuf::from("ripple_client.log"),
            clear_on_startup: false,
            features: LogFeatures::default(),
            level: LevelFilter::Info,
        }
    }
}

impl Default for LogFeatures {
    fn default() -> Self {
        Self {
            api_calls: true,
            auth: true,
            stores: true,
            socket: true,
        }
    }
}

impl LogConfig {
    /// Configuration with all logging off
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Only warnings and errors, no per-category chatter
    pub fn minimal() -> Self {
        Self {
            enabled: true,
            level: LevelFilter::Warn,
            features: LogFeatures {
                api_calls: false,
                auth: false,
                stores: false,
                socket: false,
            },
            ..Default::default()
        }
    }
}

/// Initializes the file-backed logger. Returns `Ok(())` without
/// installing anything when logging is disabled; calling this twice is
/// an error from the logger facade.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    if !config.enabled {
        return Ok(());
    }

    let file = if config.clear_on_startup {
        File::create(&config.log_file)?
    } else {
        File::options()
            .create(true)
            .append(true)
            .open(&config.log_file)?
    };

    let mut builder = ConfigBuilder::new();
    builder.set_target_level(LevelFilter::Error);
    if !config.features.api_calls {
        builder.add_filter_ignore_str("ripple_client::api");
    }
    if !config.features.auth {
        builder.add_filter_ignore_str("ripple_client::auth");
        builder.add_filter_ignore_str("ripple_client::session");
    }
    if !config.features.stores {
        builder.add_filter_ignore_str("ripple_client::store");
    }
    if !config.features.socket {
        builder.add_filter_ignore_str("ripple_client::socket");
    }

    WriteLogger::init(config.level, builder.build(), file)?;
    log::info!("logging initialized at {}", config.log_file.display());
    Ok(())
}
