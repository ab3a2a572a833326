//! Process-wide logger.

use std::str::FromStr;

use error_stack::{Report, ResultExt};
use log::LevelFilter;

use crate::error::BidonError;

/// Parses a level name such as `"info"` or `"debug"`.
///
/// # Errors
///
/// Returns [`BidonError::Configuration`] for unknown level names.
pub fn parse_level(level: &str) -> Result<LevelFilter, Report<BidonError>> {
    LevelFilter::from_str(level).change_context(BidonError::Configuration {
        message: format!("unknown log level '{level}'"),
    })
}

/// Installs the stdout logger. Call once at startup.
///
/// # Errors
///
/// Fails on an unknown level or when a logger is already installed.
pub fn init_logging(level: &str) -> Result<(), Report<BidonError>> {
    let level = parse_level(level)?;

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}  {} {}",
                chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()
        .change_context(BidonError::Configuration {
            message: "failed to install logger".to_string(),
        })
}
