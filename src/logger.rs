use crate::args::Args;
use log::{warn, Level, LevelFilter};
use simplelog::{
    format_description, Color, ColorChoice, CombinedLogger, ConfigBuilder, LevelPadding,
    TermLogger, TerminalMode, WriteLogger,
};
use std::{
    fs::{File, OpenOptions},
    path::Path,
};
use thiserror::Error;

// Use the same format as simple_logger
const TIMESTAMP_FORMAT_OFFSET: &[simplelog::FormatItem<'_>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3][offset_hour sign:mandatory]:[offset_minute]"
);

/// A custom error describing why the logger cannot start.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("cannot determine the local timezone")]
    FailedLoggerTimezones,
    #[error("cannot open log file {0}: {1}")]
    UnwritableLogFile(String, std::io::Error),
    #[error("cannot set the logger: {0}")]
    AlreadyInitialized(#[from] log::SetLoggerError),
}

fn level_filter(args: &Args) -> LevelFilter {
    match (args.quiet, args.verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    }
}

/// Open the log file for appending, creating it if it doesn't exist.
fn open_log_file(log_file: &Path) -> Result<File, LoggerError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(|err| LoggerError::UnwritableLogFile(log_file.display().to_string(), err))
}

/// Log to the terminal and append the same lines to the log file.
pub fn init_logger(args: &Args, log_file: &Path) -> Result<(), LoggerError> {
    let level = level_filter(args);
    let file = open_log_file(log_file)?;
    let config = ConfigBuilder::new()
        .set_level_color(Level::Debug, Some(Color::Magenta))
        .set_level_color(Level::Trace, None)
        .set_level_padding(LevelPadding::Right)
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .set_time_format_custom(TIMESTAMP_FORMAT_OFFSET)
        .set_time_offset_to_local()
        .map_err(|_| LoggerError::FailedLoggerTimezones)?
        .build();

    CombinedLogger::init(vec![
        TermLogger::new(
            level,
            config.clone(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(level, config, file),
    ])?;

    if args.verbose > 3 {
        warn!("Okay, it's time to stop. It won't get more verbose than this.")
    }

    Ok(())
}
