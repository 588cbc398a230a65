use args::{parse_args, Args};
use config::{Config, ConfigError};
use deploy_watcher::{
    notifier::{Notifier, SendmailTransport},
    runner::ProcessRunner,
    sleeper::ThreadSleeper,
    start::{StartError, Watcher},
};
use log::error;
use logger::{init_logger, LoggerError};
use std::{env, process};
use thiserror::Error;

mod args;
mod config;
mod logger;

/// A custom error for the startup and the exit of the watcher.
#[derive(Debug, Error)]
pub enum MainError {
    #[error("Configuration is invalid: {0}.")]
    Misconfigured(#[from] ConfigError),
    #[error("Logger failed: {0}.")]
    FailedLogger(#[from] LoggerError),
    #[error("{0}")]
    Stopped(#[from] StartError),
}

fn main_inner(args: Args) -> Result<(), MainError> {
    let config = Config::resolve(&args, |name| env::var(name).ok())?;
    init_logger(&args, &config.log_file)?;

    let Config {
        settings,
        tasks,
        error_email_recipient,
        error_email_sender,
        sendmail,
        ..
    } = config;

    // Setup notifier.
    let notifier = Notifier::new(
        error_email_recipient,
        error_email_sender,
        Box::new(SendmailTransport::new(sendmail)),
    );

    // Start the main loop, it only returns when it has to stop.
    let mut watcher = Watcher::new(
        settings,
        tasks,
        Box::new(ProcessRunner),
        Box::new(ThreadSleeper),
        notifier,
    )
    .map_err(|err| {
        error!("{err}");
        err
    })?;
    watcher.start().map_err(|err| {
        error!("{err}");
        err
    })?;

    Ok(())
}

fn main() {
    let args = parse_args();

    if args.version {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return;
    }

    match main_inner(args) {
        Ok(()) => {}
        // It is already logged to the terminal and the log file
        Err(MainError::Stopped(_)) => process::exit(1),
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}
