use crate::args::Args;
use deploy_watcher::{
    notifier::DEFAULT_SENDMAIL,
    retry::RetryPolicy,
    start::Settings,
    tasks::{builtin_tasks, Task, TaskError},
};
use duration_string::DurationString;
use std::{path::PathBuf, str::FromStr, time::Duration};
use thiserror::Error;

const MIN_MAX_ATTEMPTS: u64 = 1;
const MIN_BASE_DELAY: u64 = 2;

/// A custom error describing the invalid configurations, these stop the watcher before starting.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A number is below its limit.
    #[error("{name} should be at least {min}, got {value}")]
    TooLow {
        name: &'static str,
        min: u64,
        value: u64,
    },
    /// An environment variable cannot be parsed as a number.
    #[error("cannot parse {name}={value:?} as a number")]
    InvalidNumber { name: &'static str, value: String },
    /// The interval is neither seconds nor a duration string.
    #[error("cannot parse interval {0:?}, use seconds or a duration like 30s, 5m")]
    InvalidInterval(String),
    /// The interval is zero, which would run the cycles without pause.
    #[error("interval should be longer than zero")]
    ZeroInterval,
    /// The compose command cannot be split into arguments.
    #[error("cannot parse compose command {0:?}")]
    InvalidComposeCommand(String),
    /// A task cannot be parsed.
    #[error("invalid task: {0}")]
    InvalidTask(#[from] TaskError),
}

/// The resolved configuration of the watcher.
#[derive(Debug)]
pub struct Config {
    pub settings: Settings,
    pub tasks: Vec<Task>,
    pub error_email_recipient: Option<String>,
    pub error_email_sender: Option<String>,
    pub log_file: PathBuf,
    pub sendmail: String,
}

/// Take the flag if it is set, otherwise the non-empty environment variable.
fn option<E>(flag: &Option<String>, env: &E, name: &str) -> Option<String>
where
    E: Fn(&str) -> Option<String>,
{
    flag.clone()
        .or_else(|| env(name))
        .filter(|value| !value.trim().is_empty())
}

fn number<T, E>(flag: Option<T>, env: &E, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    E: Fn(&str) -> Option<String>,
{
    if let Some(value) = flag {
        return Ok(value);
    }

    match env(name).filter(|value| !value.trim().is_empty()) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        None => Ok(default),
    }
}

fn flag<E>(flag: bool, env: &E, name: &str) -> bool
where
    E: Fn(&str) -> Option<String>,
{
    flag || env(name).is_some_and(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

/// Parse the interval as seconds, or as a duration string (e.g. "30s", "5m").
fn parse_interval(value: &str) -> Result<Duration, ConfigError> {
    let value = value.trim();
    let interval = match value.parse::<u64>() {
        Ok(seconds) => Duration::from_secs(seconds),
        Err(_) => value
            .parse::<DurationString>()
            .map_err(|_| ConfigError::InvalidInterval(value.to_string()))?
            .into(),
    };

    if interval.is_zero() {
        Err(ConfigError::ZeroInterval)
    } else {
        Ok(interval)
    }
}

fn at_least(name: &'static str, min: u64, value: u64) -> Result<(), ConfigError> {
    if value < min {
        Err(ConfigError::TooLow { name, min, value })
    } else {
        Ok(())
    }
}

impl Config {
    /// Resolve the configuration from the flags, falling back to the environment and then the defaults.
    pub fn resolve<E>(args: &Args, env: E) -> Result<Self, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let directory = option(&args.repo_dir, &env, "REPO_DIR")
            .unwrap_or_else(|| String::from("/app/repo"));
        let branch = option(&args.branch, &env, "BRANCH").unwrap_or_else(|| String::from("main"));
        let remote =
            option(&args.remote, &env, "REMOTE").unwrap_or_else(|| String::from("origin"));
        let interval = parse_interval(
            &option(&args.interval, &env, "INTERVAL").unwrap_or_else(|| String::from("60")),
        )?;

        let max_attempts = number(args.max_attempts, &env, "MAX_ATTEMPTS", 5)?;
        at_least("max_attempts", MIN_MAX_ATTEMPTS, max_attempts.into())?;
        let base_delay = number(args.base_delay, &env, "BASE_DELAY", 2)?;
        at_least("base_delay", MIN_BASE_DELAY, base_delay)?;

        let tasks = if args.tasks.is_empty() {
            let compose = option(&args.compose_command, &env, "COMPOSE_COMMAND")
                .unwrap_or_else(|| String::from("docker compose"));
            let compose_args = shlex::split(&compose)
                .filter(|compose_args| {
                    compose_args
                        .first()
                        .is_some_and(|program| !program.is_empty())
                })
                .ok_or_else(|| ConfigError::InvalidComposeCommand(compose.clone()))?;
            builtin_tasks(&remote, &branch, &compose_args)?
        } else {
            args.tasks
                .iter()
                .map(|task| task.parse())
                .collect::<Result<Vec<Task>, TaskError>>()?
        };

        Ok(Config {
            settings: Settings {
                directory: PathBuf::from(directory),
                interval,
                retry: RetryPolicy {
                    max_attempts,
                    base_delay,
                    poll_interval: interval,
                },
                exit_on_max_attempts: flag(
                    args.exit_on_max_attempts,
                    &env,
                    "EXIT_ON_MAX_ATTEMPTS",
                ),
            },
            tasks,
            error_email_recipient: option(
                &args.error_email_recipient,
                &env,
                "ERROR_EMAIL_RECIPIENT",
            ),
            error_email_sender: option(&args.error_email_sender, &env, "ERROR_EMAIL_SENDER"),
            log_file: PathBuf::from(
                option(&args.log_file, &env, "LOG_FILE")
                    .unwrap_or_else(|| String::from("/app/error.log")),
            ),
            sendmail: option(&args.sendmail, &env, "SENDMAIL_PATH")
                .unwrap_or_else(|| String::from(DEFAULT_SENDMAIL)),
        })
    }
}
