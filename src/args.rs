use gumdrop::Options;

/// Keep a repository in sync with its remote and redeploy the compose stack on changes.
///
/// Every option can also be set with the environment variable in its description.
#[derive(Debug, Options)]
pub struct Args {
    /// The repository to watch, the tasks run here. [env: REPO_DIR, default: /app/repo]
    #[options(no_short, meta = "DIR")]
    pub repo_dir: Option<String>,

    /// The branch to pull. [env: BRANCH, default: main]
    #[options(short = "b")]
    pub branch: Option<String>,

    /// The remote to pull from. [env: REMOTE, default: origin]
    #[options(no_short)]
    pub remote: Option<String>,

    /// Wait this long between the cycles, in seconds or postfixed with s(econd), m(inutes), h(ours), d(ays).
    /// [env: INTERVAL, default: 60]
    #[options(short = "i")]
    pub interval: Option<String>,

    /// The attempts for each task, and the failed cycles in a row before notifying. [env: MAX_ATTEMPTS, default: 5]
    #[options(no_short, meta = "N")]
    pub max_attempts: Option<u32>,

    /// The base of the exponential backoff in seconds, at least 2. [env: BASE_DELAY, default: 2]
    #[options(no_short, meta = "SECONDS")]
    pub base_delay: Option<u64>,

    /// Send an email here, if the deployment fails too many times. [env: ERROR_EMAIL_RECIPIENT]
    #[options(no_short, meta = "EMAIL")]
    pub error_email_recipient: Option<String>,

    /// The sender of the error emails. [env: ERROR_EMAIL_SENDER, default: error@localhost]
    #[options(no_short, meta = "EMAIL")]
    pub error_email_sender: Option<String>,

    /// Append the logs to this file too. [env: LOG_FILE, default: /app/error.log]
    #[options(no_short, meta = "PATH")]
    pub log_file: Option<String>,

    /// Exit after notifying, instead of starting over. [env: EXIT_ON_MAX_ATTEMPTS]
    #[options(no_short)]
    pub exit_on_max_attempts: bool,

    /// The compose command used by the default tasks. [env: COMPOSE_COMMAND, default: docker compose]
    #[options(no_short, meta = "COMMAND")]
    pub compose_command: Option<String>,

    /// The sendmail binary to deliver emails with. [env: SENDMAIL_PATH, default: /usr/sbin/sendmail]
    #[options(no_short, meta = "PATH")]
    pub sendmail: Option<String>,

    /// The task to run in every cycle, you can define multiple times.
    ///
    /// Use "command :: success=text :: retry=text" to require or to wait for an output.
    /// If there are no tasks given, it will pull, build and restart the compose stack.
    #[options(long = "task", short = "t", meta = "TASK")]
    pub tasks: Vec<String>,

    /// Increase verbosity, can be set multiple times (-v debug, -vv tracing)
    #[options(count)]
    pub verbose: u8,

    /// Only print error messages.
    #[options()]
    pub quiet: bool,

    /// Print the current version.
    #[options(short = "V")]
    pub version: bool,

    /// Print this help.
    #[options()]
    pub help: bool,
}

pub fn parse_args() -> Args {
    Args::parse_args_default_or_exit()
}
