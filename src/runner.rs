use duct::cmd;
use log::trace;
use mockall::automock;
use std::path::Path;
use thiserror::Error;

/// The captured result of one finished command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// The exit status, -1 if the process was terminated by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// A custom error describing the cases where a command could not run at all.
///
/// A nonzero exit code is not an error here, judging it is up to the classifier.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// There was no program to run.
    #[error("the command is empty")]
    EmptyCommand,
    /// The underlying process could not be started or waited on.
    #[error("the command cannot run: {0}")]
    SpawnFailed(#[from] std::io::Error),
}

/// Runs one external command synchronously.
#[automock]
pub trait Runner {
    /// Run the argument list (program first) in the directory and capture its output.
    fn run(&self, args: &[String], directory: &Path) -> Result<CommandOutput, RunnerError>;
}

/// A runner that starts a real subprocess for every call.
///
/// Both stdout and stderr are captured separately, non-UTF8 output is replaced lossily.
/// The child inherits the environment with `CI=true` and `DEPLOY_WATCHER_DIRECTORY` added.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl Runner for ProcessRunner {
    fn run(&self, args: &[String], directory: &Path) -> Result<CommandOutput, RunnerError> {
        let (program, rest) = args.split_first().ok_or(RunnerError::EmptyCommand)?;

        let expression = cmd(program.as_str(), rest)
            .env("CI", "true")
            .env("DEPLOY_WATCHER_DIRECTORY", directory)
            .dir(directory)
            .stdout_capture()
            .stderr_capture()
            .unchecked();
        trace!("Running {expression:?}.");

        let output = expression.run()?;

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
