use log::{trace, warn};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Separator between the command and its markers in a task definition.
const SEGMENT_SEPARATOR: &str = " :: ";

/// Outputs of `git pull` meaning there is nothing new on the remote.
pub const UP_TO_DATE_MARKERS: [&str; 2] = ["Already up to date.", "Already up-to-date."];

/// A custom error describing the cases where a task cannot be defined.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    /// There is no program to run.
    #[error("the task {0:?} has no command")]
    EmptyCommand(String),
    /// The command has unbalanced quotes or escapes.
    #[error("the command {0:?} cannot be split into arguments")]
    UnparseableCommand(String),
    /// A segment after the command is neither `success=` nor `retry=`.
    #[error("cannot parse {0:?}, valid values: success=text, retry=text")]
    UnknownSegment(String),
    /// A marker was given without any text.
    #[error("the marker {0:?} is empty")]
    EmptyMarker(String),
}

/// One external command with the rules deciding if it succeeded.
///
/// The arguments are split once when the task is defined and never re-parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    name: String,
    args: Vec<String>,
    success_markers: Vec<String>,
    retry_markers: Vec<String>,
}

impl Task {
    /// Create a task from its arguments, the program being the first one.
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Result<Self, TaskError> {
        let name = name.into();
        if args.first().map_or(true, |program| program.is_empty()) {
            return Err(TaskError::EmptyCommand(name));
        }

        Ok(Task {
            name,
            args,
            success_markers: vec![],
            retry_markers: vec![],
        })
    }

    /// At least one of these has to appear in stdout for the task to succeed.
    pub fn with_success_marker(mut self, marker: impl Into<String>) -> Self {
        self.success_markers.push(marker.into());
        self
    }

    /// If any of these appears in stdout, the task is retried without counting as a failure.
    pub fn with_retry_marker(mut self, marker: impl Into<String>) -> Self {
        self.retry_markers.push(marker.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn success_markers(&self) -> &[String] {
        &self.success_markers
    }

    pub fn retry_markers(&self) -> &[String] {
        &self.retry_markers
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl FromStr for Task {
    type Err = TaskError;

    /// Parse a task in the form of `command [:: success=text] [:: retry=text]`.
    ///
    /// The command is split with shell-word rules, but never runs in a shell.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments = s.split(SEGMENT_SEPARATOR);
        let command = segments.next().unwrap_or_default().trim();

        let contains_variables = command
            .find('$')
            .and_then(|pos| command[pos + 1..].chars().next())
            .is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '{');
        let contains_suspicious =
            command.contains(" | ") || command.contains(" && ") || command.contains(" || ");

        if contains_variables || contains_suspicious {
            warn!("The command {command:?} contains a variable or other shell-specific character, but it won't run in a shell.");
        }

        let args = shlex::split(command)
            .ok_or_else(|| TaskError::UnparseableCommand(command.to_string()))?;
        let mut task = Task::new(command, args)?;

        for segment in segments {
            let segment = segment.trim();
            match segment.split_once('=') {
                Some((_, "")) => return Err(TaskError::EmptyMarker(segment.to_string())),
                Some(("success", marker)) => task = task.with_success_marker(marker),
                Some(("retry", marker)) => task = task.with_retry_marker(marker),
                _ => return Err(TaskError::UnknownSegment(segment.to_string())),
            }
        }

        trace!("Parsed {s:?} to {task:?}.");

        Ok(task)
    }
}

/// Create the default sequence: pull the branch, rebuild and restart the compose stack.
///
/// Pulling is retried every interval while the repository is already up to date,
/// so the rest only runs when there are new changes.
pub fn builtin_tasks(remote: &str, branch: &str, compose: &[String]) -> Result<Vec<Task>, TaskError> {
    let pull_args = vec![
        String::from("git"),
        String::from("pull"),
        remote.to_string(),
        branch.to_string(),
    ];
    let pull = UP_TO_DATE_MARKERS
        .iter()
        .fold(Task::new("git pull", pull_args)?, |task, marker| {
            task.with_retry_marker(*marker)
        });

    let compose_name = compose.join(" ");
    let compose_with = |extra: &[&str]| -> Vec<String> {
        compose
            .iter()
            .cloned()
            .chain(extra.iter().map(|arg| arg.to_string()))
            .collect()
    };
    let build = Task::new(format!("{compose_name} build"), compose_with(&["build"]))?;
    let up = Task::new(format!("{compose_name} up"), compose_with(&["up", "-d"]))?;

    Ok(vec![pull, build, up])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn it_should_parse_a_plain_command() -> Result<(), TaskError> {
        let task: Task = "docker compose up -d".parse()?;

        assert_eq!("docker compose up -d", task.name());
        assert_eq!(strings(&["docker", "compose", "up", "-d"]), task.args());
        assert!(task.success_markers().is_empty());
        assert!(task.retry_markers().is_empty());

        Ok(())
    }

    #[test]
    fn it_should_keep_quoted_arguments_together() -> Result<(), TaskError> {
        let task: Task = "git commit -m 'hello world'".parse()?;

        assert_eq!(strings(&["git", "commit", "-m", "hello world"]), task.args());

        Ok(())
    }

    #[test]
    fn it_should_parse_markers() -> Result<(), TaskError> {
        let task: Task =
            "git pull origin main :: retry=Already up to date. :: success=Updating :: success=Fast-forward"
                .parse()?;

        assert_eq!(strings(&["git", "pull", "origin", "main"]), task.args());
        assert_eq!(strings(&["Already up to date."]), task.retry_markers());
        assert_eq!(strings(&["Updating", "Fast-forward"]), task.success_markers());

        Ok(())
    }

    #[test]
    fn it_should_fail_on_empty_command() {
        let result = "   :: retry=nothing".parse::<Task>();

        assert!(
            matches!(result, Err(TaskError::EmptyCommand(_))),
            "{result:?} should be EmptyCommand"
        );
    }

    #[test]
    fn it_should_fail_on_unbalanced_quotes() {
        let result = "echo 'hello".parse::<Task>();

        assert!(
            matches!(result, Err(TaskError::UnparseableCommand(_))),
            "{result:?} should be UnparseableCommand"
        );
    }

    #[test]
    fn it_should_fail_on_unknown_segment() {
        let result = "echo hello :: expect=hello".parse::<Task>();

        assert_eq!(
            Err(TaskError::UnknownSegment(String::from("expect=hello"))),
            result
        );
    }

    #[test]
    fn it_should_fail_on_empty_marker() {
        let result = "echo hello :: success=".parse::<Task>();

        assert_eq!(Err(TaskError::EmptyMarker(String::from("success="))), result);
    }

    #[test]
    fn it_should_create_the_builtin_sequence() -> Result<(), TaskError> {
        let tasks = builtin_tasks("origin", "main", &strings(&["docker", "compose"]))?;

        assert_eq!(3, tasks.len());
        assert_eq!(strings(&["git", "pull", "origin", "main"]), tasks[0].args());
        assert_eq!(strings(&UP_TO_DATE_MARKERS), tasks[0].retry_markers());
        assert_eq!(strings(&["docker", "compose", "build"]), tasks[1].args());
        assert_eq!(strings(&["docker", "compose", "up", "-d"]), tasks[2].args());
        assert!(tasks[1].retry_markers().is_empty());
        assert!(tasks[2].success_markers().is_empty());

        Ok(())
    }

    #[test]
    fn it_should_support_legacy_compose_binary() -> Result<(), TaskError> {
        let tasks = builtin_tasks("upstream", "release", &strings(&["docker-compose"]))?;

        assert_eq!(strings(&["git", "pull", "upstream", "release"]), tasks[0].args());
        assert_eq!("docker-compose build", tasks[1].name());
        assert_eq!(strings(&["docker-compose", "up", "-d"]), tasks[2].args());

        Ok(())
    }

    #[test]
    fn it_should_warn_about_shell_syntax() -> Result<(), TaskError> {
        testing_logger::setup();

        "echo $HOME".parse::<Task>()?;
        "echo ${HOME}".parse::<Task>()?;
        "make build && make up".parse::<Task>()?;
        "echo $5".parse::<Task>()?;

        testing_logger::validate(|captured_logs| {
            let warnings: Vec<_> = captured_logs
                .iter()
                .filter(|log| log.level == log::Level::Warn)
                .collect();
            assert_eq!(3, warnings.len());
            assert!(warnings[0].body.contains("\"echo $HOME\""));
        });

        Ok(())
    }
}
