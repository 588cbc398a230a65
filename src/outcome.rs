use crate::{runner::CommandOutput, tasks::Task};

/// The verdict on a single attempt of a task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The task finished, continue with the next one.
    Success,
    /// There is nothing to do yet, try again after the polling interval.
    RetryableNoChange,
    /// The task failed with the reason, it can be retried with backoff.
    Failure(String),
}

/// Decide the outcome of a finished command according to the task's markers.
///
/// A retry marker wins over everything, even a nonzero exit code. Otherwise
/// the declared success markers must appear in stdout and the exit code must be zero.
pub fn classify(task: &Task, output: &CommandOutput) -> AttemptOutcome {
    let contains = |marker: &String| output.stdout.contains(marker.as_str());

    if task.retry_markers().iter().any(contains) {
        AttemptOutcome::RetryableNoChange
    } else if !task.success_markers().is_empty() && !task.success_markers().iter().any(contains) {
        AttemptOutcome::Failure(String::from("output mismatch"))
    } else if output.exit_code != 0 {
        AttemptOutcome::Failure(format!("nonzero exit: {}", output.exit_code))
    } else {
        AttemptOutcome::Success
    }
}
