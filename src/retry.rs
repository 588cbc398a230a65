use crate::{
    outcome::{classify, AttemptOutcome},
    runner::Runner,
    sleeper::Sleeper,
    tasks::Task,
};
use duration_string::DurationString;
use log::{debug, trace, warn};
use std::{path::Path, time::Duration};
use thiserror::Error;

/// How many times and how patiently a task is retried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// The number of failed attempts after which the task is given up.
    pub max_attempts: u32,
    /// The base of the exponential backoff in seconds.
    pub base_delay: u64,
    /// The wait before trying again when there is nothing to do yet.
    pub poll_interval: Duration,
}

impl RetryPolicy {
    /// The wait after the given failed attempt (1-indexed): `base_delay^attempt` seconds.
    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_secs(self.base_delay.saturating_pow(attempt))
    }
}

/// A task failure, that has exhausted all attempts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RetryError {
    #[error("{task} failed after {attempts} attempts: {reason}")]
    Exhausted {
        task: String,
        attempts: u32,
        reason: String,
    },
}

/// Runs a task until it succeeds or runs out of attempts.
///
/// The attempt count lives only for one [RetryEngine::run] call.
pub struct RetryEngine<'a> {
    policy: &'a RetryPolicy,
    directory: &'a Path,
    runner: &'a dyn Runner,
    sleeper: &'a dyn Sleeper,
}

impl<'a> RetryEngine<'a> {
    pub fn new(
        policy: &'a RetryPolicy,
        directory: &'a Path,
        runner: &'a dyn Runner,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        RetryEngine {
            policy,
            directory,
            runner,
            sleeper,
        }
    }

    fn attempt(&self, task: &Task) -> AttemptOutcome {
        debug!(
            "Running {task} in directory {}.",
            self.directory.display()
        );

        match self.runner.run(task.args(), self.directory) {
            Ok(output) => {
                let outcome = classify(task, &output);
                if let AttemptOutcome::Failure(reason) = &outcome {
                    warn!("{task} failed with {reason}, output:");
                    output.stderr.lines().for_each(|line| warn!("{line}"));
                    output.stdout.lines().for_each(|line| debug!("{line}"));
                } else {
                    output.stdout.lines().for_each(|line| trace!("{line}"));
                    output.stderr.lines().for_each(|line| trace!("{line}"));
                }
                outcome
            }
            Err(err) => AttemptOutcome::Failure(err.to_string()),
        }
    }

    /// Run the task with retries.
    ///
    /// Failures are retried with exponential backoff, until `max_attempts` is reached.
    /// If the task reports that there is nothing to do yet, it is retried after the
    /// polling interval without using up an attempt, as long as it takes.
    pub fn run(&self, task: &Task) -> Result<(), RetryError> {
        let RetryPolicy {
            max_attempts,
            poll_interval,
            ..
        } = self.policy;
        let mut attempts: u32 = 0;

        loop {
            match self.attempt(task) {
                AttemptOutcome::Success => {
                    debug!("{task} finished successfully.");
                    return Ok(());
                }
                AttemptOutcome::RetryableNoChange => {
                    debug!(
                        "There is nothing to do for {task}, checking again in {}.",
                        DurationString::new(*poll_interval)
                    );
                    self.sleeper.sleep(*poll_interval);
                }
                AttemptOutcome::Failure(reason) => {
                    attempts += 1;
                    warn!("{task} failed (attempt {attempts}/{max_attempts}): {reason}.");

                    if attempts >= *max_attempts {
                        return Err(RetryError::Exhausted {
                            task: task.name().to_string(),
                            attempts,
                            reason,
                        });
                    }

                    let delay = self.policy.delay(attempts);
                    debug!("Retrying {task} in {}.", DurationString::new(delay));
                    self.sleeper.sleep(delay);
                }
            }
        }
    }
}
