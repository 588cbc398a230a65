use crate::{
    notifier::{Notifier, NotifyStatus},
    retry::{RetryEngine, RetryError, RetryPolicy},
    runner::Runner,
    sleeper::Sleeper,
    tasks::Task,
};
use duration_string::DurationString;
use log::{debug, error, info, warn};
use std::{path::PathBuf, time::Duration};
use thiserror::Error;

/// A custom error describing why the watcher cannot start or has to stop.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StartError {
    #[error("You have to define at least one task.")]
    NoTasks,
    #[error("Deployment failed {0} times in a row, exiting.")]
    MaxAttemptsReached(u32),
}

/// The settings of the main loop.
#[derive(Clone, Debug)]
pub struct Settings {
    /// The directory where every task runs.
    pub directory: PathBuf,
    /// The wait between two cycles.
    pub interval: Duration,
    /// The retry policy for each task. Its `max_attempts` is also the number of
    /// failed cycles in a row that triggers the notification.
    pub retry: RetryPolicy,
    /// Stop the watcher after the notification instead of starting over.
    pub exit_on_max_attempts: bool,
}

/// The result of a single cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleStatus {
    /// Every task finished.
    Succeeded,
    /// A task failed, this many cycles failed in a row.
    Failed(u32),
    /// Too many cycles failed in a row, the operator was notified and the count started over.
    Notified,
}

/// Runs the tasks in every cycle and keeps count of the failed cycles.
pub struct Watcher {
    settings: Settings,
    tasks: Vec<Task>,
    runner: Box<dyn Runner>,
    sleeper: Box<dyn Sleeper>,
    notifier: Notifier,
    failures: u32,
}

impl Watcher {
    pub fn new(
        settings: Settings,
        tasks: Vec<Task>,
        runner: Box<dyn Runner>,
        sleeper: Box<dyn Sleeper>,
        notifier: Notifier,
    ) -> Result<Self, StartError> {
        if tasks.is_empty() {
            return Err(StartError::NoTasks);
        }

        Ok(Watcher {
            settings,
            tasks,
            runner,
            sleeper,
            notifier,
            failures: 0,
        })
    }

    /// The number of cycles that failed in a row.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Run every task in order, stopping at the first one that fails for good.
    fn run_cycle(&self) -> Result<(), RetryError> {
        let engine = RetryEngine::new(
            &self.settings.retry,
            &self.settings.directory,
            self.runner.as_ref(),
            self.sleeper.as_ref(),
        );

        for (i, task) in self.tasks.iter().enumerate() {
            engine.run(task)?;

            if let Some(next) = self.tasks.get(i + 1) {
                if task.retry_markers().is_empty() {
                    debug!("{task} finished, continuing with {next}.");
                } else {
                    info!("There are updates, continuing with {next}.");
                }
            }
        }

        Ok(())
    }

    /// Run one cycle and update the failure count.
    ///
    /// When the count reaches `max_attempts`, the operator is notified and the count
    /// starts over, or the watcher stops if `exit_on_max_attempts` is set.
    pub fn step(&mut self) -> Result<CycleStatus, StartError> {
        let threshold = self.settings.retry.max_attempts;

        let err = match self.run_cycle() {
            Ok(()) => {
                if self.failures > 0 {
                    info!("Deployment recovered after {} failed cycles.", self.failures);
                }
                self.failures = 0;
                info!("Deployment finished successfully.");
                return Ok(CycleStatus::Succeeded);
            }
            Err(err) => err,
        };

        self.failures += 1;
        error!(
            "Deployment attempt failed ({}/{threshold}): {err}.",
            self.failures
        );
        if self.failures < threshold {
            return Ok(CycleStatus::Failed(self.failures));
        }

        let body = format!("Deployment failed {threshold} times in a row: {err}");
        match self.notifier.notify("Deployment failed", &body) {
            Ok(NotifyStatus::Sent) => debug!("Notified about {threshold} failures."),
            Ok(NotifyStatus::Disabled) => debug!("Notifications are disabled, skipping."),
            Err(err) => error!("Failed to send email: {err}."),
        }
        self.failures = 0;

        if self.settings.exit_on_max_attempts {
            return Err(StartError::MaxAttemptsReached(threshold));
        }
        warn!("Deployment failed {threshold} times in a row, starting over.");

        Ok(CycleStatus::Notified)
    }

    /// The main program loop, that runs a cycle and waits for the interval, infinitely.
    ///
    /// It only returns if the watcher should stop.
    pub fn start(&mut self) -> Result<(), StartError> {
        info!(
            "Starting deployment watcher in {}, checking every {}.",
            self.settings.directory.display(),
            DurationString::new(self.settings.interval)
        );

        loop {
            self.tick()?;
        }
    }

    /// Run one cycle, then wait for the interval whatever the cycle's outcome was.
    fn tick(&mut self) -> Result<CycleStatus, StartError> {
        let status = self.step()?;

        debug!(
            "Waiting {} until the next cycle.",
            DurationString::new(self.settings.interval)
        );
        self.sleeper.sleep(self.settings.interval);

        Ok(status)
    }
}
