//! Keep a local repository in sync with its remote and redeploy on changes.
//!
//! ## How it works
//!
//! The watcher is built up from **tasks**, a **retry engine**, the **watcher** loop
//! and a **notifier**. Every cycle the watcher runs the tasks in order
//! (by default `git pull`, `docker compose build` and `docker compose up -d`).
//! Each task is run by the retry engine, which retries failures with exponential backoff
//! and keeps polling while the task reports that there is nothing new. If too many
//! cycles fail in a row, the operator is notified by email.
//!
//! ```ignore
//! +---------+       +--------------+       +--------+       +------------+
//! | watcher | ----> | retry engine | ----> | runner | ----> | classifier |
//! +---------+       +--------------+       +--------+       +------------+
//!      |
//!      +--(too many failures)--> +----------+
//!                                | notifier |
//!                                +----------+
//! ```
//!

/// The verdict on a single attempt of a task.
pub mod outcome;
/// Failure alerts sent to the operator.
pub mod notifier;
/// Retrying tasks with exponential backoff.
pub mod retry;
/// Running external commands.
pub mod runner;
/// Waiting between attempts and cycles.
pub mod sleeper;
/// The external commands to run every cycle.
pub mod tasks;

/// The main program loop, that runs the tasks every interval infinitely.
pub mod start;
