use mockall::automock;
use std::{thread, time::Duration};

/// Blocks the watcher for a duration.
///
/// Every wait of the watcher goes through this, between attempts and between cycles.
#[automock]
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps on the current thread.
#[derive(Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn it_should_sleep_for_the_duration() {
        let start = Instant::now();
        ThreadSleeper.sleep(Duration::from_millis(100));

        let diff = start.elapsed();
        assert!(diff >= Duration::from_millis(100));
        assert!(diff <= Duration::from_millis(200));
    }
}
