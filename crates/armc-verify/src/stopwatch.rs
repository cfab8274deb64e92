//! Compute-time stopwatch.

use std::time::{Duration, Instant};

/// A stopwatch that can be paused around I/O so timeouts measure compute
/// time only.
#[derive(Debug)]
pub struct Stopwatch {
    accumulated: Duration,
    running_since: Option<Instant>,
}

impl Stopwatch {
    pub fn started() -> Self {
        Stopwatch {
            accumulated: Duration::ZERO,
            running_since: Some(Instant::now()),
        }
    }

    pub fn pause(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += since.elapsed();
        }
    }

    pub fn resume(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    /// Total running time, excluding paused stretches.
    pub fn elapsed(&self) -> Duration {
        let current = self
            .running_since
            .map(|since| since.elapsed())
            .unwrap_or(Duration::ZERO);
        self.accumulated + current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_stops_accumulation() {
        let mut watch = Stopwatch::started();
        watch.pause();
        let frozen = watch.elapsed();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(watch.elapsed(), frozen);
        watch.resume();
        std::thread::sleep(Duration::from_millis(1));
        assert!(watch.elapsed() > frozen);
    }

    #[test]
    fn test_double_resume_is_harmless() {
        let mut watch = Stopwatch::started();
        watch.resume();
        watch.pause();
        watch.pause();
        assert!(watch.elapsed() < Duration::from_secs(1));
    }
}
