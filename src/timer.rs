use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

/// Repeating timer driven by the UI loop instead of a thread.
#[derive(Debug)]
pub struct Interval {
    period: Duration,
    last: Option<Instant>,
}

impl Interval {
    pub fn new(period: Duration) -> Self {
        Interval { period, last: None }
    }

    /// True on the first call and then once per elapsed period.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.duration_since(last) < self.period => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    pub fn reset(&mut self, now: Instant) {
        self.last = Some(now);
    }

    /// Time until the next tick, for scheduling a repaint.
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last {
            Some(last) => self.period.saturating_sub(now.duration_since(last)),
            None => Duration::ZERO,
        }
    }
}

/// Result of blocking work run off the UI thread.
pub struct Job<T> {
    rx: Receiver<T>,
}

impl<T: Send + 'static> Job<T> {
    pub fn spawn<F>(work: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(work());
        });
        Job { rx }
    }

    pub fn poll(&self) -> JobState<T> {
        match self.rx.try_recv() {
            Ok(value) => JobState::Done(value),
            Err(TryRecvError::Empty) => JobState::Running,
            Err(TryRecvError::Disconnected) => JobState::Lost,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum JobState<T> {
    Running,
    Done(T),
    /// The worker exited without a result (it panicked).
    Lost,
}
