use std::sync::RwLock;
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct MockClock {
    now: RwLock<Instant>,
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClock {
    pub fn new() -> Self {
        Self {
            now: RwLock::new(Instant::now()),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
        *now += duration;
    }
}
