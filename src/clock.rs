use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};
use time::OffsetDateTime;

/// Time source for the job lifecycle.
///
/// `now` is a monotonic reading relative to the clock's origin; `wall` maps such
/// a reading back onto UTC so recorded timestamps and measured latencies agree.
pub trait Clock {
    fn now(&self) -> Duration;
    fn sleep(&self, d: Duration);
    fn wall(&self, at: Duration) -> OffsetDateTime;
}

pub struct SystemClock {
    origin: Instant,
    origin_wall: OffsetDateTime,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            origin_wall: OffsetDateTime::now_utc(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, d: Duration) {
        std::thread::sleep(d);
    }

    fn wall(&self, at: Duration) -> OffsetDateTime {
        self.origin_wall + at
    }
}

/// Virtual clock: `sleep` advances time instantly. Clones share the same timeline,
/// so a fake service can charge request latency against the clock the engine reads.
#[derive(Clone)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
    origin_wall: OffsetDateTime,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Duration::ZERO)),
            origin_wall: OffsetDateTime::UNIX_EPOCH,
        }
    }

    pub fn advance(&self, d: Duration) {
        self.now.set(self.now.get() + d);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }

    fn wall(&self, at: Duration) -> OffsetDateTime {
        self.origin_wall + at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let a = ManualClock::new();
        let b = a.clone();
        a.sleep(Duration::from_millis(250));
        b.advance(Duration::from_millis(50));
        assert_eq!(a.now(), Duration::from_millis(300));
        assert_eq!(
            a.wall(a.now()) - a.wall(Duration::ZERO),
            time::Duration::milliseconds(300)
        );
    }
}
