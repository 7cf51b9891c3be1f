use std::cell::Cell;
use std::time::Instant;

/// Millisecond time source injected into managers so cadence logic can be tested.
pub trait Clock {
    fn now_millis(&self) -> u64;
}

pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self { now: Cell::new(start) }
    }

    pub fn advance(&self, millis: u64) {
        self.now.set(self.now.get().saturating_add(millis));
    }

    pub fn set(&self, millis: u64) {
        self.now.set(millis);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.get()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    active: bool,
    start: u64,
    delay: u64,
}

impl Timer {
    pub fn new(delay: u64, now: u64) -> Self {
        Self { active: true, start: now, delay }
    }

    pub fn reset(&mut self, now: u64) {
        self.start = now;
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn set_delay(&mut self, delay: u64) {
        self.delay = delay;
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn delay(&self) -> u64 {
        self.delay
    }

    pub fn elapsed(&self, now: u64) -> bool {
        now >= self.start.saturating_add(self.delay)
    }
}
