//! Frame clock. The only source of time the simulation sees is the
//! [`TimeStep`] handed to each tick.

/// Time context for one tick, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeStep {
    pub delta: f32,
    pub total: f32,
}

impl TimeStep {
    /// Step of `delta` seconds with no wall-clock history; for fixed-rate
    /// hosts and tests.
    pub fn fixed(delta: f32) -> Self {
        Self {
            delta: delta.max(0.0),
            total: 0.0,
        }
    }
}

/// Turns host timestamps into [`TimeStep`]s.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last: Option<f64>,
    total: f64,
    paused: bool,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to `now_seconds`. The first call after construction or
    /// [`FrameClock::reset`] yields a zero delta.
    pub fn tick(&mut self, now_seconds: f64) -> TimeStep {
        let delta = match self.last {
            Some(last) if !self.paused => (now_seconds - last).max(0.0),
            _ => 0.0,
        };
        self.last = Some(now_seconds);
        self.total += delta;
        TimeStep {
            delta: delta as f32,
            total: self.total as f32,
        }
    }

    /// Stop accumulating time; ticks while paused have zero delta.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn total(&self) -> f64 {
        self.total
    }
}
