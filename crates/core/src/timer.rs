//! Frame timing.

use std::time::{Duration, Instant};

/// Upper bound for a single frame delta, in seconds.
///
/// Long stalls (window drags, a blocked rebuild while minimized) would
/// otherwise turn into one huge simulation step.
pub const MAX_FRAME_TIME: f32 = 0.25;

/// High-resolution timer for measuring elapsed time.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    last_tick: Instant,
}

impl Timer {
    /// Create a new timer, starting from now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_tick: now,
        }
    }

    /// Get the total elapsed time since the timer was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Get the elapsed time in seconds since the timer was created.
    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed().as_secs_f32()
    }

    /// Get the time elapsed since the last call to `tick()`.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let delta = now - self.last_tick;
        self.last_tick = now;
        delta
    }

    /// Seconds since the last tick, clamped to [`MAX_FRAME_TIME`].
    pub fn frame_time(&mut self) -> f32 {
        self.tick().as_secs_f32().min(MAX_FRAME_TIME)
    }

    /// Reset the timer to the current time.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.start = now;
        self.last_tick = now;
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_time_is_clamped() {
        let mut timer = Timer::new();
        timer.last_tick = Instant::now() - Duration::from_secs(3);
        assert!((timer.frame_time() - MAX_FRAME_TIME).abs() < f32::EPSILON);
    }

    #[test]
    fn test_tick_advances() {
        let mut timer = Timer::new();
        let first = timer.tick();
        let second = timer.tick();
        assert!(first < Duration::from_secs(1));
        assert!(second < Duration::from_secs(1));
        assert!(timer.elapsed() >= first);
    }

    #[test]
    fn test_reset() {
        let mut timer = Timer::new();
        timer.start = Instant::now() - Duration::from_secs(10);
        timer.reset();
        assert!(timer.elapsed_secs() < 1.0);
    }
}
