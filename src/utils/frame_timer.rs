use std::time::{Duration, Instant};

/// Window over which [`FrameTimer::average_delta`] is refreshed.
pub const AVERAGE_WINDOW: Duration = Duration::from_millis(75);

/// Per-frame delta time plus a short-window average for display.
pub struct FrameTimer {
    last_tick: Instant,
    /// Time between the last two ticks.
    pub delta: Duration,
    average: Duration,
    window_time: Duration,
    window_frames: u32,
    pub frame_count: u64,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTimer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_tick: Instant::now(),
            delta: Duration::ZERO,
            average: Duration::ZERO,
            window_time: Duration::ZERO,
            window_frames: 0,
            frame_count: 0,
        }
    }

    /// Measures the time since the previous tick. Call once per frame.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let delta = now - self.last_tick;
        self.last_tick = now;
        self.advance(delta);
        delta
    }

    /// Records a frame that took `delta`.
    pub fn advance(&mut self, delta: Duration) {
        self.delta = delta;
        self.frame_count += 1;
        self.window_time += delta;
        self.window_frames += 1;

        if self.window_time >= AVERAGE_WINDOW {
            self.average = self.window_time / self.window_frames;
            self.window_time = Duration::ZERO;
            self.window_frames = 0;
        }
    }

    #[inline]
    #[must_use]
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Mean frame time over the last completed window; zero until the first
    /// window completes.
    #[inline]
    #[must_use]
    pub fn average_delta(&self) -> Duration {
        self.average
    }

    #[must_use]
    pub fn fps(&self) -> f32 {
        let average = self.average.as_secs_f32();
        if average > 0.0 { 1.0 / average } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_refreshes_once_window_is_full() {
        let mut timer = FrameTimer::new();
        for _ in 0..4 {
            timer.advance(Duration::from_millis(16));
        }
        assert_eq!(timer.average_delta(), Duration::ZERO, "window not yet full");

        timer.advance(Duration::from_millis(16));
        assert_eq!(timer.average_delta(), Duration::from_millis(16));
        assert!((timer.fps() - 62.5).abs() < 1e-3);
        assert_eq!(timer.frame_count, 5);
    }
}
