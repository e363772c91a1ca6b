use std::time::Instant;

pub struct FrameClock {
    pub frames: u64,
    pub delta_time: f64,
    pub elapsed: f64,
    start: Instant,
    last_frame: Instant,
}

impl Default for FrameClock {
    fn default() -> Self {
        let now = Instant::now();
        Self {
            frames: 0,
            delta_time: 0.0,
            elapsed: 0.0,
            start: now,
            last_frame: now,
        }
    }
}

impl FrameClock {
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn frames_per_second(&self) -> f64 {
        if self.delta_time > 0.0 {
            1.0 / self.delta_time
        } else {
            0.0
        }
    }

    fn tick_at(&mut self, now: Instant) {
        self.delta_time = now.saturating_duration_since(self.last_frame).as_secs_f64();
        self.elapsed = now.saturating_duration_since(self.start).as_secs_f64();
        self.last_frame = now;
        self.frames += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_tick_advances_time() {
        let mut clock = FrameClock::default();
        let start = clock.start;

        clock.tick_at(start + Duration::from_millis(16));
        clock.tick_at(start + Duration::from_millis(48));

        assert_eq!(clock.frames, 2);
        assert!((clock.delta_time - 0.032).abs() < 1e-9);
        assert!((clock.elapsed - 0.048).abs() < 1e-9);
        assert!((clock.frames_per_second() - 31.25).abs() < 1e-6);
    }

    #[test]
    fn test_reset() {
        let mut clock = FrameClock::default();
        clock.tick();
        clock.reset();
        assert_eq!(clock.frames, 0);
        assert_eq!(clock.delta_time, 0.0);
        assert_eq!(clock.frames_per_second(), 0.0);
    }
}
