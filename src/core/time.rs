//! 帧间隔计时

use std::time::{Duration, Instant};

/// 记录相邻两次 `next()` 之间的时间间隔
#[derive(Debug, Clone)]
pub struct TimeDelta {
    start: Instant,
    last: Instant,
    last_recorded_delta: Duration,
    frame_count: u64,
}

impl Default for TimeDelta {
    fn default() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            last_recorded_delta: Duration::ZERO,
            frame_count: 0,
        }
    }
}

impl TimeDelta {
    pub fn next(&mut self) {
        let now = Instant::now();
        self.last_recorded_delta = now - self.last;
        self.last = now;
        self.frame_count += 1;
    }

    pub fn delta_time(&self) -> Duration {
        self.last_recorded_delta
    }

    pub fn delta_seconds(&self) -> f32 {
        self.last_recorded_delta.as_secs_f32()
    }

    pub fn elapsed_total(&self) -> Duration {
        self.last - self.start
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_first_delta_is_zero() {
        let time = TimeDelta::default();
        assert_eq!(time.delta_time(), Duration::ZERO);
        assert_eq!(time.frame_count(), 0);
    }

    #[test]
    fn test_next_records_interval() {
        let mut time = TimeDelta::default();
        thread::sleep(Duration::from_millis(5));
        time.next();
        assert!(time.delta_time() >= Duration::from_millis(5));
        assert!(time.delta_seconds() >= 0.005);

        time.next();
        assert_eq!(time.frame_count(), 2);
        assert!(time.elapsed_total() >= Duration::from_millis(5));
    }
}
