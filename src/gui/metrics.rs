//! 性能统计
//!
//! PerformanceMetrics 保存最近若干帧的帧时间，计算平均帧率、
//! 平均/最短/最长帧时间。

use std::collections::VecDeque;
use std::time::Duration;

/// 默认统计窗口（帧）
const DEFAULT_WINDOW: usize = 120;

/// 性能统计（帧率、帧时间）
#[derive(Debug, Clone)]
pub struct PerformanceMetrics {
    frame_times: VecDeque<Duration>,
    window: usize,
    total_frames: u64,
    /// 当前网格的三角形数，没有网格时为 0
    pub triangles: u32,
    pub draw_calls: u32,
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    pub fn with_window(window: usize) -> Self {
        let window = window.max(1);
        Self {
            frame_times: VecDeque::with_capacity(window),
            window,
            total_frames: 0,
            triangles: 0,
            draw_calls: 0,
        }
    }

    /// 记录一帧的耗时
    pub fn record_frame(&mut self, frame_time: Duration) {
        if self.frame_times.len() == self.window {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(frame_time);
        self.total_frames += 1;
    }

    /// 窗口内的平均帧率
    pub fn fps(&self) -> f32 {
        let average = self.frame_time_ms();
        if average > 0.0 {
            1000.0 / average
        } else {
            0.0
        }
    }

    /// 平均帧时间（毫秒）
    pub fn frame_time_ms(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        let total: Duration = self.frame_times.iter().sum();
        total.as_secs_f32() * 1000.0 / self.frame_times.len() as f32
    }

    pub fn min_frame_time_ms(&self) -> f32 {
        self.frame_times
            .iter()
            .min()
            .map_or(0.0, |d| d.as_secs_f32() * 1000.0)
    }

    pub fn max_frame_time_ms(&self) -> f32 {
        self.frame_times
            .iter()
            .max()
            .map_or(0.0, |d| d.as_secs_f32() * 1000.0)
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// 绘图用的帧时间序列（毫秒）
    pub fn frame_times_ms(&self) -> impl Iterator<Item = f32> + '_ {
        self.frame_times.iter().map(|d| d.as_secs_f32() * 1000.0)
    }
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_metrics() {
        let metrics = PerformanceMetrics::new();
        assert_eq!(metrics.fps(), 0.0);
        assert_eq!(metrics.frame_time_ms(), 0.0);
        assert_eq!(metrics.max_frame_time_ms(), 0.0);
    }

    #[test]
    fn test_average_fps() {
        let mut metrics = PerformanceMetrics::new();
        for _ in 0..10 {
            metrics.record_frame(Duration::from_millis(20));
        }
        assert!((metrics.frame_time_ms() - 20.0).abs() < 1e-3);
        assert!((metrics.fps() - 50.0).abs() < 1e-2);
        assert_eq!(metrics.total_frames(), 10);
    }

    #[test]
    fn test_window_drops_old_frames() {
        let mut metrics = PerformanceMetrics::with_window(2);
        metrics.record_frame(Duration::from_millis(100));
        metrics.record_frame(Duration::from_millis(10));
        metrics.record_frame(Duration::from_millis(30));

        assert!((metrics.frame_time_ms() - 20.0).abs() < 1e-3);
        assert!((metrics.min_frame_time_ms() - 10.0).abs() < 1e-3);
        assert!((metrics.max_frame_time_ms() - 30.0).abs() < 1e-3);
        assert_eq!(metrics.frame_times_ms().count(), 2);
        assert_eq!(metrics.total_frames(), 3);
    }
}
