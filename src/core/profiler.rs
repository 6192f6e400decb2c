//! 帧性能分析器
//!
//! 每帧收集若干条带名字的计时记录，帧结束时把当前帧放进历史。
//! 历史的长度有上限，超出时丢弃最旧的帧。分析器关闭时不记录任何数据。
//!
//! ```
//! use asaogea::core::profiler::Profiler;
//!
//! let profiler = Profiler::new(60);
//! profiler.enable(true);
//! {
//!     let _scope = profiler.record("update");
//! }
//! profiler.new_frame();
//! assert_eq!(profiler.history().len(), 1);
//! ```

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};

/// 一条计时记录
#[derive(Debug, Clone)]
pub struct RecordData {
    pub name: &'static str,
    pub start: Instant,
    pub elapsed: Duration,
}

pub type FrameRecords = Vec<RecordData>;

pub struct Profiler {
    history: RwLock<VecDeque<FrameRecords>>,
    current_frame: RwLock<Option<FrameRecords>>,
    max_history: usize,
}

impl Profiler {
    pub fn new(max_history: usize) -> Self {
        Self {
            history: RwLock::new(VecDeque::with_capacity(max_history)),
            current_frame: RwLock::new(None),
            max_history: max_history.max(1),
        }
    }

    pub fn enable(&self, enabled: bool) {
        let mut current = self.current_frame.write();
        match (enabled, current.is_some()) {
            (true, false) => *current = Some(Vec::new()),
            (false, _) => *current = None,
            _ => {}
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.current_frame.read().is_some()
    }

    /// 结束当前帧并开始新的一帧
    pub fn new_frame(&self) {
        let mut current = self.current_frame.write();
        let Some(frame) = current.as_mut() else {
            return;
        };
        let finished = std::mem::take(frame);
        drop(current);

        let mut history = self.history.write();
        while history.len() >= self.max_history {
            history.pop_front();
        }
        history.push_back(finished);
    }

    /// 开始一条计时记录，在 `end()` 或离开作用域时写入当前帧
    pub fn record(&self, name: &'static str) -> Record<'_> {
        Record {
            profiler: self,
            name,
            start: Instant::now(),
            finished: false,
        }
    }

    pub fn history(&self) -> RwLockReadGuard<'_, VecDeque<FrameRecords>> {
        self.history.read()
    }

    /// 当前帧的记录；分析器关闭时返回 `None`
    pub fn current(&self) -> Option<MappedRwLockReadGuard<'_, FrameRecords>> {
        RwLockReadGuard::try_map(self.current_frame.read(), Option::as_ref).ok()
    }

    pub fn clear(&self) {
        self.history.write().clear();
        if let Some(frame) = self.current_frame.write().as_mut() {
            frame.clear();
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// 一帧中所有记录耗时之和
    pub fn frame_total(frame: &[RecordData]) -> Duration {
        frame.iter().map(|r| r.elapsed).sum()
    }

    /// 按名字汇总历史中每帧的耗时，用于绘制曲线
    pub fn series(&self, name: &str) -> Vec<Duration> {
        self.history
            .read()
            .iter()
            .map(|frame| {
                frame
                    .iter()
                    .filter(|r| r.name == name)
                    .map(|r| r.elapsed)
                    .sum()
            })
            .collect()
    }

    fn push(&self, data: RecordData) {
        if let Some(frame) = self.current_frame.write().as_mut() {
            frame.push(data);
        }
    }
}

pub struct Record<'a> {
    profiler: &'a Profiler,
    name: &'static str,
    start: Instant,
    finished: bool,
}

impl Record<'_> {
    pub fn end(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.profiler.push(RecordData {
            name: self.name,
            start: self.start,
            elapsed: self.start.elapsed(),
        });
    }
}

impl Drop for Record<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_profiler_records_nothing() {
        let profiler = Profiler::new(8);
        profiler.record("draw").end();
        profiler.new_frame();

        assert!(!profiler.is_enabled());
        assert!(profiler.current().is_none());
        assert!(profiler.history().is_empty());
    }

    #[test]
    fn test_records_go_to_current_frame() {
        let profiler = Profiler::new(8);
        profiler.enable(true);
        profiler.record("update").end();
        {
            let _draw = profiler.record("draw");
        }

        let current = profiler.current().unwrap();
        let names: Vec<_> = current.iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["update", "draw"]);
    }

    #[test]
    fn test_new_frame_moves_to_history() {
        let profiler = Profiler::new(8);
        profiler.enable(true);
        profiler.record("a").end();
        profiler.new_frame();
        profiler.record("b").end();
        profiler.record("b").end();
        profiler.new_frame();

        let history = profiler.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].len(), 1);
        assert_eq!(history[1].len(), 2);
        drop(history);
        assert!(profiler.current().unwrap().is_empty());
        assert_eq!(profiler.series("b").len(), 2);
    }

    #[test]
    fn test_history_is_bounded() {
        let profiler = Profiler::new(3);
        profiler.enable(true);
        for _ in 0..10 {
            profiler.record("frame").end();
            profiler.new_frame();
        }
        assert_eq!(profiler.history().len(), 3);
    }

    #[test]
    fn test_clear_and_disable() {
        let profiler = Profiler::new(4);
        profiler.enable(true);
        profiler.record("x").end();
        profiler.new_frame();
        profiler.record("y").end();
        profiler.clear();

        assert!(profiler.history().is_empty());
        assert!(profiler.current().unwrap().is_empty());

        profiler.enable(false);
        assert!(!profiler.is_enabled());
    }

    #[test]
    fn test_frame_total() {
        let now = Instant::now();
        let frame = vec![
            RecordData { name: "a", start: now, elapsed: Duration::from_millis(2) },
            RecordData { name: "b", start: now, elapsed: Duration::from_millis(3) },
        ];
        assert_eq!(Profiler::frame_total(&frame), Duration::from_millis(5));
    }
}
