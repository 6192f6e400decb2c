//! 帧同步与延迟释放
//!
//! CPU 与 GPU 之间用一条单调递增的时间线（fence value）同步：
//! 每提交一帧，CPU 端的值加一；GPU 完成该帧后，完成值追上来。
//!
//! - 帧 N: CPU正在写入
//! - 帧 N-1: GPU正在处理
//! - 帧 N-2: 完成，可以复用
//!
//! 在帧中途被替换或释放的 GPU 对象（旧网格、GUI 纹理、随交换链重建的图像）
//! 不能立即销毁，而是交给 [`DeferredReleaseQueue`]，等 GPU 越过对应的 fence
//! 值后再回收。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// Fence值
///
/// 时间线上的一个点，值越大越晚。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FenceValue(u64);

impl FenceValue {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn increment(&mut self) {
        self.0 += 1;
    }

    /// 下一个值，自身不变
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

/// CPU / GPU 两条计数器
///
/// `current` 是最后一次分配出去的值，`completed` 是已知 GPU 完成到的值。
#[derive(Debug, Default)]
pub struct FenceManager {
    current: AtomicU64,
    completed: AtomicU64,
}

impl FenceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_value(&self) -> FenceValue {
        FenceValue(self.current.load(Ordering::Acquire))
    }

    pub fn completed_value(&self) -> FenceValue {
        FenceValue(self.completed.load(Ordering::Acquire))
    }

    /// 分配下一帧的 fence 值
    pub fn next_value(&self) -> FenceValue {
        FenceValue(self.current.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// GPU 完成到 `value`。完成值只会前进，不会倒退。
    pub fn update_completed_value(&self, value: FenceValue) {
        self.completed.fetch_max(value.0, Ordering::AcqRel);
    }

    pub fn is_completed(&self, value: FenceValue) -> bool {
        self.completed_value() >= value
    }

    /// 所有已分配的值都已完成
    pub fn is_idle(&self) -> bool {
        self.completed_value() >= self.current_value()
    }

    /// 设备空闲后调用：把完成值推到当前值
    pub fn flush(&self) {
        self.update_completed_value(self.current_value());
    }

    pub fn reset(&self) {
        self.current.store(0, Ordering::Release);
        self.completed.store(0, Ordering::Release);
    }
}

/// 帧资源
#[derive(Debug, Clone)]
pub struct FrameResource {
    pub frame_index: usize,
    /// 最后一次使用这一帧时提交的 fence 值
    pub fence_value: FenceValue,
    pub available: bool,
}

impl FrameResource {
    pub fn new(frame_index: usize) -> Self {
        Self {
            frame_index,
            fence_value: FenceValue::default(),
            available: true,
        }
    }

    /// 标记为不可用（GPU正在使用）
    pub fn mark_in_use(&mut self, fence_value: FenceValue) {
        self.available = false;
        self.fence_value = fence_value;
    }

    pub fn mark_available(&mut self) {
        self.available = true;
    }
}

/// 帧资源池
///
/// 管理 `frames_in_flight` 个帧资源的循环使用。
#[derive(Debug)]
pub struct FrameResourcePool {
    resources: Vec<FrameResource>,
    current_index: usize,
}

impl FrameResourcePool {
    /// 至少两帧，少于两帧时按两帧处理
    pub fn new(count: usize) -> Self {
        let count = count.max(2);
        Self {
            resources: (0..count).map(FrameResource::new).collect(),
            current_index: 0,
        }
    }

    pub fn triple_buffering() -> Self {
        Self::new(3)
    }

    pub fn double_buffering() -> Self {
        Self::new(2)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn current(&self) -> &FrameResource {
        &self.resources[self.current_index]
    }

    pub fn current_mut(&mut self) -> &mut FrameResource {
        &mut self.resources[self.current_index]
    }

    pub fn get(&self, index: usize) -> Option<&FrameResource> {
        self.resources.get(index)
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// 移动到下一帧
    pub fn advance(&mut self) -> &FrameResource {
        self.current_index = (self.current_index + 1) % self.resources.len();
        self.current()
    }

    /// 根据Fence值更新帧资源可用性
    pub fn update_availability(&mut self, completed: FenceValue) {
        for resource in &mut self.resources {
            if !resource.available && resource.fence_value <= completed {
                resource.mark_available();
            }
        }
    }

    /// 下一帧仍在使用中时返回需要等待的 fence 值
    pub fn next_available_fence_value(&self) -> Option<FenceValue> {
        let next = &self.resources[(self.current_index + 1) % self.resources.len()];
        (!next.available).then_some(next.fence_value)
    }
}

/// 延迟释放队列（资源垃圾回收）
///
/// 条目按 fence 值的提交顺序入队；`collect` 从队头开始丢弃所有
/// fence 值不大于完成值的条目。
#[derive(Debug)]
pub struct DeferredReleaseQueue<T> {
    entries: VecDeque<(FenceValue, T)>,
}

impl<T> Default for DeferredReleaseQueue<T> {
    fn default() -> Self {
        Self { entries: VecDeque::new() }
    }
}

impl<T> DeferredReleaseQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 交出 `item`，直到 `fence_value` 完成后才会被丢弃
    pub fn retire(&mut self, item: T, fence_value: FenceValue) {
        // 保持队列按 fence 值有序，乱序提交时插到合适的位置
        let position = self
            .entries
            .iter()
            .rposition(|(value, _)| *value <= fence_value)
            .map_or(0, |i| i + 1);
        self.entries.insert(position, (fence_value, item));
    }

    /// 丢弃所有已完成的条目，返回丢弃的数量
    pub fn collect(&mut self, completed: FenceValue) -> usize {
        let mut released = 0;
        while let Some((value, _)) = self.entries.front() {
            if *value > completed {
                break;
            }
            self.entries.pop_front();
            released += 1;
        }
        released
    }

    /// 设备空闲时丢弃全部条目
    pub fn flush(&mut self) -> usize {
        let released = self.entries.len();
        self.entries.clear();
        released
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_fence_value() {
        let mut fence = FenceValue::new(0);
        assert_eq!(fence.value(), 0);

        fence.increment();
        assert_eq!(fence.value(), 1);

        let next = fence.next();
        assert_eq!(next.value(), 2);
        assert_eq!(fence.value(), 1);
        assert!(fence < next);
    }

    #[test]
    fn test_fence_manager() {
        let manager = FenceManager::new();
        assert!(manager.is_idle());

        let v1 = manager.next_value();
        let v2 = manager.next_value();
        assert_eq!(v1.value(), 1);
        assert_eq!(v2.value(), 2);
        assert!(!manager.is_idle());

        manager.update_completed_value(v1);
        assert!(manager.is_completed(v1));
        assert!(!manager.is_completed(v2));

        // 完成值不会倒退
        manager.update_completed_value(FenceValue::new(0));
        assert_eq!(manager.completed_value(), v1);

        manager.flush();
        assert!(manager.is_idle());

        manager.reset();
        assert_eq!(manager.current_value().value(), 0);
    }

    #[test]
    fn test_frame_resource_pool() {
        let mut pool = FrameResourcePool::triple_buffering();
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.current_index(), 0);

        pool.current_mut().mark_in_use(FenceValue::new(1));
        assert!(!pool.current().available);

        pool.advance();
        pool.advance();
        assert_eq!(pool.next_available_fence_value(), Some(FenceValue::new(1)));

        pool.update_availability(FenceValue::new(1));
        assert_eq!(pool.next_available_fence_value(), None);
        pool.advance();
        assert_eq!(pool.current_index(), 0);
        assert!(pool.current().available);
    }

    #[test]
    fn test_pool_has_at_least_two_frames() {
        assert_eq!(FrameResourcePool::new(0).len(), 2);
        assert_eq!(FrameResourcePool::double_buffering().len(), 2);
    }

    #[test]
    fn test_deferred_release() {
        let mut queue = DeferredReleaseQueue::new();
        let tracked = Arc::new(());

        queue.retire(tracked.clone(), FenceValue::new(1));
        queue.retire(tracked.clone(), FenceValue::new(2));
        queue.retire(tracked.clone(), FenceValue::new(2));
        assert_eq!(queue.len(), 3);
        assert_eq!(Arc::strong_count(&tracked), 4);

        assert_eq!(queue.collect(FenceValue::new(0)), 0);
        assert_eq!(queue.collect(FenceValue::new(1)), 1);
        assert_eq!(Arc::strong_count(&tracked), 3);

        assert_eq!(queue.collect(FenceValue::new(5)), 2);
        assert!(queue.is_empty());
        assert_eq!(Arc::strong_count(&tracked), 1);
    }

    #[test]
    fn test_deferred_release_out_of_order() {
        let mut queue = DeferredReleaseQueue::new();
        queue.retire("late", FenceValue::new(4));
        queue.retire("early", FenceValue::new(2));

        assert_eq!(queue.collect(FenceValue::new(3)), 1);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.flush(), 1);
        assert!(queue.is_empty());
    }
}
