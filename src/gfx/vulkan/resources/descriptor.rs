//! 描述符集管理
//!
//! vulkano 的 `StandardDescriptorSetAllocator` 已经负责描述符池，这里只提供
//! 两类常用集合的构建（统一缓冲区、纹理 + 采样器），以及按纹理 ID 缓存的
//! [`DescriptorCache`]。缓存中移除的集合由调用方交给延迟释放队列。

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use vulkano::buffer::{BufferContents, Subbuffer};
use vulkano::descriptor_set::allocator::StandardDescriptorSetAllocator;
use vulkano::descriptor_set::layout::DescriptorSetLayout;
use vulkano::descriptor_set::{PersistentDescriptorSet, WriteDescriptorSet};
use vulkano::image::sampler::Sampler;
use vulkano::image::view::ImageView;
use vulkano::pipeline::{GraphicsPipeline, Pipeline};

use crate::core::error::{GraphicsError, Result};

/// 描述符集构建辅助方法
pub trait DescriptorAllocatorExt {
    /// 只含一个统一缓冲区的集合
    fn uniform_set<T>(
        &self,
        layout: Arc<DescriptorSetLayout>,
        binding: u32,
        buffer: Subbuffer<T>,
    ) -> Result<Arc<PersistentDescriptorSet>>
    where
        T: BufferContents + ?Sized;

    /// 组合图像采样器
    fn texture_set(
        &self,
        layout: Arc<DescriptorSetLayout>,
        binding: u32,
        view: Arc<ImageView>,
        sampler: Arc<Sampler>,
    ) -> Result<Arc<PersistentDescriptorSet>>;
}

impl DescriptorAllocatorExt for StandardDescriptorSetAllocator {
    fn uniform_set<T>(
        &self,
        layout: Arc<DescriptorSetLayout>,
        binding: u32,
        buffer: Subbuffer<T>,
    ) -> Result<Arc<PersistentDescriptorSet>>
    where
        T: BufferContents + ?Sized,
    {
        PersistentDescriptorSet::new(self, layout, [WriteDescriptorSet::buffer(binding, buffer)], [])
            .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to allocate uniform set: {:?}", e)).into())
    }

    fn texture_set(
        &self,
        layout: Arc<DescriptorSetLayout>,
        binding: u32,
        view: Arc<ImageView>,
        sampler: Arc<Sampler>,
    ) -> Result<Arc<PersistentDescriptorSet>> {
        PersistentDescriptorSet::new(
            self,
            layout,
            [WriteDescriptorSet::image_view_sampler(binding, view, sampler)],
            [],
        )
        .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to allocate texture set: {:?}", e)).into())
    }
}

/// 管线第 `index` 个描述符集布局
pub fn set_layout(pipeline: &GraphicsPipeline, index: usize) -> Result<Arc<DescriptorSetLayout>> {
    pipeline
        .layout()
        .set_layouts()
        .get(index)
        .cloned()
        .ok_or_else(|| GraphicsError::ResourceCreation(format!("Pipeline has no descriptor set {}", index)).into())
}

/// 按键缓存描述符集
#[derive(Debug)]
pub struct DescriptorCache<K, V = Arc<PersistentDescriptorSet>> {
    sets: HashMap<K, V>,
}

impl<K: Eq + Hash, V: Clone> DescriptorCache<K, V> {
    pub fn new() -> Self {
        Self { sets: HashMap::new() }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.sets.get(key).cloned()
    }

    /// 插入并返回旧值
    pub fn insert(&mut self, key: K, set: V) -> Option<V> {
        self.sets.insert(key, set)
    }

    /// 缓存未命中时调用 `create`；创建失败不会写入缓存
    pub fn get_or_try_insert_with<F>(&mut self, key: K, create: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(set) = self.sets.get(&key) {
            return Ok(set.clone());
        }
        let set = create()?;
        self.sets.insert(key, set.clone());
        Ok(set)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.sets.remove(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.sets.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// 取出全部缓存项
    pub fn drain(&mut self) -> Vec<V> {
        self.sets.drain().map(|(_, set)| set).collect()
    }
}

impl<K: Eq + Hash, V: Clone> Default for DescriptorCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::EngineError;

    #[test]
    fn test_cache_insert_and_remove() {
        let mut cache: DescriptorCache<u64, u32> = DescriptorCache::new();
        assert!(cache.is_empty());

        assert_eq!(cache.insert(1, 10), None);
        assert_eq!(cache.insert(1, 11), Some(10));
        assert_eq!(cache.get(&1), Some(11));
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.remove(&1), Some(11));
        assert!(!cache.contains(&1));
    }

    #[test]
    fn test_get_or_try_insert_with() {
        let mut cache: DescriptorCache<&str, u32> = DescriptorCache::new();
        let mut calls = 0;

        let first = cache.get_or_try_insert_with("font", || {
            calls += 1;
            Ok(7)
        });
        assert_eq!(first.unwrap(), 7);

        let second = cache.get_or_try_insert_with("font", || {
            calls += 1;
            Ok(8)
        });
        assert_eq!(second.unwrap(), 7);
        assert_eq!(calls, 1);

        let failed = cache.get_or_try_insert_with("user", || Err(EngineError::Runtime("no texture".into())));
        assert!(failed.is_err());
        assert!(!cache.contains(&"user"));
    }

    #[test]
    fn test_drain() {
        let mut cache: DescriptorCache<u32, u32> = DescriptorCache::default();
        cache.insert(1, 1);
        cache.insert(2, 2);
        let mut drained = cache.drain();
        drained.sort();
        assert_eq!(drained, vec![1, 2]);
        assert!(cache.is_empty());
    }
}
