//! 缓冲区资源
//!
//! 静态数据（顶点、索引）一次性上传；每帧变化的小块数据（统一缓冲区）
//! 通过 [`UploadBuffer`] 从环形分配器中取子缓冲区，前几帧仍在使用的
//! 区域不会被覆盖。

use std::marker::PhantomData;
use std::sync::Arc;

use vulkano::buffer::allocator::{SubbufferAllocator, SubbufferAllocatorCreateInfo};
use vulkano::buffer::{Buffer, BufferContents, BufferCreateInfo, BufferUsage, Subbuffer};
use vulkano::memory::allocator::{AllocationCreateInfo, MemoryTypeFilter, StandardMemoryAllocator};

use crate::core::error::{GraphicsError, Result};

/// 缓冲区使用类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsageType {
    Vertex,
    Index,
    /// 统一缓冲区（Uniform Buffer）
    Constant,
    Storage,
    /// 上传缓冲区（CPU -> GPU）
    Upload,
}

impl BufferUsageType {
    pub fn to_vulkano(self) -> BufferUsage {
        match self {
            BufferUsageType::Vertex => BufferUsage::VERTEX_BUFFER,
            BufferUsageType::Index => BufferUsage::INDEX_BUFFER,
            BufferUsageType::Constant => BufferUsage::UNIFORM_BUFFER,
            BufferUsageType::Storage => BufferUsage::STORAGE_BUFFER,
            BufferUsageType::Upload => BufferUsage::TRANSFER_SRC,
        }
    }
}

/// 缓冲区内存类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryType {
    /// GPU本地内存（最快，仅GPU可访问）
    DeviceLocal,
    /// CPU 顺序写入，GPU 读取
    HostVisible,
}

impl MemoryType {
    pub fn to_filter(self) -> MemoryTypeFilter {
        match self {
            MemoryType::DeviceLocal => MemoryTypeFilter::PREFER_DEVICE,
            MemoryType::HostVisible => MemoryTypeFilter::PREFER_DEVICE | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
        }
    }
}

/// 缓冲区描述信息
#[derive(Debug, Clone)]
pub struct BufferDescriptor {
    /// 缓冲区大小（字节）
    pub size: u64,
    pub usage: BufferUsageType,
    pub memory_type: MemoryType,
    /// 调试名称（可选）
    pub name: Option<String>,
}

impl BufferDescriptor {
    pub fn new(size: u64, usage: BufferUsageType, memory_type: MemoryType) -> Self {
        Self {
            size,
            usage,
            memory_type,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 统一缓冲区按设备的偏移对齐要求向上取整，其余类型保持原大小
    pub fn aligned_size(&self, uniform_alignment: u64) -> u64 {
        if self.usage == BufferUsageType::Constant {
            align_up(self.size, uniform_alignment)
        } else {
            self.size
        }
    }
}

/// `alignment` 必须是 2 的幂；0 和 1 表示不对齐
pub fn align_up(size: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return size;
    }
    (size + alignment - 1) & !(alignment - 1)
}

/// 每帧上传的类型化数据
///
/// 底层是 vulkano 的 [`SubbufferAllocator`]：每次 `upload` 都从当前 arena
/// 中取一块新的子缓冲区，已经提交给 GPU 的子缓冲区在命令缓冲区完成前
/// 一直由它持有。
pub struct UploadBuffer<T> {
    allocator: SubbufferAllocator,
    descriptor: BufferDescriptor,
    element_size: u64,
    _phantom: PhantomData<T>,
}

impl<T: BufferContents> UploadBuffer<T> {
    pub fn new(
        memory_allocator: Arc<StandardMemoryAllocator>,
        usage: BufferUsageType,
        uniform_alignment: u64,
    ) -> Self {
        let descriptor = BufferDescriptor::new(std::mem::size_of::<T>() as u64, usage, MemoryType::HostVisible);
        let element_size = descriptor.aligned_size(uniform_alignment);

        let allocator = SubbufferAllocator::new(
            memory_allocator,
            SubbufferAllocatorCreateInfo {
                buffer_usage: usage.to_vulkano(),
                memory_type_filter: descriptor.memory_type.to_filter(),
                ..Default::default()
            },
        );

        Self {
            allocator,
            descriptor,
            element_size,
            _phantom: PhantomData,
        }
    }

    /// 写入一份数据并返回可绑定的子缓冲区
    pub fn upload(&self, value: T) -> Result<Subbuffer<T>> {
        let subbuffer = self
            .allocator
            .allocate_sized::<T>()
            .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to allocate upload buffer: {:?}", e)))?;

        *subbuffer
            .write()
            .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to write upload buffer: {:?}", e)))? = value;

        Ok(subbuffer)
    }

    /// 每个元素对齐后的大小
    pub fn element_size(&self) -> u64 {
        self.element_size
    }

    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }
}

fn upload_allocation() -> AllocationCreateInfo {
    AllocationCreateInfo {
        memory_type_filter: MemoryType::HostVisible.to_filter(),
        ..Default::default()
    }
}

/// 把迭代器中的数据上传到新的缓冲区
pub fn upload_iter<T, I>(allocator: Arc<StandardMemoryAllocator>, usage: BufferUsage, iter: I) -> Result<Subbuffer<[T]>>
where
    T: BufferContents,
    I: IntoIterator<Item = T>,
    I::IntoIter: ExactSizeIterator,
{
    Buffer::from_iter(
        allocator,
        BufferCreateInfo {
            usage,
            ..Default::default()
        },
        upload_allocation(),
        iter,
    )
    .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to create buffer: {:?}", e)).into())
}

/// 上传单个值
pub fn upload_data<T>(allocator: Arc<StandardMemoryAllocator>, usage: BufferUsage, data: T) -> Result<Subbuffer<T>>
where
    T: BufferContents,
{
    Buffer::from_data(
        allocator,
        BufferCreateInfo {
            usage,
            ..Default::default()
        },
        upload_allocation(),
        data,
    )
    .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to create buffer: {:?}", e)).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(100, 256), 256);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(300, 256), 512);
        assert_eq!(align_up(3, 4), 4);
        assert_eq!(align_up(7, 0), 7);
        assert_eq!(align_up(7, 1), 7);
    }

    #[test]
    fn test_buffer_descriptor_alignment() {
        let constant = BufferDescriptor::new(100, BufferUsageType::Constant, MemoryType::HostVisible);
        assert_eq!(constant.aligned_size(256), 256);
        assert_eq!(constant.aligned_size(64), 128);

        let vertex = BufferDescriptor::new(100, BufferUsageType::Vertex, MemoryType::DeviceLocal).with_name("cube");
        assert_eq!(vertex.aligned_size(256), 100);
        assert_eq!(vertex.name.as_deref(), Some("cube"));
    }

    #[test]
    fn test_usage_mapping() {
        assert_eq!(BufferUsageType::Vertex.to_vulkano(), BufferUsage::VERTEX_BUFFER);
        assert_eq!(BufferUsageType::Constant.to_vulkano(), BufferUsage::UNIFORM_BUFFER);
        assert!(MemoryType::HostVisible
            .to_filter()
            .contains(MemoryTypeFilter::HOST_SEQUENTIAL_WRITE));
    }
}
