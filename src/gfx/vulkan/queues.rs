//! 队列族选择
//!
//! 只依赖队列族属性与 present 支持，不需要设备即可测试。
//!
//! - 图形队列：必须支持 GRAPHICS，优先同时支持 COMPUTE 和 TRANSFER 的族
//! - 呈现队列：优先选择既不是图形族也不是计算族的族，其次是任意非图形族，
//!   最后才与图形族共用
//! - 异步计算：图形与呈现之外剩下的计算族
//! - 传输队列：剩下的专用传输族，没有时退回第一个支持传输的族

use vulkano::device::QueueFlags;

use crate::core::error::{GraphicsError, Result};

/// 队列用途
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueRole {
    Graphics,
    Present,
    Compute,
    AsyncCompute,
    Transfer,
}

/// 物理设备上一个队列族的描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyInfo {
    pub index: u32,
    pub flags: QueueFlags,
    pub supports_present: bool,
}

impl QueueFamilyInfo {
    pub fn new(index: u32, flags: QueueFlags, supports_present: bool) -> Self {
        Self {
            index,
            flags,
            supports_present,
        }
    }
}

/// 选出的队列族索引
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilySelection {
    pub graphics: u32,
    pub present: u32,
    pub compute: Option<u32>,
    pub async_compute: Option<u32>,
    pub transfer: Option<u32>,
}

impl QueueFamilySelection {
    pub fn select(families: &[QueueFamilyInfo]) -> Result<Self> {
        let all: Vec<&QueueFamilyInfo> = families.iter().collect();

        let compute = best_suited(&all, QueueFlags::COMPUTE, false, &[]);
        let graphics = best_suited(
            &all,
            QueueFlags::GRAPHICS,
            false,
            &[QueueFlags::COMPUTE | QueueFlags::TRANSFER],
        )
        .ok_or_else(|| GraphicsError::NoSuitableDevice("No graphics queue family".to_string()))?;

        let without = |excluded: &[Option<u32>]| -> Vec<&QueueFamilyInfo> {
            all.iter()
                .copied()
                .filter(|f| !excluded.contains(&Some(f.index)))
                .collect()
        };

        let present = best_suited(&without(&[Some(graphics), compute]), QueueFlags::empty(), true, &[])
            .or_else(|| best_suited(&without(&[Some(graphics)]), QueueFlags::empty(), true, &[]))
            .or_else(|| best_suited(&all, QueueFlags::empty(), true, &[]))
            .ok_or_else(|| GraphicsError::NoSuitableDevice("No present-capable queue family".to_string()))?;

        let remaining = without(&[Some(graphics), Some(present)]);
        let async_compute = best_suited(&remaining, QueueFlags::COMPUTE, false, &[]);

        let remaining = without(&[Some(graphics), Some(present), async_compute]);
        // 图形族隐含传输能力
        let transfer = best_suited(&remaining, QueueFlags::TRANSFER, false, &[])
            .or_else(|| best_suited(&all, QueueFlags::TRANSFER, false, &[]))
            .or(Some(graphics));

        Ok(Self {
            graphics,
            present,
            compute,
            async_compute,
            transfer,
        })
    }

    pub fn family(&self, role: QueueRole) -> Option<u32> {
        match role {
            QueueRole::Graphics => Some(self.graphics),
            QueueRole::Present => Some(self.present),
            QueueRole::Compute => self.compute,
            QueueRole::AsyncCompute => self.async_compute,
            QueueRole::Transfer => self.transfer,
        }
    }

    /// 需要创建队列的族，按首次出现的顺序去重
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families = Vec::new();
        for family in [
            Some(self.graphics),
            Some(self.present),
            self.compute,
            self.async_compute,
            self.transfer,
        ]
        .into_iter()
        .flatten()
        {
            if !families.contains(&family) {
                families.push(family);
            }
        }
        families
    }
}

/// 满足 `required` 的族中按 `desired` 打分，越靠前的期望权重越高；同分取索引最小的
fn best_suited(
    families: &[&QueueFamilyInfo],
    required: QueueFlags,
    require_present: bool,
    desired: &[QueueFlags],
) -> Option<u32> {
    families
        .iter()
        .filter(|f| !require_present || f.supports_present)
        .filter(|f| f.flags.contains(required))
        .map(|f| {
            let score: usize = desired
                .iter()
                .enumerate()
                .filter(|(_, flags)| f.flags.contains(**flags))
                .map(|(power, _)| desired.len() - power)
                .sum();
            (score, f.index)
        })
        .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        .map(|(_, index)| index)
}
