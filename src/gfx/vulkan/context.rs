//! Vulkan 上下文
//!
//! 封装实例、表面、设备、队列以及三种分配器。
//!
//! # 初始化流程
//!
//! 1. 加载 Vulkan 库，创建实例（表面扩展 + 可选验证层）
//! 2. 从 winit 窗口创建表面
//! 3. 按设备类型打分选择物理设备
//! 4. 选择队列族，创建逻辑设备和队列
//! 5. 创建内存、命令缓冲和描述符集分配器

use std::sync::Arc;

use raw_window_handle::{HasRawWindowHandle, RawWindowHandle};
use tracing::{debug, info, warn};
use vulkano::command_buffer::allocator::{
    StandardCommandBufferAllocator, StandardCommandBufferAllocatorCreateInfo,
};
use vulkano::descriptor_set::allocator::StandardDescriptorSetAllocator;
use vulkano::device::physical::{PhysicalDevice, PhysicalDeviceType};
use vulkano::device::{Device, DeviceCreateInfo, DeviceExtensions, Queue, QueueCreateInfo};
use vulkano::instance::{Instance, InstanceCreateFlags, InstanceCreateInfo, InstanceExtensions};
use vulkano::memory::allocator::StandardMemoryAllocator;
use vulkano::swapchain::Surface;
use vulkano::VulkanLibrary;
use winit::window::Window;

use super::queues::{QueueFamilyInfo, QueueFamilySelection};
use crate::core::config::GraphicsConfig;
use crate::core::error::{GraphicsError, Result};

const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

/// Vulkan 上下文
pub struct VulkanContext {
    pub instance: Arc<Instance>,
    pub surface: Arc<Surface>,
    window: Arc<Window>,
    pub physical_device: Arc<PhysicalDevice>,
    pub device: Arc<Device>,
    /// 图形队列，也用于传输
    pub graphics_queue: Arc<Queue>,
    /// 与图形队列不同族时单独创建
    pub present_queue: Arc<Queue>,
    pub queue_families: QueueFamilySelection,
    pub memory_allocator: Arc<StandardMemoryAllocator>,
    pub command_buffer_allocator: StandardCommandBufferAllocator,
    pub descriptor_allocator: StandardDescriptorSetAllocator,
}

impl VulkanContext {
    pub fn new(window: Arc<Window>, config: &GraphicsConfig) -> Result<Self> {
        let library = VulkanLibrary::new()
            .map_err(|e| GraphicsError::InstanceCreation(format!("Failed to load Vulkan library: {:?}", e)))?;

        let mut enabled_extensions = Surface::required_extensions(&*window);
        let portability = library.supported_extensions().khr_portability_enumeration;
        enabled_extensions.khr_portability_enumeration = portability;

        let enabled_layers = if config.validation_layers {
            validation_layers(&library)
        } else {
            Vec::new()
        };

        #[cfg(debug_assertions)]
        debug!(extensions = ?enabled_extensions_names(&enabled_extensions), "Creating Vulkan instance");

        let instance = Instance::new(
            library,
            InstanceCreateInfo {
                flags: if portability {
                    InstanceCreateFlags::ENUMERATE_PORTABILITY
                } else {
                    InstanceCreateFlags::empty()
                },
                enabled_extensions,
                enabled_layers,
                ..Default::default()
            },
        )
        .map_err(|e| GraphicsError::InstanceCreation(format!("Failed to create Vulkan instance: {:?}", e)))?;

        #[cfg(debug_assertions)]
        debug!("Vulkan instance created");

        let window_kind = window_handle_kind(&window.raw_window_handle());
        let surface = Surface::from_window(instance.clone(), window.clone())
            .map_err(|e| GraphicsError::InstanceCreation(format!("Failed to create {} surface: {:?}", window_kind, e)))?;

        #[cfg(debug_assertions)]
        debug!(window = window_kind, "Vulkan surface created");

        let device_extensions = DeviceExtensions {
            khr_swapchain: true,
            ..DeviceExtensions::empty()
        };

        let (physical_device, queue_families) = instance
            .enumerate_physical_devices()
            .map_err(|e| GraphicsError::NoSuitableDevice(format!("Failed to enumerate physical devices: {:?}", e)))?
            .filter(|p| p.supported_extensions().contains(&device_extensions))
            .filter_map(|p| {
                let families = queue_family_infos(&p, &surface);
                match QueueFamilySelection::select(&families) {
                    Ok(selection) => Some((p, selection)),
                    Err(e) => {
                        debug!(device = %p.properties().device_name, "Skipping device: {}", e);
                        None
                    }
                }
            })
            .min_by_key(|(p, _)| device_type_score(p.properties().device_type, config.prefer_discrete_gpu))
            .ok_or_else(|| GraphicsError::NoSuitableDevice("No device supports graphics, presentation and swapchains".to_string()))?;

        info!(
            device_name = %physical_device.properties().device_name,
            device_type = ?physical_device.properties().device_type,
            "Using device"
        );
        #[cfg(debug_assertions)]
        debug!(?queue_families, "Queue families selected");

        // 图形族和呈现族各一个队列
        let mut families = vec![queue_families.graphics];
        if queue_families.present != queue_families.graphics {
            families.push(queue_families.present);
        }

        let (device, queues) = Device::new(
            physical_device.clone(),
            DeviceCreateInfo {
                enabled_extensions: device_extensions,
                queue_create_infos: families
                    .iter()
                    .map(|&queue_family_index| QueueCreateInfo {
                        queue_family_index,
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            },
        )
        .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to create logical device: {:?}", e)))?;

        let queues: Vec<Arc<Queue>> = queues.collect();
        let find_queue = |family: u32| {
            queues
                .iter()
                .find(|q| q.queue_family_index() == family)
                .cloned()
                .ok_or_else(|| GraphicsError::DeviceCreation(format!("No queue created for family {}", family)))
        };
        let graphics_queue = find_queue(queue_families.graphics)?;
        let present_queue = find_queue(queue_families.present)?;

        let memory_allocator = Arc::new(StandardMemoryAllocator::new_default(device.clone()));
        let command_buffer_allocator = StandardCommandBufferAllocator::new(
            device.clone(),
            StandardCommandBufferAllocatorCreateInfo::default(),
        );
        let descriptor_allocator = StandardDescriptorSetAllocator::new(device.clone(), Default::default());

        #[cfg(debug_assertions)]
        debug!("Vulkan context initialization complete");

        Ok(Self {
            instance,
            surface,
            window,
            physical_device,
            device,
            graphics_queue,
            present_queue,
            queue_families,
            memory_allocator,
            command_buffer_allocator,
            descriptor_allocator,
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    pub fn device_name(&self) -> &str {
        &self.physical_device.properties().device_name
    }

    /// 统一缓冲区偏移对齐要求
    pub fn uniform_alignment(&self) -> u64 {
        self.physical_device
            .properties()
            .min_uniform_buffer_offset_alignment
            .as_devicesize()
    }

    /// 阻塞直到设备空闲
    pub fn wait_idle(&self) {
        // SAFETY: 调用方保证没有其他线程在提交命令
        if let Err(e) = unsafe { self.device.wait_idle() } {
            warn!("Device wait idle failed: {:?}", e);
        }
    }
}

/// 验证层可用时返回其名称
fn validation_layers(library: &VulkanLibrary) -> Vec<String> {
    match library.layer_properties() {
        Ok(mut layers) => {
            if layers.any(|l| l.name() == VALIDATION_LAYER) {
                info!("Vulkan validation layer enabled");
                vec![VALIDATION_LAYER.to_string()]
            } else {
                warn!("{} requested but not installed", VALIDATION_LAYER);
                Vec::new()
            }
        }
        Err(e) => {
            warn!("Failed to query Vulkan layers: {:?}", e);
            Vec::new()
        }
    }
}

#[cfg(debug_assertions)]
fn enabled_extensions_names(extensions: &InstanceExtensions) -> Vec<&'static str> {
    let mut names = Vec::new();
    if extensions.khr_surface {
        names.push("VK_KHR_surface");
    }
    if extensions.khr_xlib_surface {
        names.push("VK_KHR_xlib_surface");
    }
    if extensions.khr_xcb_surface {
        names.push("VK_KHR_xcb_surface");
    }
    if extensions.khr_wayland_surface {
        names.push("VK_KHR_wayland_surface");
    }
    if extensions.khr_win32_surface {
        names.push("VK_KHR_win32_surface");
    }
    if extensions.ext_metal_surface {
        names.push("VK_EXT_metal_surface");
    }
    if extensions.khr_portability_enumeration {
        names.push("VK_KHR_portability_enumeration");
    }
    names
}

fn queue_family_infos(physical_device: &PhysicalDevice, surface: &Surface) -> Vec<QueueFamilyInfo> {
    physical_device
        .queue_family_properties()
        .iter()
        .enumerate()
        .map(|(index, properties)| {
            let index = index as u32;
            let supports_present = physical_device.surface_support(index, surface).unwrap_or(false);
            QueueFamilyInfo::new(index, properties.queue_flags, supports_present)
        })
        .collect()
}

/// 设备类型得分，越小越优先
pub fn device_type_score(device_type: PhysicalDeviceType, prefer_discrete: bool) -> u32 {
    match (device_type, prefer_discrete) {
        (PhysicalDeviceType::DiscreteGpu, true) => 0,
        (PhysicalDeviceType::IntegratedGpu, true) => 1,
        (PhysicalDeviceType::IntegratedGpu, false) => 0,
        (PhysicalDeviceType::DiscreteGpu, false) => 1,
        (PhysicalDeviceType::VirtualGpu, _) => 2,
        (PhysicalDeviceType::Cpu, _) => 3,
        (PhysicalDeviceType::Other, _) => 4,
        _ => 5,
    }
}

/// 窗口系统名称，只用于日志
pub fn window_handle_kind(handle: &RawWindowHandle) -> &'static str {
    match handle {
        RawWindowHandle::Xlib(_) => "Xlib",
        RawWindowHandle::Xcb(_) => "Xcb",
        RawWindowHandle::Wayland(_) => "Wayland",
        RawWindowHandle::Win32(_) => "Win32",
        RawWindowHandle::AppKit(_) => "AppKit",
        RawWindowHandle::UiKit(_) => "UiKit",
        RawWindowHandle::AndroidNdk(_) => "AndroidNdk",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raw_window_handle::{Win32WindowHandle, XlibWindowHandle};

    #[test]
    fn test_device_type_score() {
        let discrete = device_type_score(PhysicalDeviceType::DiscreteGpu, true);
        let integrated = device_type_score(PhysicalDeviceType::IntegratedGpu, true);
        let cpu = device_type_score(PhysicalDeviceType::Cpu, true);
        assert!(discrete < integrated);
        assert!(integrated < cpu);

        assert!(
            device_type_score(PhysicalDeviceType::IntegratedGpu, false)
                < device_type_score(PhysicalDeviceType::DiscreteGpu, false)
        );
    }

    #[test]
    fn test_window_handle_kind() {
        assert_eq!(window_handle_kind(&RawWindowHandle::Xlib(XlibWindowHandle::empty())), "Xlib");
        assert_eq!(window_handle_kind(&RawWindowHandle::Win32(Win32WindowHandle::empty())), "Win32");
    }
}
