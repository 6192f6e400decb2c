//! GPU 资源：缓冲区、图像、采样器、网格、管线和描述符集

pub mod buffer;
pub mod descriptor;
pub mod image;
pub mod mesh;
pub mod pipeline;
pub mod sampler;

pub use buffer::{align_up, upload_data, upload_iter, BufferDescriptor, BufferUsageType, MemoryType, UploadBuffer};
pub use descriptor::{set_layout, DescriptorAllocatorExt, DescriptorCache};
pub use image::{checker_texture, create_attachment, is_depth_format, upload_texture, TEXTURE_FORMAT};
pub use mesh::{GpuMesh, IndexWidth, MeshVertex};
pub use pipeline::{blend_state, AlphaMode, PipelineConfig};
pub use sampler::SamplerConfig;
