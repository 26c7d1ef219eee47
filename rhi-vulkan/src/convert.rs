//! rhiのフラグと列挙型をash::vkの型へ変換する。
//!
//! rhiの値はVulkanのABIと一致しているので、ビットをそのまま渡すだけでよい。

use ash::vk;

pub(crate) fn shader_stages(flags: rhi::ShaderStageFlags) -> vk::ShaderStageFlags {
    vk::ShaderStageFlags::from_raw(flags.bits())
}

pub(crate) fn pipeline_stages(flags: rhi::PipelineStageFlags) -> vk::PipelineStageFlags2 {
    vk::PipelineStageFlags2::from_raw(flags.bits())
}

pub(crate) fn access(flags: rhi::AccessFlags) -> vk::AccessFlags2 {
    vk::AccessFlags2::from_raw(flags.bits())
}

pub(crate) fn image_usage(flags: rhi::ImageUsageFlags) -> vk::ImageUsageFlags {
    vk::ImageUsageFlags::from_raw(flags.bits())
}

pub(crate) fn buffer_usage(flags: rhi::BufferUsageFlags) -> vk::BufferUsageFlags {
    vk::BufferUsageFlags::from_raw(flags.bits())
}

pub(crate) fn descriptor_type(ty: rhi::DescriptorType) -> vk::DescriptorType {
    vk::DescriptorType::from_raw(ty as i32)
}

pub(crate) fn image_type(ty: rhi::ImageType) -> vk::ImageType {
    vk::ImageType::from_raw(ty as i32)
}

pub(crate) fn format(format: rhi::ImageFormat) -> vk::Format {
    vk::Format::from_raw(format as i32)
}

/// rhiで表せないフォーマットならNone
pub(crate) fn image_format(format: vk::Format) -> Option<rhi::ImageFormat> {
    use rhi::ImageFormat::*;
    [
        R8G8B8A8Unorm,
        R8G8B8A8Srgb,
        B8G8R8A8Unorm,
        B8G8R8A8Srgb,
        R16G16B16A16Sfloat,
        R32G32B32A32Sfloat,
        D32Sfloat,
    ]
    .into_iter()
    .find(|candidate| *candidate as i32 == format.as_raw())
}

pub(crate) fn memory_location(location: rhi::MemoryLocation) -> gpu_allocator::MemoryLocation {
    match location {
        rhi::MemoryLocation::GpuOnly => gpu_allocator::MemoryLocation::GpuOnly,
        rhi::MemoryLocation::CpuToGpu => gpu_allocator::MemoryLocation::CpuToGpu,
        rhi::MemoryLocation::GpuToCpu => gpu_allocator::MemoryLocation::GpuToCpu,
    }
}

/// depthのフォーマットか
pub(crate) fn is_depth(format: rhi::ImageFormat) -> bool {
    matches!(format, rhi::ImageFormat::D32Sfloat)
}
