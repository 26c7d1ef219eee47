//! バックエンドへそのまま渡すフラグと列挙型。
//!
//! 値はVulkanのABIと一致している必要があるので、番号を振り直してはいけない。

use bitflags::bitflags;

bitflags! {
    /// VkShaderStageFlagBits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        /// VERTEX_BIT
        const VERTEX = 0x0000_0001;
        /// FRAGMENT_BIT
        const FRAGMENT = 0x0000_0010;
        /// COMPUTE_BIT
        const COMPUTE = 0x0000_0020;
    }
}

bitflags! {
    /// VkPipelineStageFlagBits2
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineStageFlags: u64 {
        /// NONE
        const NONE = 0;
        /// DRAW_INDIRECT_BIT
        const ARGUMENT_INPUT = 0x0000_0002;
        /// VERTEX_SHADER_BIT
        const VERTEX_SHADER = 0x0000_0008;
        /// FRAGMENT_SHADER_BIT
        const FRAGMENT_SHADER = 0x0000_0080;
        /// EARLY_FRAGMENT_TESTS_BIT
        const EARLY_FRAGMENT_TESTS = 0x0000_0100;
        /// LATE_FRAGMENT_TESTS_BIT
        const LATE_FRAGMENT_TESTS = 0x0000_0200;
        /// COLOR_ATTACHMENT_OUTPUT_BIT
        const COLOR_ATTACHMENT_OUTPUT = 0x0000_0400;
        /// COMPUTE_SHADER_BIT
        const COMPUTE_SHADER = 0x0000_0800;
        /// COPY_BIT
        const COPY = 0x1_0000_0000;
        /// RESOLVE_BIT
        const RESOLVE = 0x2_0000_0000;
        /// BLIT_BIT
        const BLIT = 0x4_0000_0000;
        /// CLEAR_BIT
        const CLEAR = 0x8_0000_0000;
        /// INDEX_INPUT_BIT
        const INDEX_INPUT = 0x10_0000_0000;
    }
}

bitflags! {
    /// VkAccessFlagBits2
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u64 {
        /// NONE
        const NONE = 0;
        /// INDIRECT_COMMAND_READ_BIT
        const ARGUMENT_READ = 0x0000_0001;
        /// INDEX_READ_BIT
        const INDEX_READ = 0x0000_0002;
        /// UNIFORM_READ_BIT
        const UNIFORM_READ = 0x0000_0008;
        /// COLOR_ATTACHMENT_READ_BIT
        const COLOR_ATTACHMENT_READ = 0x0000_0080;
        /// COLOR_ATTACHMENT_WRITE_BIT
        const COLOR_ATTACHMENT_WRITE = 0x0000_0100;
        /// DEPTH_STENCIL_ATTACHMENT_READ_BIT
        const DEPTH_STENCIL_ATTACHMENT_READ = 0x0000_0200;
        /// DEPTH_STENCIL_ATTACHMENT_WRITE_BIT
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 0x0000_0400;
        /// TRANSFER_READ_BIT
        const TRANSFER_READ = 0x0000_0800;
        /// TRANSFER_WRITE_BIT
        const TRANSFER_WRITE = 0x0000_1000;
        /// SHADER_SAMPLED_READ_BIT
        const SHADER_SAMPLED_READ = 0x1_0000_0000;
        /// SHADER_STORAGE_READ_BIT
        const SHADER_STORAGE_READ = 0x2_0000_0000;
        /// SHADER_STORAGE_WRITE_BIT
        const SHADER_STORAGE_WRITE = 0x4_0000_0000;
    }
}

bitflags! {
    /// VkImageUsageFlagBits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsageFlags: u32 {
        /// TRANSFER_SRC_BIT
        const TRANSFER_SRC = 0x0000_0001;
        /// TRANSFER_DST_BIT
        const TRANSFER_DST = 0x0000_0002;
        /// SAMPLED_BIT
        const SAMPLED = 0x0000_0004;
        /// STORAGE_BIT
        const STORAGE = 0x0000_0008;
        /// COLOR_ATTACHMENT_BIT
        const COLOR_ATTACHMENT = 0x0000_0010;
        /// DEPTH_STENCIL_ATTACHMENT_BIT
        const DEPTH_STENCIL_ATTACHMENT = 0x0000_0020;
    }
}

bitflags! {
    /// VkBufferUsageFlagBits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsageFlags: u32 {
        /// TRANSFER_SRC_BIT
        const TRANSFER_SRC = 0x0000_0001;
        /// TRANSFER_DST_BIT
        const TRANSFER_DST = 0x0000_0002;
        /// UNIFORM_BUFFER_BIT
        const UNIFORM = 0x0000_0010;
        /// STORAGE_BUFFER_BIT
        const STORAGE = 0x0000_0020;
        /// INDEX_BUFFER_BIT
        const INDEX = 0x0000_0040;
        /// VERTEX_BUFFER_BIT
        const VERTEX = 0x0000_0080;
        /// INDIRECT_BUFFER_BIT
        const ARGUMENT = 0x0000_0100;
    }
}

/// VkDescriptorType
///
/// 4と5はVulkanのtexel buffer用に予約されている値なので欠番にしている。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DescriptorType {
    /// SAMPLER
    Sampler = 0,
    /// COMBINED_IMAGE_SAMPLER
    CombinedImageSampler = 1,
    /// SAMPLED_IMAGE
    SampledImage = 2,
    /// STORAGE_IMAGE
    StorageImage = 3,
    /// UNIFORM_BUFFER
    UniformBuffer = 6,
    /// STORAGE_BUFFER
    StorageBuffer = 7,
}

/// VkImageType
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ImageType {
    /// 1D
    D1 = 0,
    /// 2D
    D2 = 1,
    /// 3D
    D3 = 2,
}

/// VkFormat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ImageFormat {
    /// R8G8B8A8_UNORM
    R8G8B8A8Unorm = 37,
    /// R8G8B8A8_SRGB
    R8G8B8A8Srgb = 43,
    /// B8G8R8A8_UNORM
    B8G8R8A8Unorm = 44,
    /// B8G8R8A8_SRGB
    B8G8R8A8Srgb = 50,
    /// R16G16B16A16_SFLOAT
    R16G16B16A16Sfloat = 97,
    /// R32G32B32A32_SFLOAT
    R32G32B32A32Sfloat = 109,
    /// D32_SFLOAT
    D32Sfloat = 126,
}

/// メモリを置く場所
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemoryLocation {
    /// GPUからのみアクセスする
    #[default]
    GpuOnly,
    /// CPUから書き込んでGPUで読む
    CpuToGpu,
    /// GPUで書き込んでCPUで読む
    GpuToCpu,
}

/// dispatch indirectの引数(VkDispatchIndirectCommand)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct DispatchIndirectCommand {
    /// x方向のworkgroup数
    pub x: u32,
    /// y方向のworkgroup数
    pub y: u32,
    /// z方向のworkgroup数
    pub z: u32,
}

/// draw indirectの引数(VkDrawIndirectCommand)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct DrawIndirectCommand {
    /// 頂点数
    pub vertex_count: u32,
    /// インスタンス数
    pub instance_count: u32,
    /// 最初の頂点
    pub first_vertex: u32,
    /// 最初のインスタンス
    pub first_instance: u32,
}
