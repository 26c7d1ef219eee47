//! Interfaceが生成するリソースの種類と、その生成に使うcreate infoを定義する。
//!
//! 各種類はObjectを先頭に埋め込んだだけのレコードで、
//! バックエンドはこれをさらに先頭に埋め込んだ具体的な型を作る。

mod interface;
pub use interface::{Interface, InterfaceDispatch};
mod descriptor;
pub use descriptor::{
    DescriptorSet, DescriptorSetCreateInfo, DescriptorSetLayout, DescriptorSetLayoutBinding,
    DescriptorSetLayoutCreateInfo,
};
mod pipeline;
pub use pipeline::{
    ComputePipeline, ComputePipelineCreateInfo, GraphicsPipeline, GraphicsPipelineCreateInfo,
    PipelineLayout, PipelineLayoutCreateInfo, ShaderStage,
};
mod buffer;
pub use buffer::{Buffer, BufferCreateInfo};
mod image;
pub use image::{Image, ImageCreateInfo};
mod surface;
pub use surface::Surface;
mod swapchain;
pub use swapchain::{Swapchain, SwapchainCreateInfo};
mod command_buffer;
pub use command_buffer::{
    BarrierScope, CommandBuffer, CommandBufferCreateInfo, CommandBufferDispatch, IndirectDraw,
};
