//! Interfaceのディスパッチテーブルから作られるVulkanのリソースを定義する。
//!
//! どのリソースも親としてVulkanInterfaceへの参照を持ち、
//! 破棄の際は親のInterfaceが持つdeviceを使ってハンドルを破棄する。

mod descriptor;
pub(crate) use descriptor::{new_descriptor_set, new_descriptor_set_layout};
pub use descriptor::{VulkanDescriptorSet, VulkanDescriptorSetLayout};
mod pipeline;
pub(crate) use pipeline::{new_compute_pipeline, new_graphics_pipeline, new_pipeline_layout};
pub use pipeline::{VulkanComputePipeline, VulkanGraphicsPipeline, VulkanPipelineLayout};
mod buffer;
pub(crate) use buffer::new_buffer;
pub use buffer::VulkanBuffer;
mod image;
pub(crate) use image::new_image;
pub use image::VulkanImage;
mod swapchain;
pub(crate) use swapchain::new_swapchain;
pub use swapchain::VulkanSwapchain;
mod command_buffer;
pub(crate) use command_buffer::new_command_buffer;
pub use command_buffer::VulkanCommandBuffer;
