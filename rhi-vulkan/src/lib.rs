//! ashとgpu-allocatorで実装したrhiのVulkanバックエンド。
//!
//! [`new_interface`]でVulkanのinstanceを持つInterfaceを作り、
//! [`select_device`]でdeviceを一度だけ選択してからリソースを作る。
//! ここで作ったリソースはすべてrhiの`Ptr`で所有し、
//! 参照が0になったときに親のInterfaceのdeviceでVulkanのハンドルを破棄する。

mod convert;
mod device;
pub use device::{select_device, Device};
mod error;
pub use error::VulkanError;
mod guard;
mod interface;
pub use interface::{
    new_interface, InterfaceCreateFlags, InterfaceCreateInfo, VulkanInterface, VALIDATION_LAYER,
};
mod kinds;
pub use kinds::{
    VulkanBuffer, VulkanCommandBuffer, VulkanComputePipeline, VulkanDescriptorSet,
    VulkanDescriptorSetLayout, VulkanGraphicsPipeline, VulkanImage, VulkanPipelineLayout,
    VulkanSwapchain,
};
mod loader;
mod surface;
pub use surface::{new_surface, SurfaceCreateInfo, VulkanSurface};
