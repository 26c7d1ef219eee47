//! 呼び出し側が作ったvk::SurfaceKHRを引き取るSurfaceを定義する。

use crate::{interface::vulkan_interface, VulkanError};
use ash::{extensions::khr, vk};
use rhi::{Interface, Kind, Ptr};
use std::fmt::Debug;

/// Surfaceのcreate info
#[derive(Debug, Clone, Copy)]
pub struct SurfaceCreateInfo {
    /// ウィンドウシステムから作ったsurface
    pub handle: vk::SurfaceKHR,
}

/// VulkanのSurface
#[repr(C)]
pub struct VulkanSurface {
    base: rhi::Surface,
    surface_loader: khr::Surface,
    surface: vk::SurfaceKHR,
}
rhi::impl_kind!(VulkanSurface { base: rhi::Surface } => rhi::Object);

impl VulkanSurface {
    /// vk::SurfaceKHRを取得する
    pub fn surface(&self) -> vk::SurfaceKHR {
        self.surface
    }
}

impl Drop for VulkanSurface {
    fn drop(&mut self) {
        unsafe { self.surface_loader.destroy_surface(self.surface, None) };
        log::debug!("destroyed surface");
    }
}

impl Debug for VulkanSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanSurface")
            .field("object", self.object())
            .field("surface", &self.surface)
            .finish()
    }
}

/// 呼び出し側が作ったsurfaceからSurfaceを作る
///
/// 成功した場合だけsurfaceの所有権を引き取り、Surfaceの破棄時にsurfaceも破棄する。
/// 失敗した場合surfaceは呼び出し側が破棄すること。
/// InterfaceはWSIを有効にして作られている必要がある。
pub fn new_surface(
    interface: &Ptr<Interface>,
    create_info: &SurfaceCreateInfo,
) -> rhi::Result<Ptr<rhi::Surface>> {
    let vulkan = vulkan_interface(interface)?;
    let surface_loader = vulkan
        .surface_loader()
        .ok_or(VulkanError::ForeignSurface)?
        .clone();

    let surface = rhi::new_object(
        Some(interface.clone().upcast()),
        interface.object().allocator(),
        |object| VulkanSurface {
            base: rhi::Surface::new(object),
            surface_loader,
            surface: create_info.handle,
        },
    )?;
    log::debug!("created surface {:?}", create_info.handle);
    Ok(surface.upcast())
}
