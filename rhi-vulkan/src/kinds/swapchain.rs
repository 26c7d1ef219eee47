use crate::{
    convert,
    error::driver,
    guard::OnDrop,
    interface::vulkan_interface,
    surface::VulkanSurface,
    VulkanError,
};
use ash::{extensions::khr, vk};
use glam::UVec2;
use rhi::{Interface, Kind, Ptr, SwapchainCreateInfo};
use std::fmt::Debug;

/// VulkanのSwapchain
///
/// 表示先のSurfaceへの参照を保持するので、Surfaceより先に破棄される。
#[repr(C)]
pub struct VulkanSwapchain {
    base: rhi::Swapchain,
    swapchain_loader: khr::Swapchain,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
}
rhi::impl_kind!(VulkanSwapchain { base: rhi::Swapchain } => rhi::Object);

impl VulkanSwapchain {
    /// vk::SwapchainKHRを取得する
    /// ## Safety
    /// 参照カウントの管理から中身を取り出すので注意。
    /// Swapchainが破棄されると、この関数で取り出したvk::SwapchainKHRは無効になる。
    pub unsafe fn swapchain_raw(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// swapchainのimage
    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }
}

impl Drop for VulkanSwapchain {
    fn drop(&mut self) {
        unsafe {
            self.swapchain_loader
                .destroy_swapchain(self.swapchain, None)
        };
        log::debug!("destroyed swapchain {:?}", self.swapchain);
    }
}

impl Debug for VulkanSwapchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanSwapchain")
            .field("object", self.object())
            .field("format", &self.base.format())
            .field("extent", &self.base.extent())
            .field("swapchain", &self.swapchain)
            .finish()
    }
}

/// surfaceのformatを選択する
///
/// sRGBのB8G8R8A8を優先し、なければrhiで表せる最初のformatを使う。
fn choose_surface_format(
    surface_formats: &[vk::SurfaceFormatKHR],
) -> Option<(vk::SurfaceFormatKHR, rhi::ImageFormat)> {
    let representable = |surface_format: &vk::SurfaceFormatKHR| {
        convert::image_format(surface_format.format).map(|format| (*surface_format, format))
    };
    surface_formats
        .iter()
        .filter(|surface_format| surface_format.format == vk::Format::B8G8R8A8_SRGB)
        .find_map(representable)
        .or_else(|| surface_formats.iter().find_map(representable))
}

/// surfaceのextentを選択する
///
/// surfaceが大きさを決めていればそれを使い、そうでなければ希望の大きさを範囲に収める。
fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, requested: UVec2) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: requested.x.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: requested.y.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// image countを選択する
fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let image_count = capabilities.min_image_count + 1;
    if capabilities.max_image_count != 0 {
        image_count.min(capabilities.max_image_count)
    } else {
        image_count
    }
}

pub(crate) fn new_swapchain(
    interface: &Ptr<Interface>,
    create_info: &SwapchainCreateInfo,
) -> rhi::Result<Ptr<rhi::Swapchain>> {
    let vulkan = vulkan_interface(interface)?;
    let device = vulkan.selected_device()?;
    let surface_loader = vulkan.surface_loader().ok_or(VulkanError::ForeignSurface)?;
    let swapchain_loader = device.swapchain_loader()?.clone();

    // surfaceはこのInterfaceで作られたものでなければならない
    let surface = create_info.surface.downcast_ref::<VulkanSurface>()?;
    let is_own = surface
        .object()
        .parent()
        .is_some_and(|parent| Ptr::ptr_eq(parent, interface));
    if !is_own {
        return Err(VulkanError::ForeignSurface.into());
    }

    let physical_device = device.physical_device();
    let (capabilities, surface_formats) = unsafe {
        (
            surface_loader
                .get_physical_device_surface_capabilities(physical_device, surface.surface())
                .map_err(driver)?,
            surface_loader
                .get_physical_device_surface_formats(physical_device, surface.surface())
                .map_err(driver)?,
        )
    };

    // surfaceのformatの選択
    let (surface_format, format) = choose_surface_format(&surface_formats)
        .ok_or_else(|| driver(vk::Result::ERROR_FORMAT_NOT_SUPPORTED))?;
    let extent = choose_extent(&capabilities, create_info.extent);
    let image_count = choose_image_count(&capabilities);

    // swapchainの作成
    // FIFOはすべての実装で使える
    let swapchain_create_info = vk::SwapchainCreateInfoKHR::builder()
        .surface(surface.surface())
        .min_image_count(image_count)
        .image_color_space(surface_format.color_space)
        .image_format(surface_format.format)
        .image_extent(extent)
        .image_usage(convert::image_usage(create_info.usage))
        .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        .pre_transform(capabilities.current_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(vk::PresentModeKHR::FIFO)
        .image_array_layers(1)
        .clipped(true);
    let swapchain = unsafe { swapchain_loader.create_swapchain(&swapchain_create_info, None) }
        .map_err(driver)?;
    let swapchain_guard = {
        let swapchain_loader = swapchain_loader.clone();
        OnDrop::new(move || unsafe { swapchain_loader.destroy_swapchain(swapchain, None) })
    };

    // swapchainのimageの取得
    let images = unsafe { swapchain_loader.get_swapchain_images(swapchain) }.map_err(driver)?;
    let actual_image_count = images.len() as u32;

    let vulkan_swapchain = rhi::new_object(
        Some(interface.clone().upcast()),
        interface.object().allocator(),
        |object| VulkanSwapchain {
            base: rhi::Swapchain::new(
                object,
                create_info.surface,
                format,
                UVec2::new(extent.width, extent.height),
                actual_image_count,
            ),
            swapchain_loader,
            swapchain,
            images,
        },
    )?;
    swapchain_guard.dismiss();

    log::debug!(
        "created swapchain {:?}: {:?} {}x{} with {} images",
        swapchain,
        format,
        extent.width,
        extent.height,
        actual_image_count
    );
    Ok(vulkan_swapchain.upcast())
}
