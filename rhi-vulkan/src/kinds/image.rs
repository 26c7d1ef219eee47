use crate::{
    convert,
    error::driver,
    guard::{free_allocation, AllocationGuard, OnDrop},
    interface::{owning_device, vulkan_interface},
};
use ash::vk;
use gpu_allocator::{
    vulkan::{Allocation, AllocationCreateDesc, AllocationScheme},
    MemoryLocation,
};
use rhi::{ImageCreateInfo, ImageType, ImageUsageFlags, Interface, Kind, Ptr};
use std::fmt::Debug;

/// VulkanのImage
///
/// shaderやattachmentとして使うusageを持つimageは、全体を覆うimage viewも持つ。
#[repr(C)]
pub struct VulkanImage {
    base: rhi::Image,
    image: vk::Image,
    view: Option<vk::ImageView>,
    allocation: Option<Allocation>,
}
rhi::impl_kind!(VulkanImage { base: rhi::Image } => rhi::Object);

impl VulkanImage {
    /// vk::Imageを取得する
    /// ## Safety
    /// 参照カウントの管理から中身を取り出すので注意。
    /// Imageが破棄されると、この関数で取り出したvk::Imageは無効になる。
    pub unsafe fn image_raw(&self) -> vk::Image {
        self.image
    }

    /// vk::ImageViewを取得する
    /// ## Safety
    /// 参照カウントの管理から中身を取り出すので注意。
    /// Imageが破棄されると、この関数で取り出したvk::ImageViewは無効になる。
    pub unsafe fn image_view_raw(&self) -> Option<vk::ImageView> {
        self.view
    }
}

impl Drop for VulkanImage {
    fn drop(&mut self) {
        let allocation = self.allocation.take();
        let device = owning_device(self.object());
        unsafe {
            if let Some(view) = self.view {
                device.raw().destroy_image_view(view, None);
            }
        }
        if let Some(allocation) = allocation {
            free_allocation(device, allocation);
        }
        unsafe { device.raw().destroy_image(self.image, None) };
        log::debug!("destroyed image {:?}", self.image);
    }
}

impl Debug for VulkanImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanImage")
            .field("object", self.object())
            .field("format", &self.base.format())
            .field("extent", &self.base.extent())
            .field("image", &self.image)
            .field("view", &self.view)
            .finish()
    }
}

// image viewを作る必要があるusage
const VIEW_USAGE: ImageUsageFlags = ImageUsageFlags::SAMPLED
    .union(ImageUsageFlags::STORAGE)
    .union(ImageUsageFlags::COLOR_ATTACHMENT)
    .union(ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT);

/// imageの種類とlayer数からimage viewの種類を決める
fn view_type(image_type: ImageType, array_layer_count: u32) -> vk::ImageViewType {
    match (image_type, array_layer_count > 1) {
        (ImageType::D1, false) => vk::ImageViewType::TYPE_1D,
        (ImageType::D1, true) => vk::ImageViewType::TYPE_1D_ARRAY,
        (ImageType::D2, false) => vk::ImageViewType::TYPE_2D,
        (ImageType::D2, true) => vk::ImageViewType::TYPE_2D_ARRAY,
        (ImageType::D3, _) => vk::ImageViewType::TYPE_3D,
    }
}

pub(crate) fn new_image(
    interface: &Ptr<Interface>,
    create_info: &ImageCreateInfo,
) -> rhi::Result<Ptr<rhi::Image>> {
    let device = vulkan_interface(interface)?.selected_device()?;
    let format = convert::format(create_info.format);

    // imageの作成
    let extent = vk::Extent3D {
        width: create_info.extent.x,
        height: create_info.extent.y,
        depth: create_info.extent.z,
    };
    let image_create_info = vk::ImageCreateInfo::builder()
        .image_type(convert::image_type(create_info.image_type))
        .format(format)
        .extent(extent)
        .mip_levels(create_info.mip_level_count)
        .array_layers(create_info.array_layer_count)
        .samples(vk::SampleCountFlags::TYPE_1)
        .tiling(vk::ImageTiling::OPTIMAL)
        .usage(convert::image_usage(create_info.usage))
        .sharing_mode(vk::SharingMode::EXCLUSIVE)
        .initial_layout(vk::ImageLayout::UNDEFINED);
    let image = unsafe { device.raw().create_image(&image_create_info, None) }.map_err(driver)?;
    let image_guard = {
        let device = device.raw().clone();
        OnDrop::new(move || unsafe { device.destroy_image(image, None) })
    };

    // imageのメモリ確保
    let requirements = unsafe { device.raw().get_image_memory_requirements(image) };
    let allocation = AllocationGuard::allocate(
        device,
        &AllocationCreateDesc {
            name: "image",
            requirements,
            location: MemoryLocation::GpuOnly,
            linear: false,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        },
    )?;

    // imageとメモリのバインド
    unsafe {
        device.raw().bind_image_memory(
            image,
            allocation.allocation().memory(),
            allocation.allocation().offset(),
        )
    }
    .map_err(driver)?;

    // image viewの作成
    let view = if create_info.usage.intersects(VIEW_USAGE) {
        let aspect_mask = if convert::is_depth(create_info.format) {
            vk::ImageAspectFlags::DEPTH
        } else {
            vk::ImageAspectFlags::COLOR
        };
        let view_create_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(view_type(
                create_info.image_type,
                create_info.array_layer_count,
            ))
            .format(format)
            .subresource_range(
                vk::ImageSubresourceRange::builder()
                    .aspect_mask(aspect_mask)
                    .base_mip_level(0)
                    .level_count(create_info.mip_level_count)
                    .base_array_layer(0)
                    .layer_count(create_info.array_layer_count)
                    .build(),
            );
        Some(unsafe { device.raw().create_image_view(&view_create_info, None) }.map_err(driver)?)
    } else {
        None
    };
    let view_guard = {
        let device = device.raw().clone();
        OnDrop::new(move || {
            if let Some(view) = view {
                unsafe { device.destroy_image_view(view, None) }
            }
        })
    };

    let vulkan_image = rhi::new_object(
        Some(interface.clone().upcast()),
        interface.object().allocator(),
        |object| VulkanImage {
            base: rhi::Image::new(object, create_info),
            image,
            view,
            allocation: Some(allocation.into_inner()),
        },
    )?;
    view_guard.dismiss();
    image_guard.dismiss();

    log::debug!(
        "created {:?} image {:?} of {:?}",
        create_info.format,
        image,
        create_info.extent
    );
    Ok(vulkan_image.upcast())
}
