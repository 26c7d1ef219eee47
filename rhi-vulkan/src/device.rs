//! Interfaceで一度だけ行うdeviceの選択と、選択したdeviceを定義する。

use crate::{
    error::driver, guard::OnDrop, interface::vulkan_interface, surface::VulkanSurface,
    VulkanError,
};
use ash::{extensions::khr, vk};
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use parking_lot::{Mutex, MutexGuard};
use rhi::{Interface, Kind, Ptr};
use std::{ffi::CStr, fmt::Debug, mem::ManuallyDrop};

/// 選択したphysical deviceと、そこに作ったlogical device
///
/// graphicsとcomputeの両方に対応したqueueを一つだけ持つ。
pub struct Device {
    physical_device: vk::PhysicalDevice,
    device: ash::Device,
    queue_family_index: u32,
    queue: vk::Queue,
    swapchain_loader: Option<khr::Swapchain>,
    allocator: ManuallyDrop<Mutex<Allocator>>,
}
impl Device {
    /// physical device
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// queueのfamily index
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    /// graphicsとcomputeに対応したqueue
    pub fn queue(&self) -> vk::Queue {
        self.queue
    }

    /// ash::Deviceを取得する
    /// ## Safety
    /// 参照カウントの管理から中身を取り出すので注意。
    /// Interfaceが破棄されると、この関数で取り出したash::Deviceは無効になる。
    pub unsafe fn device_raw(&self) -> ash::Device {
        self.device.clone()
    }

    pub(crate) fn raw(&self) -> &ash::Device {
        &self.device
    }

    pub(crate) fn swapchain_loader(&self) -> Result<&khr::Swapchain, VulkanError> {
        self.swapchain_loader
            .as_ref()
            .ok_or(VulkanError::ForeignSurface)
    }

    pub(crate) fn allocator(&self) -> MutexGuard<'_, Allocator> {
        self.allocator.lock()
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            if let Err(result) = self.device.device_wait_idle() {
                log::warn!("device_wait_idle failed while destroying the device: {result}");
            }
            // 確保したメモリはdeviceより先に解放する
            ManuallyDrop::drop(&mut self.allocator);
            self.device.destroy_device(None);
        }
        log::info!("destroyed Vulkan device");
    }
}

impl Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("physical_device", &self.physical_device)
            .field("queue_family_index", &self.queue_family_index)
            .finish_non_exhaustive()
    }
}

// 選ばれたphysical deviceの候補
struct Candidate {
    physical_device: vk::PhysicalDevice,
    queue_family_index: u32,
    discrete: bool,
}

/// physical deviceが条件を満たしていれば候補として返す
fn inspect_physical_device(
    instance: &ash::Instance,
    surface: Option<(&khr::Surface, vk::SurfaceKHR)>,
    require_swapchain: bool,
    physical_device: vk::PhysicalDevice,
) -> Option<Candidate> {
    let properties = unsafe { instance.get_physical_device_properties(physical_device) };
    if properties.api_version < vk::API_VERSION_1_3 {
        return None;
    }

    // デバイス拡張の確認
    if require_swapchain {
        let device_extensions =
            unsafe { instance.enumerate_device_extension_properties(physical_device) }.ok()?;
        let is_swapchain_supported = device_extensions.iter().any(|extension| {
            let name = unsafe { CStr::from_ptr(extension.extension_name.as_ptr()) };
            name == khr::Swapchain::name()
        });
        if !is_swapchain_supported {
            return None;
        }
    }

    // dynamic renderingとsynchronization2、draw indirect countを使う
    let mut features_12 = vk::PhysicalDeviceVulkan12Features::builder().build();
    let mut features_13 = vk::PhysicalDeviceVulkan13Features::builder().build();
    let mut features = vk::PhysicalDeviceFeatures2::builder()
        .push_next(&mut features_12)
        .push_next(&mut features_13)
        .build();
    unsafe { instance.get_physical_device_features2(physical_device, &mut features) };
    let is_supported_device_features = features_12.draw_indirect_count == vk::TRUE
        && features_13.dynamic_rendering == vk::TRUE
        && features_13.synchronization2 == vk::TRUE;
    if !is_supported_device_features {
        return None;
    }

    // GraphicsとComputeの両方に対応し、surfaceがあればPresentにも対応しているQueueFamily
    let queue_families =
        unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
    let queue_family_index = queue_families
        .iter()
        .enumerate()
        .find(|(i, queue_family)| {
            let is_queue_supported = queue_family
                .queue_flags
                .contains(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE);
            let is_present_supported = match surface {
                Some((loader, surface)) => unsafe {
                    loader
                        .get_physical_device_surface_support(physical_device, *i as u32, surface)
                        .unwrap_or(false)
                },
                None => true,
            };
            is_queue_supported && is_present_supported
        })
        .map(|(i, _)| i as u32)?;

    Some(Candidate {
        physical_device,
        queue_family_index,
        discrete: properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU,
    })
}

/// Interfaceで使うdeviceを選択して作成する
///
/// Interfaceごとに一度だけ呼べる。`surface`を渡すと、そこへpresentできるqueueを持つdeviceを選ぶ。
/// 独立したGPUがあればそちらを優先する。
pub fn select_device(
    interface: &Ptr<Interface>,
    surface: Option<&Ptr<rhi::Surface>>,
) -> rhi::Result<()> {
    let vulkan = vulkan_interface(interface)?;
    if vulkan.device().is_some() {
        return Err(VulkanError::DeviceAlreadySelected.into());
    }
    let instance = vulkan.instance();

    // surfaceはこのInterfaceで作られたものでなければならない
    let surface = match surface {
        Some(surface) => {
            let surface = surface.downcast_ref::<VulkanSurface>()?;
            let is_own = surface
                .object()
                .parent()
                .is_some_and(|parent| Ptr::ptr_eq(parent, interface));
            let loader = vulkan.surface_loader().ok_or(VulkanError::ForeignSurface)?;
            if !is_own {
                return Err(VulkanError::ForeignSurface.into());
            }
            Some((loader, surface.surface()))
        }
        None => None,
    };

    // physical deviceの選択
    let wsi = vulkan.surface_loader().is_some();
    let physical_devices = unsafe { instance.enumerate_physical_devices() }.map_err(driver)?;
    let mut candidates = physical_devices
        .into_iter()
        .filter_map(|physical_device| {
            inspect_physical_device(instance, surface, wsi, physical_device)
        })
        .collect::<Vec<_>>();
    candidates.sort_by_key(|candidate| !candidate.discrete);
    let candidate = candidates
        .into_iter()
        .next()
        .ok_or(VulkanError::NoSuitableDevice)?;

    // deviceの作成
    let queue_priorities = [1.0_f32];
    let queue_create_infos = [vk::DeviceQueueCreateInfo::builder()
        .queue_family_index(candidate.queue_family_index)
        .queue_priorities(&queue_priorities)
        .build()];
    let mut features_12 = vk::PhysicalDeviceVulkan12Features::builder()
        .draw_indirect_count(true)
        .build();
    let mut features_13 = vk::PhysicalDeviceVulkan13Features::builder()
        .dynamic_rendering(true)
        .synchronization2(true)
        .build();
    let extension_names = if wsi {
        vec![khr::Swapchain::name().as_ptr()]
    } else {
        vec![]
    };
    let device_create_info = vk::DeviceCreateInfo::builder()
        .push_next(&mut features_12)
        .push_next(&mut features_13)
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names);
    let device = unsafe {
        instance.create_device(candidate.physical_device, &device_create_info, None)
    }
    .map_err(driver)?;
    let device_guard = {
        let device = device.clone();
        OnDrop::new(move || unsafe { device.destroy_device(None) })
    };

    // allocatorの作成
    let allocator = Allocator::new(&AllocatorCreateDesc {
        instance: instance.clone(),
        device: device.clone(),
        physical_device: candidate.physical_device,
        debug_settings: Default::default(),
        buffer_device_address: false,
        allocation_sizes: Default::default(),
    })
    .map_err(VulkanError::Allocation)?;

    let queue = unsafe { device.get_device_queue(candidate.queue_family_index, 0) };
    let swapchain_loader = wsi.then(|| khr::Swapchain::new(instance, &device));

    let properties = unsafe { instance.get_physical_device_properties(candidate.physical_device) };
    let name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) };

    device_guard.dismiss();
    vulkan.set_device(Device {
        physical_device: candidate.physical_device,
        device,
        queue_family_index: candidate.queue_family_index,
        queue,
        swapchain_loader,
        allocator: ManuallyDrop::new(Mutex::new(allocator)),
    })?;

    log::info!(
        "selected device {:?} (queue family {})",
        name,
        candidate.queue_family_index
    );
    Ok(())
}
