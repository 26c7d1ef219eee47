//! Vulkanのinstanceを保持するInterfaceを定義する。
//!
//! InterfaceはVulkanのinstanceとdebug utils、選択したdeviceを所有する。
//! リソースはすべてこのInterfaceを親に持つので、
//! Interfaceが破棄されるのは最後のリソースが破棄された後になる。

use crate::{error::driver, guard::OnDrop, kinds, loader, Device, VulkanError};
use ash::{
    extensions::{ext::DebugUtils, khr},
    vk,
};
use bitflags::bitflags;
use rhi::{Interface, InterfaceDispatch, Kind, Ptr};
use std::{
    ffi::{c_char, CStr, CString},
    fmt::Debug,
    sync::OnceLock,
};

/// debugを有効にしたときに追加するvalidation layer
pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

bitflags! {
    /// Interfaceで有効にする機能
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InterfaceCreateFlags: u32 {
        /// validation layerとdebug utilsを有効にする
        const DEBUG = 0x1;
        /// surfaceとswapchainを使えるようにする
        const WSI = 0x2;
    }
}

/// Interfaceのcreate info
#[derive(Clone, Copy)]
pub struct InterfaceCreateInfo<'a> {
    /// 有効にする機能
    pub flags: InterfaceCreateFlags,
    /// アプリケーション名
    pub application_name: &'a CStr,
    /// ウィンドウシステムが要求するinstance拡張。`WSI`を指定したときだけ使われる。
    pub wsi_extensions: &'a [&'a CStr],
    /// Interfaceとそのリソースのストレージを確保するアロケータ
    pub host_allocator: &'static dyn rhi::Allocator,
}
impl Default for InterfaceCreateInfo<'_> {
    fn default() -> Self {
        Self {
            flags: InterfaceCreateFlags::empty(),
            application_name: c"rhi",
            wsi_extensions: &[],
            host_allocator: &rhi::SYSTEM_ALLOCATOR,
        }
    }
}
impl Debug for InterfaceCreateInfo<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterfaceCreateInfo")
            .field("flags", &self.flags)
            .field("application_name", &self.application_name)
            .field("wsi_extensions", &self.wsi_extensions)
            .finish_non_exhaustive()
    }
}

/// 有効にするinstance layerのリスト
pub(crate) fn required_layers(flags: InterfaceCreateFlags) -> Vec<&'static CStr> {
    let mut layers = vec![];
    if flags.contains(InterfaceCreateFlags::DEBUG) {
        layers.push(VALIDATION_LAYER);
    }
    layers
}

/// 有効にするinstance拡張のリスト
///
/// バックエンドが追加する拡張と重複する呼び出し側の拡張は一つにまとめる。
pub(crate) fn required_extensions<'a>(
    flags: InterfaceCreateFlags,
    wsi_extensions: &[&'a CStr],
) -> Vec<&'a CStr> {
    let mut extensions: Vec<&'a CStr> = vec![];
    if flags.contains(InterfaceCreateFlags::DEBUG) {
        extensions.push(DebugUtils::name());
    }
    if flags.contains(InterfaceCreateFlags::WSI) {
        extensions.push(khr::Surface::name());
        for &extension in wsi_extensions {
            if !extensions.contains(&extension) {
                extensions.push(extension);
            }
        }
    } else if !wsi_extensions.is_empty() {
        log::warn!("WSI extensions were given without the WSI flag and are ignored");
    }
    extensions
}

// debug utilsのコールバック関数
unsafe extern "system" fn vulkan_debug_utils_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_types: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*p_callback_data).p_message).to_string_lossy();
    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            log::error!(target: "vulkan", "{:?} {}", message_types, message)
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            log::warn!(target: "vulkan", "{:?} {}", message_types, message)
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => {
            log::info!(target: "vulkan", "{:?} {}", message_types, message)
        }
        _ => log::trace!(target: "vulkan", "{:?} {}", message_types, message),
    }

    vk::FALSE
}

fn debug_utils_messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT {
    vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
        )
        .pfn_user_callback(Some(vulkan_debug_utils_callback))
        .build()
}

struct DebugMessenger {
    loader: DebugUtils,
    messenger: vk::DebugUtilsMessengerEXT,
}

/// VulkanのInterface
#[repr(C)]
pub struct VulkanInterface {
    base: Interface,
    instance: ash::Instance,
    debug_messenger: Option<DebugMessenger>,
    surface_loader: Option<khr::Surface>,
    enabled_layers: Vec<CString>,
    enabled_extensions: Vec<CString>,
    device: OnceLock<Device>,
}
rhi::impl_kind!(VulkanInterface { base: Interface } => rhi::Object);

impl VulkanInterface {
    /// 有効にしたinstance layer
    pub fn enabled_layers(&self) -> &[CString] {
        &self.enabled_layers
    }

    /// 有効にしたinstance拡張
    pub fn enabled_extensions(&self) -> &[CString] {
        &self.enabled_extensions
    }

    /// 選択したdevice
    pub fn device(&self) -> Option<&Device> {
        self.device.get()
    }

    /// ash::Instanceを取得する
    /// ## Safety
    /// 参照カウントの管理から中身を取り出すので注意。
    /// Interfaceが破棄されると、この関数で取り出したash::Instanceは無効になる。
    pub unsafe fn instance_raw(&self) -> ash::Instance {
        self.instance.clone()
    }

    pub(crate) fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    pub(crate) fn surface_loader(&self) -> Option<&khr::Surface> {
        self.surface_loader.as_ref()
    }

    pub(crate) fn selected_device(&self) -> Result<&Device, VulkanError> {
        self.device.get().ok_or(VulkanError::DeviceNotSelected)
    }

    pub(crate) fn set_device(&self, device: Device) -> Result<(), VulkanError> {
        // 失敗した場合は渡したdeviceがここで破棄される
        self.device
            .set(device)
            .map_err(|_| VulkanError::DeviceAlreadySelected)
    }
}

impl Drop for VulkanInterface {
    fn drop(&mut self) {
        // deviceはinstanceより先に破棄する
        drop(self.device.take());
        unsafe {
            if let Some(debug_messenger) = &self.debug_messenger {
                debug_messenger
                    .loader
                    .destroy_debug_utils_messenger(debug_messenger.messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        log::info!("destroyed Vulkan interface");
    }
}

impl Debug for VulkanInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanInterface")
            .field("object", self.object())
            .field("enabled_layers", &self.enabled_layers)
            .field("enabled_extensions", &self.enabled_extensions)
            .field("device_selected", &self.device.get().is_some())
            .finish()
    }
}

/// Vulkanのinstanceを作成し、それを保持するInterfaceを返す
pub fn new_interface(create_info: &InterfaceCreateInfo) -> rhi::Result<Ptr<Interface>> {
    let entry = loader::entry()?;
    let debug = create_info.flags.contains(InterfaceCreateFlags::DEBUG);

    let layers = required_layers(create_info.flags);
    let extensions = required_extensions(create_info.flags, create_info.wsi_extensions);
    let layer_names = layers.iter().map(|l| l.as_ptr()).collect::<Vec<*const c_char>>();
    let extension_names = extensions
        .iter()
        .map(|e| e.as_ptr())
        .collect::<Vec<*const c_char>>();

    // instanceの作成
    let app_info = vk::ApplicationInfo::builder()
        .application_name(create_info.application_name)
        .application_version(vk::make_api_version(0, 0, 1, 0))
        .engine_name(c"rhi")
        .api_version(vk::API_VERSION_1_3);
    let mut messenger_create_info = debug_utils_messenger_create_info();
    let instance_create_info = vk::InstanceCreateInfo::builder()
        .application_info(&app_info)
        .enabled_layer_names(&layer_names)
        .enabled_extension_names(&extension_names);
    // instanceの作成と破棄のメッセージも拾う
    let instance_create_info = if debug {
        instance_create_info.push_next(&mut messenger_create_info)
    } else {
        instance_create_info
    };
    let instance = unsafe { entry.create_instance(&instance_create_info, None) }.map_err(driver)?;
    let instance_guard = {
        let instance = instance.clone();
        OnDrop::new(move || unsafe { instance.destroy_instance(None) })
    };

    // debug utilsの設定
    let debug_messenger = if debug {
        let loader = DebugUtils::new(entry, &instance);
        let messenger = unsafe {
            loader.create_debug_utils_messenger(&debug_utils_messenger_create_info(), None)
        }
        .map_err(driver)?;
        Some(DebugMessenger { loader, messenger })
    } else {
        None
    };
    let messenger_guard = {
        let debug_messenger = debug_messenger
            .as_ref()
            .map(|d| (d.loader.clone(), d.messenger));
        OnDrop::new(move || {
            if let Some((loader, messenger)) = debug_messenger {
                unsafe { loader.destroy_debug_utils_messenger(messenger, None) }
            }
        })
    };

    let surface_loader = create_info
        .flags
        .contains(InterfaceCreateFlags::WSI)
        .then(|| khr::Surface::new(entry, &instance));

    let interface = rhi::new_object(None, create_info.host_allocator, |object| {
        VulkanInterface {
            base: Interface::new(object, &VULKAN_DISPATCH),
            instance,
            debug_messenger,
            surface_loader,
            enabled_layers: layers.iter().map(|&l| l.to_owned()).collect(),
            enabled_extensions: extensions.iter().map(|&e| e.to_owned()).collect(),
            device: OnceLock::new(),
        }
    })?;
    messenger_guard.dismiss();
    instance_guard.dismiss();

    log::info!(
        "created Vulkan interface (layers: {:?}, extensions: {:?})",
        interface.enabled_layers,
        interface.enabled_extensions
    );
    Ok(interface.upcast())
}

/// `Ptr<Interface>`をVulkanのInterfaceとして借用する
pub(crate) fn vulkan_interface(interface: &Ptr<Interface>) -> rhi::Result<&VulkanInterface> {
    Ok(interface.downcast_ref::<VulkanInterface>()?)
}

/// リソースを作ったInterfaceのdeviceを取得する
///
/// Vulkanのリソースは必ずdeviceを選択したVulkanInterfaceを親に持つ。
pub(crate) fn owning_device(object: &rhi::Object) -> &Device {
    object
        .parent()
        .and_then(|parent| parent.downcast_ref::<VulkanInterface>().ok())
        .and_then(|interface| interface.device())
        .expect("Vulkan resources are owned by an interface with a selected device")
}

/// `resource`が`interface`で作られたリソースかを確認する
///
/// 別のInterfaceのリソースのハンドルは別のdeviceのものなので、このInterfaceのdeviceには渡せない。
pub(crate) fn ensure_owned(
    resource: &rhi::Object,
    interface: &rhi::Object,
) -> Result<(), VulkanError> {
    let is_own = resource
        .parent()
        .is_some_and(|parent| std::ptr::eq(parent.object(), interface));
    if is_own {
        Ok(())
    } else {
        Err(VulkanError::ForeignResource {
            kind: resource.kind().name(),
        })
    }
}

struct VulkanDispatch;

static VULKAN_DISPATCH: VulkanDispatch = VulkanDispatch;

impl InterfaceDispatch for VulkanDispatch {
    fn new_descriptor_set_layout(
        &self,
        interface: &Ptr<Interface>,
        create_info: &rhi::DescriptorSetLayoutCreateInfo,
    ) -> rhi::Result<Ptr<rhi::DescriptorSetLayout>> {
        kinds::new_descriptor_set_layout(interface, create_info)
    }

    fn new_descriptor_set(
        &self,
        interface: &Ptr<Interface>,
        create_info: &rhi::DescriptorSetCreateInfo,
    ) -> rhi::Result<Ptr<rhi::DescriptorSet>> {
        kinds::new_descriptor_set(interface, create_info)
    }

    fn new_pipeline_layout(
        &self,
        interface: &Ptr<Interface>,
        create_info: &rhi::PipelineLayoutCreateInfo,
    ) -> rhi::Result<Ptr<rhi::PipelineLayout>> {
        kinds::new_pipeline_layout(interface, create_info)
    }

    fn new_compute_pipeline(
        &self,
        interface: &Ptr<Interface>,
        create_info: &rhi::ComputePipelineCreateInfo,
    ) -> rhi::Result<Ptr<rhi::ComputePipeline>> {
        kinds::new_compute_pipeline(interface, create_info)
    }

    fn new_graphics_pipeline(
        &self,
        interface: &Ptr<Interface>,
        create_info: &rhi::GraphicsPipelineCreateInfo,
    ) -> rhi::Result<Ptr<rhi::GraphicsPipeline>> {
        kinds::new_graphics_pipeline(interface, create_info)
    }

    fn new_buffer(
        &self,
        interface: &Ptr<Interface>,
        create_info: &rhi::BufferCreateInfo,
    ) -> rhi::Result<Ptr<rhi::Buffer>> {
        kinds::new_buffer(interface, create_info)
    }

    fn new_image(
        &self,
        interface: &Ptr<Interface>,
        create_info: &rhi::ImageCreateInfo,
    ) -> rhi::Result<Ptr<rhi::Image>> {
        kinds::new_image(interface, create_info)
    }

    fn new_swapchain(
        &self,
        interface: &Ptr<Interface>,
        create_info: &rhi::SwapchainCreateInfo,
    ) -> rhi::Result<Ptr<rhi::Swapchain>> {
        kinds::new_swapchain(interface, create_info)
    }

    fn new_command_buffer(
        &self,
        interface: &Ptr<Interface>,
        create_info: &rhi::CommandBufferCreateInfo,
    ) -> rhi::Result<Ptr<rhi::CommandBuffer>> {
        kinds::new_command_buffer(interface, create_info)
    }
}
