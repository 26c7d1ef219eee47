//! 実際のVulkanドライバを使うテスト。
//!
//! ドライバのない環境でも通るように、すべて`cargo test -- --ignored`で実行する。

use rhi::{
    AccessFlags, BarrierScope, BufferCreateInfo, BufferUsageFlags, CommandBufferCreateInfo,
    DescriptorSetCreateInfo, DescriptorSetLayoutBinding, DescriptorSetLayoutCreateInfo,
    DescriptorType, ImageCreateInfo, ImageFormat, ImageType, ImageUsageFlags, Interface, Kind,
    MemoryLocation, PipelineLayoutCreateInfo, PipelineStageFlags, Ptr, ShaderStageFlags,
};
use rhi_vulkan::{
    InterfaceCreateFlags, InterfaceCreateInfo, VulkanBuffer, VulkanCommandBuffer, VulkanError,
    VulkanImage, VulkanInterface, VALIDATION_LAYER,
};
use std::collections::HashSet;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn new_interface(flags: InterfaceCreateFlags) -> Ptr<Interface> {
    init_logger();
    rhi_vulkan::new_interface(&InterfaceCreateInfo {
        flags,
        application_name: c"rhi-vulkan tests",
        ..Default::default()
    })
    .unwrap()
}

fn new_device_interface() -> Ptr<Interface> {
    let interface = new_interface(InterfaceCreateFlags::empty());
    rhi_vulkan::select_device(&interface, None).unwrap();
    interface
}

fn storage_binding(index: u32) -> DescriptorSetLayoutBinding {
    DescriptorSetLayoutBinding {
        index,
        descriptor_type: DescriptorType::StorageBuffer,
        descriptor_count: 1,
        stage_flags: ShaderStageFlags::COMPUTE,
    }
}

#[test]
#[ignore = "requires a Vulkan driver"]
fn debug_interface_enables_validation_once() {
    let interface = new_interface(InterfaceCreateFlags::DEBUG);
    let vulkan = interface.downcast_ref::<VulkanInterface>().unwrap();

    let validation_layers = vulkan
        .enabled_layers()
        .iter()
        .filter(|layer| layer.as_c_str() == VALIDATION_LAYER)
        .count();
    assert_eq!(validation_layers, 1);

    let extensions = vulkan.enabled_extensions();
    let unique = extensions.iter().collect::<HashSet<_>>();
    assert_eq!(unique.len(), extensions.len());
}

#[test]
#[ignore = "requires a Vulkan driver"]
fn device_is_selected_only_once() {
    let interface = new_interface(InterfaceCreateFlags::empty());
    let vulkan = interface.downcast_ref::<VulkanInterface>().unwrap();
    assert!(vulkan.device().is_none());

    rhi_vulkan::select_device(&interface, None).unwrap();
    assert!(vulkan.device().is_some());

    let error = rhi_vulkan::select_device(&interface, None).unwrap_err();
    assert_eq!(
        error.to_string(),
        VulkanError::DeviceAlreadySelected.to_string()
    );
}

#[test]
#[ignore = "requires a Vulkan driver"]
fn resources_need_a_selected_device() {
    let interface = new_interface(InterfaceCreateFlags::empty());
    let error = interface
        .new_descriptor_set_layout(&DescriptorSetLayoutCreateInfo::default())
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        VulkanError::DeviceNotSelected.to_string()
    );
}

#[test]
#[ignore = "requires a Vulkan driver"]
fn layouts_hold_their_set_layouts() {
    let interface = new_device_interface();

    let bindings = [storage_binding(0), storage_binding(1)];
    let set_layout = interface
        .new_descriptor_set_layout(&DescriptorSetLayoutCreateInfo {
            bindings: &bindings,
        })
        .unwrap();
    assert_eq!(set_layout.bindings(), &bindings);

    let set = interface
        .new_descriptor_set(&DescriptorSetCreateInfo {
            layout: &set_layout,
        })
        .unwrap();
    assert!(Ptr::ptr_eq(set.layout(), &set_layout));

    let set_layouts = [set_layout.clone()];
    let pipeline_layout = interface
        .new_pipeline_layout(&PipelineLayoutCreateInfo {
            descriptor_set_layouts: &set_layouts,
        })
        .unwrap();
    drop(set_layouts);
    // set、pipeline layout、手元の参照
    assert_eq!(Ptr::ref_count(&set_layout), 3);

    drop(set);
    drop(pipeline_layout);
    assert_eq!(Ptr::ref_count(&set_layout), 1);
}

#[test]
#[ignore = "requires a Vulkan driver"]
fn host_visible_buffer_round_trips_data() {
    let interface = new_device_interface();
    let buffer = interface
        .new_buffer(&BufferCreateInfo {
            size: 64,
            usage: BufferUsageFlags::STORAGE,
            location: MemoryLocation::CpuToGpu,
        })
        .unwrap();
    let vulkan_buffer = buffer.downcast_ref::<VulkanBuffer>().unwrap();

    let data = [1_u32, 2, 3, 4];
    vulkan_buffer.write(16, &data).unwrap();
    let mut read_back = [0_u32; 4];
    vulkan_buffer.read(16, &mut read_back).unwrap();
    assert_eq!(read_back, data);

    let error = vulkan_buffer.write(60, &data).unwrap_err();
    assert!(error.to_string().contains("out of a buffer of 64 bytes"));
}

#[test]
#[ignore = "requires a Vulkan driver"]
fn device_local_buffer_is_not_mapped() {
    let interface = new_device_interface();
    let buffer = interface
        .new_buffer(&BufferCreateInfo {
            size: 256,
            usage: BufferUsageFlags::STORAGE | BufferUsageFlags::ARGUMENT,
            location: MemoryLocation::GpuOnly,
        })
        .unwrap();
    assert_eq!(buffer.size(), 256);

    let vulkan_buffer = buffer.downcast_ref::<VulkanBuffer>().unwrap();
    let error = vulkan_buffer.write(0, &[0_u32]).unwrap_err();
    assert_eq!(error.to_string(), VulkanError::NotHostVisible.to_string());
}

#[test]
#[ignore = "requires a Vulkan driver"]
fn sampled_image_gets_a_view() {
    let interface = new_device_interface();
    let create_info = ImageCreateInfo {
        image_type: ImageType::D2,
        format: ImageFormat::R8G8B8A8Unorm,
        extent: glam::UVec3::new(64, 64, 1),
        mip_level_count: 1,
        array_layer_count: 1,
        usage: ImageUsageFlags::SAMPLED | ImageUsageFlags::TRANSFER_DST,
    };
    let image = interface.new_image(&create_info).unwrap();
    assert_eq!(image.format(), ImageFormat::R8G8B8A8Unorm);

    let vulkan_image = image.downcast_ref::<VulkanImage>().unwrap();
    assert!(unsafe { vulkan_image.image_view_raw() }.is_some());

    let staging = interface
        .new_image(&ImageCreateInfo {
            usage: ImageUsageFlags::TRANSFER_SRC,
            ..create_info
        })
        .unwrap();
    let vulkan_staging = staging.downcast_ref::<VulkanImage>().unwrap();
    assert!(unsafe { vulkan_staging.image_view_raw() }.is_none());
}

#[test]
#[ignore = "requires a Vulkan driver"]
fn command_buffer_retains_recorded_resources() {
    let interface = new_device_interface();
    let command_buffer = interface
        .new_command_buffer(&CommandBufferCreateInfo {
            one_time_submit: true,
        })
        .unwrap();
    let arguments = interface
        .new_buffer(&BufferCreateInfo {
            size: 12,
            usage: BufferUsageFlags::ARGUMENT,
            location: MemoryLocation::GpuOnly,
        })
        .unwrap();

    // 記録を開始していなければ記録できない
    assert!(command_buffer.cmd_dispatch(&arguments, 0).is_err());

    command_buffer.begin().unwrap();
    command_buffer
        .cmd_barrier(
            BarrierScope::new(
                PipelineStageFlags::COMPUTE_SHADER,
                AccessFlags::SHADER_STORAGE_WRITE,
            ),
            BarrierScope::new(PipelineStageFlags::ARGUMENT_INPUT, AccessFlags::ARGUMENT_READ),
        )
        .unwrap();
    command_buffer.cmd_dispatch(&arguments, 0).unwrap();
    command_buffer.end().unwrap();

    let vulkan = command_buffer
        .downcast_ref::<VulkanCommandBuffer>()
        .unwrap();
    assert!(!vulkan.is_recording());
    assert_eq!(vulkan.retained_count(), 1);
    assert_eq!(Ptr::ref_count(&arguments), 2);

    // 記録をやり直すと前回のリソースは解放される
    command_buffer.begin().unwrap();
    assert_eq!(vulkan.retained_count(), 0);
    assert_eq!(Ptr::ref_count(&arguments), 1);
    command_buffer.end().unwrap();
}

#[test]
#[ignore = "requires a Vulkan driver"]
fn descriptor_sets_need_a_bound_pipeline() {
    let interface = new_device_interface();
    let bindings = [storage_binding(0)];
    let set_layout = interface
        .new_descriptor_set_layout(&DescriptorSetLayoutCreateInfo {
            bindings: &bindings,
        })
        .unwrap();
    let set = interface
        .new_descriptor_set(&DescriptorSetCreateInfo {
            layout: &set_layout,
        })
        .unwrap();
    let command_buffer = interface
        .new_command_buffer(&CommandBufferCreateInfo::default())
        .unwrap();

    command_buffer.begin().unwrap();
    let error = command_buffer.cmd_bind_descriptor_set(0, &set).unwrap_err();
    assert_eq!(error.to_string(), VulkanError::NoPipelineBound.to_string());
    command_buffer.end().unwrap();
}

#[test]
#[ignore = "requires a Vulkan driver"]
fn interface_outlives_its_resources() {
    let interface = new_device_interface();
    let buffer = interface
        .new_buffer(&BufferCreateInfo {
            size: 16,
            usage: BufferUsageFlags::UNIFORM,
            location: MemoryLocation::CpuToGpu,
        })
        .unwrap();

    let parent = buffer.object().parent().unwrap().clone();
    drop(interface);
    // bufferがまだInterfaceを参照している
    assert_eq!(Ptr::ref_count(&parent), 2);

    drop(buffer);
    assert_eq!(Ptr::ref_count(&parent), 1);
}

#[test]
#[ignore = "requires a Vulkan driver"]
fn resources_of_another_interface_are_rejected() {
    let owner = new_device_interface();
    let other = new_device_interface();

    let bindings = [storage_binding(0)];
    let set_layout = owner
        .new_descriptor_set_layout(&DescriptorSetLayoutCreateInfo {
            bindings: &bindings,
        })
        .unwrap();
    let foreign = "was created by another interface";

    let error = other
        .new_pipeline_layout(&PipelineLayoutCreateInfo {
            descriptor_set_layouts: std::slice::from_ref(&set_layout),
        })
        .unwrap_err();
    assert!(error.to_string().contains(foreign));

    let error = other
        .new_descriptor_set(&DescriptorSetCreateInfo {
            layout: &set_layout,
        })
        .unwrap_err();
    assert!(error.to_string().contains(foreign));

    let arguments = owner
        .new_buffer(&BufferCreateInfo {
            size: 12,
            usage: BufferUsageFlags::ARGUMENT,
            location: MemoryLocation::GpuOnly,
        })
        .unwrap();
    let command_buffer = other
        .new_command_buffer(&CommandBufferCreateInfo::default())
        .unwrap();
    command_buffer.begin().unwrap();
    let error = command_buffer.cmd_dispatch(&arguments, 0).unwrap_err();
    assert!(error.to_string().contains(foreign));
    command_buffer.end().unwrap();

    // 拒否されたリソースは保持されない
    let vulkan = command_buffer
        .downcast_ref::<VulkanCommandBuffer>()
        .unwrap();
    assert_eq!(vulkan.retained_count(), 0);
    assert_eq!(Ptr::ref_count(&arguments), 1);
    assert_eq!(Ptr::ref_count(&set_layout), 1);
}
