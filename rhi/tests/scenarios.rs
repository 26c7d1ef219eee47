mod common;

use common::{new_interface, CountingAllocator};
use rhi::{
    BufferCreateInfo, BufferUsageFlags, CommandBufferCreateInfo, DescriptorSetLayoutBinding,
    DescriptorSetLayoutCreateInfo, DescriptorType, Error, ImageCreateInfo, ImageFormat, ImageType,
    ImageUsageFlags, MemoryLocation, PipelineLayoutCreateInfo, Ptr, ResourceKind,
    ShaderStageFlags,
};

#[test]
fn empty_descriptor_set_layout_releases_cleanly() {
    let allocator = CountingAllocator::unlimited();
    let (interface, counters) = new_interface(allocator).unwrap();

    let layout = interface
        .new_descriptor_set_layout(&DescriptorSetLayoutCreateInfo { bindings: &[] })
        .unwrap();
    assert!(layout.bindings().is_empty());
    assert_eq!(Ptr::ref_count(&interface), 2);

    drop(layout);
    assert_eq!(counters.deleted("descriptor_set_layout"), 1);
    assert_eq!(counters.deleted("interface"), 0);
    assert_eq!(Ptr::ref_count(&interface), 1);
}

#[test]
fn descriptor_set_layout_copies_its_bindings() {
    let (interface, _counters) = new_interface(CountingAllocator::unlimited()).unwrap();
    let bindings = [
        DescriptorSetLayoutBinding {
            index: 0,
            descriptor_type: DescriptorType::UniformBuffer,
            descriptor_count: 1,
            stage_flags: ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT,
        },
        DescriptorSetLayoutBinding {
            index: 1,
            descriptor_type: DescriptorType::StorageImage,
            descriptor_count: 4,
            stage_flags: ShaderStageFlags::COMPUTE,
        },
    ];
    let layout = interface
        .new_descriptor_set_layout(&DescriptorSetLayoutCreateInfo {
            bindings: &bindings,
        })
        .unwrap();
    assert_eq!(layout.bindings(), &bindings);
}

#[test]
fn pipeline_layout_holds_its_set_layouts() {
    let allocator = CountingAllocator::unlimited();
    let (interface, counters) = new_interface(allocator).unwrap();
    let set_layouts = [
        interface
            .new_descriptor_set_layout(&DescriptorSetLayoutCreateInfo::default())
            .unwrap(),
        interface
            .new_descriptor_set_layout(&DescriptorSetLayoutCreateInfo::default())
            .unwrap(),
    ];

    let pipeline_layout = interface
        .new_pipeline_layout(&PipelineLayoutCreateInfo {
            descriptor_set_layouts: &set_layouts,
        })
        .unwrap();
    for set_layout in &set_layouts {
        assert_eq!(Ptr::ref_count(set_layout), 2);
    }
    assert_eq!(pipeline_layout.descriptor_set_layouts(), &set_layouts);

    drop(set_layouts);
    assert_eq!(counters.deleted("descriptor_set_layout"), 0);

    drop(pipeline_layout);
    assert_eq!(counters.deleted("pipeline_layout"), 1);
    assert_eq!(counters.deleted("descriptor_set_layout"), 2);

    drop(interface);
    assert_eq!(counters.deleted("interface"), 1);
    assert_eq!(allocator.live(), 0);
}

#[test]
fn unimplemented_entry_points_allocate_nothing() {
    let allocator = CountingAllocator::unlimited();
    let (interface, _counters) = new_interface(allocator).unwrap();
    let before = allocator.allocations();

    let buffer = interface.new_buffer(&BufferCreateInfo {
        size: 256,
        usage: BufferUsageFlags::STORAGE,
        location: MemoryLocation::GpuOnly,
    });
    assert!(matches!(
        buffer,
        Err(Error::Unsupported(ResourceKind::Buffer))
    ));

    let image = interface.new_image(&ImageCreateInfo {
        image_type: ImageType::D2,
        format: ImageFormat::R8G8B8A8Unorm,
        extent: glam::UVec3::new(64, 64, 1),
        mip_level_count: 1,
        array_layer_count: 1,
        usage: ImageUsageFlags::STORAGE,
    });
    assert!(matches!(image, Err(Error::Unsupported(ResourceKind::Image))));

    let command_buffer = interface.new_command_buffer(&CommandBufferCreateInfo::default());
    assert!(command_buffer.unwrap_err().is_unsupported());

    assert_eq!(allocator.allocations(), before);
    assert_eq!(Ptr::ref_count(&interface), 1);
}

#[test]
fn allocator_exhaustion_releases_the_parent() {
    // Interfaceの分だけ確保できる
    let allocator = CountingAllocator::leak(1);
    let (interface, counters) = new_interface(allocator).unwrap();

    let result = interface.new_descriptor_set_layout(&DescriptorSetLayoutCreateInfo::default());
    assert!(matches!(result, Err(Error::OutOfHostMemory { .. })));
    assert_eq!(Ptr::ref_count(&interface), 1);
    assert_eq!(counters.deleted("descriptor_set_layout"), 0);

    drop(interface);
    assert_eq!(counters.deleted("interface"), 1);
    assert_eq!(allocator.live(), 0);
}

#[test]
fn interface_creation_fails_without_storage() {
    let allocator = CountingAllocator::leak(0);
    let result = new_interface(allocator);
    assert!(matches!(result, Err(Error::OutOfHostMemory { .. })));
    assert_eq!(allocator.allocations(), 0);
}
