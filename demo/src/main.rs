//! rhiのVulkanバックエンドで一通りのリソースを作って破棄するデモ。
//!
//! `RUST_LOG=debug`で実行すると、リソースの作成と破棄の順番がログに出る。

use anyhow::{Context, Result};
use rhi::{
    AccessFlags, BarrierScope, BufferCreateInfo, BufferUsageFlags, CommandBufferCreateInfo,
    DescriptorSetCreateInfo, DescriptorSetLayoutBinding, DescriptorSetLayoutCreateInfo,
    DescriptorType, DispatchIndirectCommand, ImageCreateInfo, ImageFormat, ImageType,
    ImageUsageFlags, Interface, MemoryLocation, PipelineLayoutCreateInfo, PipelineStageFlags, Ptr,
    ShaderStageFlags,
};
use rhi_vulkan::{InterfaceCreateFlags, InterfaceCreateInfo, VulkanBuffer};

fn create_interface() -> Result<Ptr<Interface>> {
    let flags = if cfg!(feature = "validation") {
        InterfaceCreateFlags::DEBUG
    } else {
        InterfaceCreateFlags::empty()
    };
    let interface = rhi_vulkan::new_interface(&InterfaceCreateInfo {
        flags,
        application_name: c"rhi demo",
        ..Default::default()
    })
    .context("failed to create the Vulkan interface")?;
    rhi_vulkan::select_device(&interface, None).context("failed to select a device")?;
    Ok(interface)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let interface = create_interface()?;

    // descriptor set layoutとpipeline layout
    let bindings = [
        DescriptorSetLayoutBinding {
            index: 0,
            descriptor_type: DescriptorType::StorageBuffer,
            descriptor_count: 1,
            stage_flags: ShaderStageFlags::COMPUTE,
        },
        DescriptorSetLayoutBinding {
            index: 1,
            descriptor_type: DescriptorType::StorageImage,
            descriptor_count: 1,
            stage_flags: ShaderStageFlags::COMPUTE,
        },
    ];
    let set_layout = interface.new_descriptor_set_layout(&DescriptorSetLayoutCreateInfo {
        bindings: &bindings,
    })?;
    let descriptor_set = interface.new_descriptor_set(&DescriptorSetCreateInfo {
        layout: &set_layout,
    })?;
    let pipeline_layout = interface.new_pipeline_layout(&PipelineLayoutCreateInfo {
        descriptor_set_layouts: std::slice::from_ref(&set_layout),
    })?;
    log::info!(
        "pipeline layout uses {} descriptor set layouts",
        pipeline_layout.descriptor_set_layouts().len()
    );

    // indirect dispatchの引数をCPUから書き込む
    let arguments = interface.new_buffer(&BufferCreateInfo {
        size: std::mem::size_of::<DispatchIndirectCommand>() as u64,
        usage: BufferUsageFlags::ARGUMENT | BufferUsageFlags::STORAGE,
        location: MemoryLocation::CpuToGpu,
    })?;
    let command = DispatchIndirectCommand { x: 8, y: 8, z: 1 };
    arguments
        .downcast_ref::<VulkanBuffer>()?
        .write(0, std::slice::from_ref(&command))?;

    let image = interface.new_image(&ImageCreateInfo {
        image_type: ImageType::D2,
        format: ImageFormat::R16G16B16A16Sfloat,
        extent: glam::UVec3::new(512, 512, 1),
        mip_level_count: 1,
        array_layer_count: 1,
        usage: ImageUsageFlags::STORAGE | ImageUsageFlags::TRANSFER_SRC,
    })?;
    log::info!("created {:?} image of {}", image.format(), image.extent());

    // コマンドの記録
    // pipelineをbindしていないのでbarrierだけを記録する
    let command_buffer = interface.new_command_buffer(&CommandBufferCreateInfo {
        one_time_submit: true,
    })?;
    command_buffer.begin()?;
    command_buffer.cmd_barrier(
        BarrierScope::new(PipelineStageFlags::COPY, AccessFlags::TRANSFER_WRITE),
        BarrierScope::new(
            PipelineStageFlags::ARGUMENT_INPUT | PipelineStageFlags::COMPUTE_SHADER,
            AccessFlags::ARGUMENT_READ | AccessFlags::SHADER_STORAGE_READ,
        ),
    )?;
    command_buffer.end()?;
    log::info!("recorded a command buffer");

    // 作った順と逆に破棄する。Interfaceは最後のリソースと一緒に破棄される。
    drop(command_buffer);
    drop(image);
    drop(arguments);
    drop(pipeline_layout);
    drop(descriptor_set);
    drop(set_layout);
    log::info!(
        "released all resources, interface has {} reference",
        Ptr::ref_count(&interface)
    );
    drop(interface);

    Ok(())
}
