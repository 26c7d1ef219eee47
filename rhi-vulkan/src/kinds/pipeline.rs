use super::descriptor::VulkanDescriptorSetLayout;
use crate::{
    convert,
    error::driver,
    guard::OnDrop,
    interface::{ensure_owned, owning_device, vulkan_interface},
};
use ash::vk;
use rhi::{
    ComputePipelineCreateInfo, GraphicsPipelineCreateInfo, Interface, Kind,
    PipelineLayoutCreateInfo, Ptr, ShaderStage,
};
use std::fmt::Debug;

/// VulkanのPipelineLayout
#[repr(C)]
pub struct VulkanPipelineLayout {
    base: rhi::PipelineLayout,
    layout: vk::PipelineLayout,
}
rhi::impl_kind!(VulkanPipelineLayout { base: rhi::PipelineLayout } => rhi::Object);

impl VulkanPipelineLayout {
    /// vk::PipelineLayoutを取得する
    /// ## Safety
    /// 参照カウントの管理から中身を取り出すので注意。
    /// PipelineLayoutが破棄されると、この関数で取り出したvk::PipelineLayoutは無効になる。
    pub unsafe fn pipeline_layout_raw(&self) -> vk::PipelineLayout {
        self.layout
    }

    pub(crate) fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for VulkanPipelineLayout {
    fn drop(&mut self) {
        let device = owning_device(self.object());
        unsafe { device.raw().destroy_pipeline_layout(self.layout, None) };
        log::debug!("destroyed pipeline layout {:?}", self.layout);
    }
}

impl Debug for VulkanPipelineLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanPipelineLayout")
            .field("object", self.object())
            .field("layout", &self.layout)
            .finish()
    }
}

pub(crate) fn new_pipeline_layout(
    interface: &Ptr<Interface>,
    create_info: &PipelineLayoutCreateInfo,
) -> rhi::Result<Ptr<rhi::PipelineLayout>> {
    let device = vulkan_interface(interface)?.selected_device()?;

    let set_layouts = create_info
        .descriptor_set_layouts
        .iter()
        .map(|layout| {
            ensure_owned(layout.object(), interface.object())?;
            Ok(layout.downcast_ref::<VulkanDescriptorSetLayout>()?.layout())
        })
        .collect::<rhi::Result<Vec<_>>>()?;
    let layout_create_info = vk::PipelineLayoutCreateInfo::builder().set_layouts(&set_layouts);
    let layout = unsafe { device.raw().create_pipeline_layout(&layout_create_info, None) }
        .map_err(driver)?;
    let layout_guard = {
        let device = device.raw().clone();
        OnDrop::new(move || unsafe { device.destroy_pipeline_layout(layout, None) })
    };

    let pipeline_layout = rhi::new_object(
        Some(interface.clone().upcast()),
        interface.object().allocator(),
        |object| VulkanPipelineLayout {
            base: rhi::PipelineLayout::new(object, create_info),
            layout,
        },
    )?;
    layout_guard.dismiss();

    log::debug!(
        "created pipeline layout {:?} with {} descriptor set layouts",
        layout,
        set_layouts.len()
    );
    Ok(pipeline_layout.upcast())
}

/// SPIR-Vからshader moduleを作成するヘルパー関数
///
/// shader moduleはpipelineの作成が終われば不要なので、返すガードで必ず破棄する。
fn create_shader_module(
    device: &ash::Device,
    code: &[u32],
) -> rhi::Result<(vk::ShaderModule, OnDrop<impl FnOnce()>)> {
    let create_info = vk::ShaderModuleCreateInfo::builder().code(code);
    let module = unsafe { device.create_shader_module(&create_info, None) }.map_err(driver)?;
    let guard = {
        let device = device.clone();
        OnDrop::new(move || unsafe { device.destroy_shader_module(module, None) })
    };
    Ok((module, guard))
}

fn shader_stage_create_info(
    stage: vk::ShaderStageFlags,
    module: vk::ShaderModule,
    shader: &ShaderStage,
) -> vk::PipelineShaderStageCreateInfo {
    vk::PipelineShaderStageCreateInfo::builder()
        .stage(stage)
        .module(module)
        .name(shader.entry_point)
        .build()
}

/// VulkanのComputePipeline
#[repr(C)]
pub struct VulkanComputePipeline {
    base: rhi::ComputePipeline,
    pipeline: vk::Pipeline,
}
rhi::impl_kind!(VulkanComputePipeline { base: rhi::ComputePipeline } => rhi::Object);

impl VulkanComputePipeline {
    /// vk::Pipelineを取得する
    /// ## Safety
    /// 参照カウントの管理から中身を取り出すので注意。
    /// ComputePipelineが破棄されると、この関数で取り出したvk::Pipelineは無効になる。
    pub unsafe fn pipeline_raw(&self) -> vk::Pipeline {
        self.pipeline
    }

    pub(crate) fn pipeline(&self) -> vk::Pipeline {
        self.pipeline
    }

    pub(crate) fn layout(&self) -> vk::PipelineLayout {
        pipeline_layout(self.base.layout())
    }
}

impl Drop for VulkanComputePipeline {
    fn drop(&mut self) {
        let device = owning_device(self.object());
        unsafe { device.raw().destroy_pipeline(self.pipeline, None) };
        log::debug!("destroyed compute pipeline {:?}", self.pipeline);
    }
}

impl Debug for VulkanComputePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanComputePipeline")
            .field("object", self.object())
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

// pipelineが保持しているlayoutは作成時にVulkanPipelineLayoutであることを確認している
fn pipeline_layout(layout: &Ptr<rhi::PipelineLayout>) -> vk::PipelineLayout {
    layout
        .downcast_ref::<VulkanPipelineLayout>()
        .map(VulkanPipelineLayout::layout)
        .expect("pipelines only hold Vulkan pipeline layouts")
}

pub(crate) fn new_compute_pipeline(
    interface: &Ptr<Interface>,
    create_info: &ComputePipelineCreateInfo,
) -> rhi::Result<Ptr<rhi::ComputePipeline>> {
    let device = vulkan_interface(interface)?.selected_device()?;
    ensure_owned(create_info.layout.object(), interface.object())?;
    let layout = create_info
        .layout
        .downcast_ref::<VulkanPipelineLayout>()?
        .layout();

    let (module, _module_guard) = create_shader_module(device.raw(), create_info.shader.code)?;
    let stage =
        shader_stage_create_info(vk::ShaderStageFlags::COMPUTE, module, &create_info.shader);
    let pipeline_create_info = vk::ComputePipelineCreateInfo::builder()
        .stage(stage)
        .layout(layout)
        .build();
    let pipeline = unsafe {
        device.raw().create_compute_pipelines(
            vk::PipelineCache::null(),
            &[pipeline_create_info],
            None,
        )
    }
    .map_err(|(_, result)| driver(result))?[0];
    let pipeline_guard = {
        let device = device.raw().clone();
        OnDrop::new(move || unsafe { device.destroy_pipeline(pipeline, None) })
    };

    let compute_pipeline = rhi::new_object(
        Some(interface.clone().upcast()),
        interface.object().allocator(),
        |object| VulkanComputePipeline {
            base: rhi::ComputePipeline::new(object, create_info),
            pipeline,
        },
    )?;
    pipeline_guard.dismiss();

    log::debug!("created compute pipeline {:?}", pipeline);
    Ok(compute_pipeline.upcast())
}

/// VulkanのGraphicsPipeline
///
/// dynamic renderingで描画する。viewportとscissorは動的に設定する。
#[repr(C)]
pub struct VulkanGraphicsPipeline {
    base: rhi::GraphicsPipeline,
    pipeline: vk::Pipeline,
}
rhi::impl_kind!(VulkanGraphicsPipeline { base: rhi::GraphicsPipeline } => rhi::Object);

impl VulkanGraphicsPipeline {
    /// vk::Pipelineを取得する
    /// ## Safety
    /// 参照カウントの管理から中身を取り出すので注意。
    /// GraphicsPipelineが破棄されると、この関数で取り出したvk::Pipelineは無効になる。
    pub unsafe fn pipeline_raw(&self) -> vk::Pipeline {
        self.pipeline
    }

    pub(crate) fn pipeline(&self) -> vk::Pipeline {
        self.pipeline
    }

    pub(crate) fn layout(&self) -> vk::PipelineLayout {
        pipeline_layout(self.base.layout())
    }
}

impl Drop for VulkanGraphicsPipeline {
    fn drop(&mut self) {
        let device = owning_device(self.object());
        unsafe { device.raw().destroy_pipeline(self.pipeline, None) };
        log::debug!("destroyed graphics pipeline {:?}", self.pipeline);
    }
}

impl Debug for VulkanGraphicsPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanGraphicsPipeline")
            .field("object", self.object())
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

pub(crate) fn new_graphics_pipeline(
    interface: &Ptr<Interface>,
    create_info: &GraphicsPipelineCreateInfo,
) -> rhi::Result<Ptr<rhi::GraphicsPipeline>> {
    let device = vulkan_interface(interface)?.selected_device()?;
    ensure_owned(create_info.layout.object(), interface.object())?;
    let layout = create_info
        .layout
        .downcast_ref::<VulkanPipelineLayout>()?
        .layout();

    // shader stage
    let (vertex_module, _vertex_guard) =
        create_shader_module(device.raw(), create_info.vertex_shader.code)?;
    let mut stages = vec![shader_stage_create_info(
        vk::ShaderStageFlags::VERTEX,
        vertex_module,
        &create_info.vertex_shader,
    )];
    let _fragment_guard = match &create_info.fragment_shader {
        Some(fragment_shader) => {
            let (fragment_module, guard) =
                create_shader_module(device.raw(), fragment_shader.code)?;
            stages.push(shader_stage_create_info(
                vk::ShaderStageFlags::FRAGMENT,
                fragment_module,
                fragment_shader,
            ));
            Some(guard)
        }
        None => None,
    };

    // 頂点はshaderの中でbufferから読むので頂点入力は使わない
    let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::builder();
    let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::builder()
        .topology(vk::PrimitiveTopology::TRIANGLE_LIST);
    let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
        .viewport_count(1)
        .scissor_count(1);
    let rasterization_state = vk::PipelineRasterizationStateCreateInfo::builder()
        .polygon_mode(vk::PolygonMode::FILL)
        .cull_mode(vk::CullModeFlags::NONE)
        .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
        .line_width(1.0);
    let multisample_state = vk::PipelineMultisampleStateCreateInfo::builder()
        .rasterization_samples(vk::SampleCountFlags::TYPE_1);
    let depth_enabled = create_info.depth_attachment_format.is_some();
    let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::builder()
        .depth_test_enable(depth_enabled)
        .depth_write_enable(depth_enabled)
        .depth_compare_op(vk::CompareOp::LESS);
    let color_blend_attachments = create_info
        .color_attachment_formats
        .iter()
        .map(|_| {
            vk::PipelineColorBlendAttachmentState::builder()
                .blend_enable(false)
                .color_write_mask(vk::ColorComponentFlags::RGBA)
                .build()
        })
        .collect::<Vec<_>>();
    let color_blend_state =
        vk::PipelineColorBlendStateCreateInfo::builder().attachments(&color_blend_attachments);
    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic_state =
        vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

    // render passの代わりにattachmentのformatを渡す
    let color_attachment_formats = create_info
        .color_attachment_formats
        .iter()
        .copied()
        .map(convert::format)
        .collect::<Vec<_>>();
    let mut rendering_create_info = vk::PipelineRenderingCreateInfo::builder()
        .color_attachment_formats(&color_attachment_formats)
        .depth_attachment_format(
            create_info
                .depth_attachment_format
                .map_or(vk::Format::UNDEFINED, convert::format),
        );

    let pipeline_create_info = vk::GraphicsPipelineCreateInfo::builder()
        .push_next(&mut rendering_create_info)
        .stages(&stages)
        .vertex_input_state(&vertex_input_state)
        .input_assembly_state(&input_assembly_state)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterization_state)
        .multisample_state(&multisample_state)
        .depth_stencil_state(&depth_stencil_state)
        .color_blend_state(&color_blend_state)
        .dynamic_state(&dynamic_state)
        .layout(layout)
        .build();
    let pipeline = unsafe {
        device.raw().create_graphics_pipelines(
            vk::PipelineCache::null(),
            &[pipeline_create_info],
            None,
        )
    }
    .map_err(|(_, result)| driver(result))?[0];
    let pipeline_guard = {
        let device = device.raw().clone();
        OnDrop::new(move || unsafe { device.destroy_pipeline(pipeline, None) })
    };

    let graphics_pipeline = rhi::new_object(
        Some(interface.clone().upcast()),
        interface.object().allocator(),
        |object| VulkanGraphicsPipeline {
            base: rhi::GraphicsPipeline::new(object, create_info),
            pipeline,
        },
    )?;
    pipeline_guard.dismiss();

    log::debug!(
        "created graphics pipeline {:?} with {} color attachments",
        pipeline,
        color_attachment_formats.len()
    );
    Ok(graphics_pipeline.upcast())
}
