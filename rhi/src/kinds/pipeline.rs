use crate::{DescriptorSetLayout, ImageFormat, Object, Ptr};
use std::ffi::CStr;

/// PipelineLayoutのcreate info
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineLayoutCreateInfo<'a> {
    /// pipeline layoutのdescriptor set layout。並び順がset番号になる。
    pub descriptor_set_layouts: &'a [Ptr<DescriptorSetLayout>],
}

/// PipelineLayout
///
/// descriptor set layoutそれぞれへの参照を一つずつ保持する。
#[repr(C)]
pub struct PipelineLayout {
    base: Object,
    descriptor_set_layouts: Vec<Ptr<DescriptorSetLayout>>,
}
impl PipelineLayout {
    /// descriptor set layoutへの参照を一つずつ増やして作る
    pub fn new(object: Object, create_info: &PipelineLayoutCreateInfo) -> Self {
        Self {
            base: object,
            descriptor_set_layouts: create_info.descriptor_set_layouts.to_vec(),
        }
    }

    /// descriptor set layoutを取得する
    pub fn descriptor_set_layouts(&self) -> &[Ptr<DescriptorSetLayout>] {
        &self.descriptor_set_layouts
    }
}
crate::impl_kind!(PipelineLayout { base: Object });

/// コンパイル済みのシェーダ
#[derive(Debug, Clone, Copy)]
pub struct ShaderStage<'a> {
    /// SPIR-Vのワード列
    pub code: &'a [u32],
    /// エントリポイントの名前
    pub entry_point: &'a CStr,
}

/// ComputePipelineのcreate info
#[derive(Debug, Clone, Copy)]
pub struct ComputePipelineCreateInfo<'a> {
    /// pipeline layout
    pub layout: &'a Ptr<PipelineLayout>,
    /// compute shader
    pub shader: ShaderStage<'a>,
}

/// ComputePipeline
#[repr(C)]
pub struct ComputePipeline {
    base: Object,
    layout: Ptr<PipelineLayout>,
}
impl ComputePipeline {
    /// layoutへの参照を一つ増やして作る
    pub fn new(object: Object, create_info: &ComputePipelineCreateInfo) -> Self {
        Self {
            base: object,
            layout: create_info.layout.clone(),
        }
    }

    /// layoutを取得する
    pub fn layout(&self) -> &Ptr<PipelineLayout> {
        &self.layout
    }
}
crate::impl_kind!(ComputePipeline { base: Object });

/// GraphicsPipelineのcreate info
///
/// dynamic renderingを前提にしており、viewportとscissorはdynamic stateになる。
#[derive(Debug, Clone, Copy)]
pub struct GraphicsPipelineCreateInfo<'a> {
    /// pipeline layout
    pub layout: &'a Ptr<PipelineLayout>,
    /// vertex shader
    pub vertex_shader: ShaderStage<'a>,
    /// fragment shader
    pub fragment_shader: Option<ShaderStage<'a>>,
    /// color attachmentのformat
    pub color_attachment_formats: &'a [ImageFormat],
    /// depth attachmentのformat
    pub depth_attachment_format: Option<ImageFormat>,
}

/// GraphicsPipeline
#[repr(C)]
pub struct GraphicsPipeline {
    base: Object,
    layout: Ptr<PipelineLayout>,
}
impl GraphicsPipeline {
    /// layoutへの参照を一つ増やして作る
    pub fn new(object: Object, create_info: &GraphicsPipelineCreateInfo) -> Self {
        Self {
            base: object,
            layout: create_info.layout.clone(),
        }
    }

    /// layoutを取得する
    pub fn layout(&self) -> &Ptr<PipelineLayout> {
        &self.layout
    }
}
crate::impl_kind!(GraphicsPipeline { base: Object });
