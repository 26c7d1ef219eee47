use crate::{DescriptorType, Object, Ptr, ShaderStageFlags};

/// DescriptorSetLayoutの一つのbinding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorSetLayoutBinding {
    /// descriptor set内でのbindingのindex
    pub index: u32,
    /// bindingのdescriptorの種類
    pub descriptor_type: DescriptorType,
    /// bindingのdescriptorの数
    pub descriptor_count: u32,
    /// bindingにアクセスできるshader stage
    pub stage_flags: ShaderStageFlags,
}

/// DescriptorSetLayoutのcreate info
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptorSetLayoutCreateInfo<'a> {
    /// descriptor setのbinding
    pub bindings: &'a [DescriptorSetLayoutBinding],
}

/// DescriptorSetLayout
#[repr(C)]
pub struct DescriptorSetLayout {
    base: Object,
    bindings: Vec<DescriptorSetLayoutBinding>,
}
impl DescriptorSetLayout {
    /// create infoのbindingをコピーして作る
    pub fn new(object: Object, create_info: &DescriptorSetLayoutCreateInfo) -> Self {
        Self {
            base: object,
            bindings: create_info.bindings.to_vec(),
        }
    }

    /// bindingを取得する
    pub fn bindings(&self) -> &[DescriptorSetLayoutBinding] {
        &self.bindings
    }
}
crate::impl_kind!(DescriptorSetLayout { base: Object });

/// DescriptorSetのcreate info
#[derive(Debug, Clone, Copy)]
pub struct DescriptorSetCreateInfo<'a> {
    /// descriptor setのlayout
    pub layout: &'a Ptr<DescriptorSetLayout>,
}

/// DescriptorSet
///
/// 作成に使ったlayoutへの参照を保持する。
#[repr(C)]
pub struct DescriptorSet {
    base: Object,
    layout: Ptr<DescriptorSetLayout>,
}
impl DescriptorSet {
    /// layoutへの参照を一つ増やして作る
    pub fn new(object: Object, create_info: &DescriptorSetCreateInfo) -> Self {
        Self {
            base: object,
            layout: create_info.layout.clone(),
        }
    }

    /// layoutを取得する
    pub fn layout(&self) -> &Ptr<DescriptorSetLayout> {
        &self.layout
    }
}
crate::impl_kind!(DescriptorSet { base: Object });
