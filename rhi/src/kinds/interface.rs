//! リソースを生成するディスパッチテーブルを持つInterfaceを定義する。

use crate::{
    Buffer, BufferCreateInfo, CommandBuffer, CommandBufferCreateInfo, ComputePipeline,
    ComputePipelineCreateInfo, DescriptorSet, DescriptorSetCreateInfo, DescriptorSetLayout,
    DescriptorSetLayoutCreateInfo, Error, GraphicsPipeline, GraphicsPipelineCreateInfo, Image,
    ImageCreateInfo, Object, PipelineLayout, PipelineLayoutCreateInfo, Ptr, ResourceKind, Result,
    Swapchain, SwapchainCreateInfo,
};
use std::fmt::Debug;

/// バックエンドが提供するリソース生成のエントリポイント
///
/// 実装していない種類はデフォルトのまま`Error::Unsupported`を返す。
/// 各エントリポイントは作ったリソースの親として`interface`への参照を保持すること。
pub trait InterfaceDispatch: Sync {
    /// DescriptorSetLayoutを作成する
    fn new_descriptor_set_layout(
        &self,
        interface: &Ptr<Interface>,
        create_info: &DescriptorSetLayoutCreateInfo,
    ) -> Result<Ptr<DescriptorSetLayout>> {
        let _ = (interface, create_info);
        Err(Error::Unsupported(ResourceKind::DescriptorSetLayout))
    }

    /// DescriptorSetを作成する
    fn new_descriptor_set(
        &self,
        interface: &Ptr<Interface>,
        create_info: &DescriptorSetCreateInfo,
    ) -> Result<Ptr<DescriptorSet>> {
        let _ = (interface, create_info);
        Err(Error::Unsupported(ResourceKind::DescriptorSet))
    }

    /// PipelineLayoutを作成する
    fn new_pipeline_layout(
        &self,
        interface: &Ptr<Interface>,
        create_info: &PipelineLayoutCreateInfo,
    ) -> Result<Ptr<PipelineLayout>> {
        let _ = (interface, create_info);
        Err(Error::Unsupported(ResourceKind::PipelineLayout))
    }

    /// ComputePipelineを作成する
    fn new_compute_pipeline(
        &self,
        interface: &Ptr<Interface>,
        create_info: &ComputePipelineCreateInfo,
    ) -> Result<Ptr<ComputePipeline>> {
        let _ = (interface, create_info);
        Err(Error::Unsupported(ResourceKind::ComputePipeline))
    }

    /// GraphicsPipelineを作成する
    fn new_graphics_pipeline(
        &self,
        interface: &Ptr<Interface>,
        create_info: &GraphicsPipelineCreateInfo,
    ) -> Result<Ptr<GraphicsPipeline>> {
        let _ = (interface, create_info);
        Err(Error::Unsupported(ResourceKind::GraphicsPipeline))
    }

    /// Bufferを作成する
    fn new_buffer(
        &self,
        interface: &Ptr<Interface>,
        create_info: &BufferCreateInfo,
    ) -> Result<Ptr<Buffer>> {
        let _ = (interface, create_info);
        Err(Error::Unsupported(ResourceKind::Buffer))
    }

    /// Imageを作成する
    fn new_image(
        &self,
        interface: &Ptr<Interface>,
        create_info: &ImageCreateInfo,
    ) -> Result<Ptr<Image>> {
        let _ = (interface, create_info);
        Err(Error::Unsupported(ResourceKind::Image))
    }

    /// Swapchainを作成する
    fn new_swapchain(
        &self,
        interface: &Ptr<Interface>,
        create_info: &SwapchainCreateInfo,
    ) -> Result<Ptr<Swapchain>> {
        let _ = (interface, create_info);
        Err(Error::Unsupported(ResourceKind::Swapchain))
    }

    /// CommandBufferを作成する
    fn new_command_buffer(
        &self,
        interface: &Ptr<Interface>,
        create_info: &CommandBufferCreateInfo,
    ) -> Result<Ptr<CommandBuffer>> {
        let _ = (interface, create_info);
        Err(Error::Unsupported(ResourceKind::CommandBuffer))
    }
}

/// リソースを生成するインターフェース
///
/// ディスパッチテーブルはバックエンドが作成時に固定する。
/// クライアントは`Ptr<Interface>`のメソッドを通してのみリソースを作る。
#[repr(C)]
pub struct Interface {
    base: Object,
    dispatch: &'static dyn InterfaceDispatch,
}
impl Interface {
    /// `new_object`に渡されたObjectとバックエンドのディスパッチテーブルから作る
    pub fn new(object: Object, dispatch: &'static dyn InterfaceDispatch) -> Self {
        Self {
            base: object,
            dispatch,
        }
    }
}
crate::impl_kind!(Interface { base: Object });

impl Debug for Interface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interface")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

// 各エントリポイントはディスパッチテーブルにそのまま転送する
impl Ptr<Interface> {
    /// DescriptorSetLayoutを作成する
    pub fn new_descriptor_set_layout(
        &self,
        create_info: &DescriptorSetLayoutCreateInfo,
    ) -> Result<Ptr<DescriptorSetLayout>> {
        self.dispatch.new_descriptor_set_layout(self, create_info)
    }

    /// DescriptorSetを作成する
    pub fn new_descriptor_set(
        &self,
        create_info: &DescriptorSetCreateInfo,
    ) -> Result<Ptr<DescriptorSet>> {
        self.dispatch.new_descriptor_set(self, create_info)
    }

    /// PipelineLayoutを作成する
    pub fn new_pipeline_layout(
        &self,
        create_info: &PipelineLayoutCreateInfo,
    ) -> Result<Ptr<PipelineLayout>> {
        self.dispatch.new_pipeline_layout(self, create_info)
    }

    /// ComputePipelineを作成する
    pub fn new_compute_pipeline(
        &self,
        create_info: &ComputePipelineCreateInfo,
    ) -> Result<Ptr<ComputePipeline>> {
        self.dispatch.new_compute_pipeline(self, create_info)
    }

    /// GraphicsPipelineを作成する
    pub fn new_graphics_pipeline(
        &self,
        create_info: &GraphicsPipelineCreateInfo,
    ) -> Result<Ptr<GraphicsPipeline>> {
        self.dispatch.new_graphics_pipeline(self, create_info)
    }

    /// Bufferを作成する
    pub fn new_buffer(&self, create_info: &BufferCreateInfo) -> Result<Ptr<Buffer>> {
        self.dispatch.new_buffer(self, create_info)
    }

    /// Imageを作成する
    pub fn new_image(&self, create_info: &ImageCreateInfo) -> Result<Ptr<Image>> {
        self.dispatch.new_image(self, create_info)
    }

    /// Swapchainを作成する
    pub fn new_swapchain(&self, create_info: &SwapchainCreateInfo) -> Result<Ptr<Swapchain>> {
        self.dispatch.new_swapchain(self, create_info)
    }

    /// CommandBufferを作成する
    pub fn new_command_buffer(
        &self,
        create_info: &CommandBufferCreateInfo,
    ) -> Result<Ptr<CommandBuffer>> {
        self.dispatch.new_command_buffer(self, create_info)
    }
}
