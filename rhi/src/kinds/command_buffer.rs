//! コマンドを記録するCommandBufferを定義する。

use crate::{
    AccessFlags, Buffer, ComputePipeline, DescriptorSet, Error, GraphicsPipeline, Object,
    PipelineStageFlags, Ptr, ResourceKind, Result,
};
use std::fmt::Debug;

/// CommandBufferのcreate info
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandBufferCreateInfo {
    /// 一度submitしたら記録し直す使い方をする
    pub one_time_submit: bool,
}

/// barrierの片側のスコープ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BarrierScope {
    /// 同期するpipeline stage
    pub stages: PipelineStageFlags,
    /// 同期するメモリアクセス
    pub access: AccessFlags,
}
impl BarrierScope {
    /// stageとaccessからスコープを作る
    pub const fn new(stages: PipelineStageFlags, access: AccessFlags) -> Self {
        Self { stages, access }
    }
}

/// 引数とdraw数をbufferから読むdraw
#[derive(Debug, Clone, Copy)]
pub struct IndirectDraw<'a> {
    /// `DrawIndirectCommand`を並べたbuffer
    pub argument_buffer: &'a Ptr<Buffer>,
    /// 最初の`DrawIndirectCommand`のバイトオフセット
    pub argument_offset: u64,
    /// `DrawIndirectCommand`同士のバイト間隔
    pub argument_stride: u32,
    /// draw数を`u32`で置いたbuffer
    pub count_buffer: &'a Ptr<Buffer>,
    /// draw数のバイトオフセット
    pub count_offset: u64,
    /// draw数の上限
    pub max_count: u32,
}

/// バックエンドが提供するコマンド記録のエントリポイント
///
/// 記録したコマンドが参照するリソースは、次に記録を開始するかCommandBufferが破棄されるまで保持すること。
pub trait CommandBufferDispatch: Sync {
    /// 記録を開始する
    fn begin(&self, command_buffer: &Ptr<CommandBuffer>) -> Result<()> {
        let _ = command_buffer;
        Err(Error::Unsupported(ResourceKind::CommandBuffer))
    }

    /// 記録を終了する
    fn end(&self, command_buffer: &Ptr<CommandBuffer>) -> Result<()> {
        let _ = command_buffer;
        Err(Error::Unsupported(ResourceKind::CommandBuffer))
    }

    /// compute pipelineをbindする
    fn cmd_bind_compute_pipeline(
        &self,
        command_buffer: &Ptr<CommandBuffer>,
        pipeline: &Ptr<ComputePipeline>,
    ) -> Result<()> {
        let _ = (command_buffer, pipeline);
        Err(Error::Unsupported(ResourceKind::CommandBuffer))
    }

    /// graphics pipelineをbindする
    fn cmd_bind_graphics_pipeline(
        &self,
        command_buffer: &Ptr<CommandBuffer>,
        pipeline: &Ptr<GraphicsPipeline>,
    ) -> Result<()> {
        let _ = (command_buffer, pipeline);
        Err(Error::Unsupported(ResourceKind::CommandBuffer))
    }

    /// 直前にbindしたpipelineのlayoutで`index`番目のdescriptor setをbindする
    fn cmd_bind_descriptor_set(
        &self,
        command_buffer: &Ptr<CommandBuffer>,
        index: u32,
        descriptor_set: &Ptr<DescriptorSet>,
    ) -> Result<()> {
        let _ = (command_buffer, index, descriptor_set);
        Err(Error::Unsupported(ResourceKind::CommandBuffer))
    }

    /// `DispatchIndirectCommand`をbufferから読んでdispatchする
    fn cmd_dispatch(
        &self,
        command_buffer: &Ptr<CommandBuffer>,
        argument_buffer: &Ptr<Buffer>,
        argument_offset: u64,
    ) -> Result<()> {
        let _ = (command_buffer, argument_buffer, argument_offset);
        Err(Error::Unsupported(ResourceKind::CommandBuffer))
    }

    /// 引数とdraw数をbufferから読んでdrawする
    fn cmd_draw(&self, command_buffer: &Ptr<CommandBuffer>, draw: &IndirectDraw) -> Result<()> {
        let _ = (command_buffer, draw);
        Err(Error::Unsupported(ResourceKind::CommandBuffer))
    }

    /// `src`のスコープが終わってから`dst`のスコープを始めるbarrierを記録する
    fn cmd_barrier(
        &self,
        command_buffer: &Ptr<CommandBuffer>,
        src: BarrierScope,
        dst: BarrierScope,
    ) -> Result<()> {
        let _ = (command_buffer, src, dst);
        Err(Error::Unsupported(ResourceKind::CommandBuffer))
    }
}

/// コマンドを記録するバッファ
#[repr(C)]
pub struct CommandBuffer {
    base: Object,
    dispatch: &'static dyn CommandBufferDispatch,
}
impl CommandBuffer {
    /// `new_object`に渡されたObjectとバックエンドのディスパッチテーブルから作る
    pub fn new(object: Object, dispatch: &'static dyn CommandBufferDispatch) -> Self {
        Self {
            base: object,
            dispatch,
        }
    }
}
crate::impl_kind!(CommandBuffer { base: Object });

impl Debug for CommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBuffer")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl Ptr<CommandBuffer> {
    /// 記録を開始する
    pub fn begin(&self) -> Result<()> {
        self.dispatch.begin(self)
    }

    /// 記録を終了する
    pub fn end(&self) -> Result<()> {
        self.dispatch.end(self)
    }

    /// compute pipelineをbindする
    pub fn cmd_bind_compute_pipeline(&self, pipeline: &Ptr<ComputePipeline>) -> Result<()> {
        self.dispatch.cmd_bind_compute_pipeline(self, pipeline)
    }

    /// graphics pipelineをbindする
    pub fn cmd_bind_graphics_pipeline(&self, pipeline: &Ptr<GraphicsPipeline>) -> Result<()> {
        self.dispatch.cmd_bind_graphics_pipeline(self, pipeline)
    }

    /// 直前にbindしたpipelineのlayoutで`index`番目のdescriptor setをbindする
    pub fn cmd_bind_descriptor_set(
        &self,
        index: u32,
        descriptor_set: &Ptr<DescriptorSet>,
    ) -> Result<()> {
        self.dispatch
            .cmd_bind_descriptor_set(self, index, descriptor_set)
    }

    /// `DispatchIndirectCommand`をbufferから読んでdispatchする
    pub fn cmd_dispatch(&self, argument_buffer: &Ptr<Buffer>, argument_offset: u64) -> Result<()> {
        self.dispatch
            .cmd_dispatch(self, argument_buffer, argument_offset)
    }

    /// 引数とdraw数をbufferから読んでdrawする
    pub fn cmd_draw(&self, draw: &IndirectDraw) -> Result<()> {
        self.dispatch.cmd_draw(self, draw)
    }

    /// barrierを記録する
    pub fn cmd_barrier(&self, src: BarrierScope, dst: BarrierScope) -> Result<()> {
        self.dispatch.cmd_barrier(self, src, dst)
    }
}
