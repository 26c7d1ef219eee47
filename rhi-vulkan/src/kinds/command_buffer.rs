use super::{
    buffer::VulkanBuffer,
    descriptor::VulkanDescriptorSet,
    pipeline::{VulkanComputePipeline, VulkanGraphicsPipeline},
};
use crate::{
    convert,
    error::driver,
    guard::OnDrop,
    interface::{ensure_owned, owning_device, vulkan_interface},
    VulkanError,
};
use ash::vk;
use parking_lot::Mutex;
use rhi::{
    BarrierScope, CommandBufferCreateInfo, CommandBufferDispatch, IndirectDraw, Interface, Kind,
    Ptr,
};
use std::fmt::Debug;

// 記録中の状態
#[derive(Default)]
struct RecordingState {
    recording: bool,
    // descriptor setのbindに使う、直前にbindしたpipelineのlayout
    bound: Option<(vk::PipelineLayout, vk::PipelineBindPoint)>,
    // 記録したコマンドが参照するリソース
    retained: Vec<Ptr<rhi::Object>>,
}

/// VulkanのCommandBuffer
///
/// CommandBufferごとに専用のcommand poolを持つ。
/// 記録したコマンドが参照するリソースは、次に記録を開始するかCommandBufferが破棄されるまで保持する。
#[repr(C)]
pub struct VulkanCommandBuffer {
    base: rhi::CommandBuffer,
    pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    one_time_submit: bool,
    // vk::CommandBufferへの記録は外部同期が必要なので、記録はこのロックの中で行う
    state: Mutex<RecordingState>,
}
rhi::impl_kind!(VulkanCommandBuffer { base: rhi::CommandBuffer } => rhi::Object);

impl VulkanCommandBuffer {
    /// vk::CommandBufferを取得する
    /// ## Safety
    /// 参照カウントの管理から中身を取り出すので注意。
    /// CommandBufferが破棄されると、この関数で取り出したvk::CommandBufferは無効になる。
    pub unsafe fn command_buffer_raw(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    /// 記録中かどうか
    pub fn is_recording(&self) -> bool {
        self.state.lock().recording
    }

    /// 保持しているリソースの数
    pub fn retained_count(&self) -> usize {
        self.state.lock().retained.len()
    }

    // 同じInterfaceで作られたリソースしか記録できない
    fn ensure_same_interface(&self, resource: &rhi::Object) -> Result<(), VulkanError> {
        let interface = self
            .object()
            .parent()
            .expect("command buffers are owned by an interface");
        ensure_owned(resource, interface)
    }

    // 記録中であればコマンドを記録する
    fn record(
        &self,
        f: impl FnOnce(
            &ash::Device,
            vk::CommandBuffer,
            &mut RecordingState,
        ) -> Result<(), VulkanError>,
    ) -> rhi::Result<()> {
        let device = owning_device(self.object());
        let mut state = self.state.lock();
        if !state.recording {
            return Err(VulkanError::NotRecording.into());
        }
        f(device.raw(), self.command_buffer, &mut *state)?;
        Ok(())
    }
}

impl Drop for VulkanCommandBuffer {
    fn drop(&mut self) {
        let device = owning_device(self.object());
        // poolの破棄でcommand bufferも解放される
        unsafe { device.raw().destroy_command_pool(self.pool, None) };
        log::debug!(
            "destroyed command buffer {:?} retaining {} resources",
            self.command_buffer,
            self.state.get_mut().retained.len()
        );
    }
}

impl Debug for VulkanCommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanCommandBuffer")
            .field("object", self.object())
            .field("command_buffer", &self.command_buffer)
            .field("one_time_submit", &self.one_time_submit)
            .finish_non_exhaustive()
    }
}

fn begin_flags(one_time_submit: bool) -> vk::CommandBufferUsageFlags {
    if one_time_submit {
        vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT
    } else {
        vk::CommandBufferUsageFlags::empty()
    }
}

fn memory_barrier(src: BarrierScope, dst: BarrierScope) -> vk::MemoryBarrier2 {
    vk::MemoryBarrier2::builder()
        .src_stage_mask(convert::pipeline_stages(src.stages))
        .src_access_mask(convert::access(src.access))
        .dst_stage_mask(convert::pipeline_stages(dst.stages))
        .dst_access_mask(convert::access(dst.access))
        .build()
}

struct VulkanCommandDispatch;

static VULKAN_COMMAND_DISPATCH: VulkanCommandDispatch = VulkanCommandDispatch;

impl CommandBufferDispatch for VulkanCommandDispatch {
    fn begin(&self, command_buffer: &Ptr<rhi::CommandBuffer>) -> rhi::Result<()> {
        let this = command_buffer.downcast_ref::<VulkanCommandBuffer>()?;
        let device = owning_device(this.object());
        let mut state = this.state.lock();

        // 記録中に呼ばれたら、それまでの記録を捨てて始め直す
        if state.recording {
            unsafe {
                device.raw().reset_command_buffer(
                    this.command_buffer,
                    vk::CommandBufferResetFlags::empty(),
                )
            }
            .map_err(driver)?;
            state.recording = false;
        }

        let begin_info =
            vk::CommandBufferBeginInfo::builder().flags(begin_flags(this.one_time_submit));
        unsafe {
            device
                .raw()
                .begin_command_buffer(this.command_buffer, &begin_info)
        }
        .map_err(driver)?;

        // 前回の記録で保持していたリソースを解放する
        state.retained.clear();
        state.bound = None;
        state.recording = true;
        Ok(())
    }

    fn end(&self, command_buffer: &Ptr<rhi::CommandBuffer>) -> rhi::Result<()> {
        let this = command_buffer.downcast_ref::<VulkanCommandBuffer>()?;
        this.record(|device, command_buffer, state| {
            unsafe { device.end_command_buffer(command_buffer) }?;
            state.recording = false;
            Ok(())
        })
    }

    fn cmd_bind_compute_pipeline(
        &self,
        command_buffer: &Ptr<rhi::CommandBuffer>,
        pipeline: &Ptr<rhi::ComputePipeline>,
    ) -> rhi::Result<()> {
        let this = command_buffer.downcast_ref::<VulkanCommandBuffer>()?;
        this.ensure_same_interface(pipeline.object())?;
        let vulkan_pipeline = pipeline.downcast_ref::<VulkanComputePipeline>()?;
        this.record(|device, command_buffer, state| {
            unsafe {
                device.cmd_bind_pipeline(
                    command_buffer,
                    vk::PipelineBindPoint::COMPUTE,
                    vulkan_pipeline.pipeline(),
                )
            };
            state.bound = Some((vulkan_pipeline.layout(), vk::PipelineBindPoint::COMPUTE));
            state.retained.push(pipeline.clone().upcast());
            Ok(())
        })
    }

    fn cmd_bind_graphics_pipeline(
        &self,
        command_buffer: &Ptr<rhi::CommandBuffer>,
        pipeline: &Ptr<rhi::GraphicsPipeline>,
    ) -> rhi::Result<()> {
        let this = command_buffer.downcast_ref::<VulkanCommandBuffer>()?;
        this.ensure_same_interface(pipeline.object())?;
        let vulkan_pipeline = pipeline.downcast_ref::<VulkanGraphicsPipeline>()?;
        this.record(|device, command_buffer, state| {
            unsafe {
                device.cmd_bind_pipeline(
                    command_buffer,
                    vk::PipelineBindPoint::GRAPHICS,
                    vulkan_pipeline.pipeline(),
                )
            };
            state.bound = Some((vulkan_pipeline.layout(), vk::PipelineBindPoint::GRAPHICS));
            state.retained.push(pipeline.clone().upcast());
            Ok(())
        })
    }

    fn cmd_bind_descriptor_set(
        &self,
        command_buffer: &Ptr<rhi::CommandBuffer>,
        index: u32,
        descriptor_set: &Ptr<rhi::DescriptorSet>,
    ) -> rhi::Result<()> {
        let this = command_buffer.downcast_ref::<VulkanCommandBuffer>()?;
        this.ensure_same_interface(descriptor_set.object())?;
        let set = descriptor_set.downcast_ref::<VulkanDescriptorSet>()?.set();
        this.record(|device, command_buffer, state| {
            let (layout, bind_point) = state.bound.ok_or(VulkanError::NoPipelineBound)?;
            unsafe {
                device.cmd_bind_descriptor_sets(
                    command_buffer,
                    bind_point,
                    layout,
                    index,
                    &[set],
                    &[],
                )
            };
            state.retained.push(descriptor_set.clone().upcast());
            Ok(())
        })
    }

    fn cmd_dispatch(
        &self,
        command_buffer: &Ptr<rhi::CommandBuffer>,
        argument_buffer: &Ptr<rhi::Buffer>,
        argument_offset: u64,
    ) -> rhi::Result<()> {
        let this = command_buffer.downcast_ref::<VulkanCommandBuffer>()?;
        this.ensure_same_interface(argument_buffer.object())?;
        let buffer = argument_buffer.downcast_ref::<VulkanBuffer>()?.buffer();
        this.record(|device, command_buffer, state| {
            unsafe { device.cmd_dispatch_indirect(command_buffer, buffer, argument_offset) };
            state.retained.push(argument_buffer.clone().upcast());
            Ok(())
        })
    }

    fn cmd_draw(
        &self,
        command_buffer: &Ptr<rhi::CommandBuffer>,
        draw: &IndirectDraw,
    ) -> rhi::Result<()> {
        let this = command_buffer.downcast_ref::<VulkanCommandBuffer>()?;
        this.ensure_same_interface(draw.argument_buffer.object())?;
        this.ensure_same_interface(draw.count_buffer.object())?;
        let argument_buffer = draw.argument_buffer.downcast_ref::<VulkanBuffer>()?.buffer();
        let count_buffer = draw.count_buffer.downcast_ref::<VulkanBuffer>()?.buffer();
        this.record(|device, command_buffer, state| {
            unsafe {
                device.cmd_draw_indirect_count(
                    command_buffer,
                    argument_buffer,
                    draw.argument_offset,
                    count_buffer,
                    draw.count_offset,
                    draw.max_count,
                    draw.argument_stride,
                )
            };
            state.retained.push(draw.argument_buffer.clone().upcast());
            state.retained.push(draw.count_buffer.clone().upcast());
            Ok(())
        })
    }

    fn cmd_barrier(
        &self,
        command_buffer: &Ptr<rhi::CommandBuffer>,
        src: BarrierScope,
        dst: BarrierScope,
    ) -> rhi::Result<()> {
        let this = command_buffer.downcast_ref::<VulkanCommandBuffer>()?;
        this.record(|device, command_buffer, _| {
            let memory_barriers = [memory_barrier(src, dst)];
            let dependency_info = vk::DependencyInfo::builder().memory_barriers(&memory_barriers);
            unsafe { device.cmd_pipeline_barrier2(command_buffer, &dependency_info) };
            Ok(())
        })
    }
}

pub(crate) fn new_command_buffer(
    interface: &Ptr<Interface>,
    create_info: &CommandBufferCreateInfo,
) -> rhi::Result<Ptr<rhi::CommandBuffer>> {
    let device = vulkan_interface(interface)?.selected_device()?;

    // command poolの作成
    let pool_create_info = vk::CommandPoolCreateInfo::builder()
        .queue_family_index(device.queue_family_index())
        .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
    let pool = unsafe { device.raw().create_command_pool(&pool_create_info, None) }
        .map_err(driver)?;
    let pool_guard = {
        let device = device.raw().clone();
        OnDrop::new(move || unsafe { device.destroy_command_pool(pool, None) })
    };

    // command bufferの確保
    let allocate_info = vk::CommandBufferAllocateInfo::builder()
        .command_pool(pool)
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_buffer_count(1);
    let command_buffer = unsafe { device.raw().allocate_command_buffers(&allocate_info) }
        .map_err(driver)?
        .into_iter()
        .next()
        .ok_or_else(|| driver(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY))?;

    let vulkan_command_buffer = rhi::new_object(
        Some(interface.clone().upcast()),
        interface.object().allocator(),
        |object| VulkanCommandBuffer {
            base: rhi::CommandBuffer::new(object, &VULKAN_COMMAND_DISPATCH),
            pool,
            command_buffer,
            one_time_submit: create_info.one_time_submit,
            state: Mutex::new(RecordingState::default()),
        },
    )?;
    pool_guard.dismiss();

    log::debug!("created command buffer {:?}", command_buffer);
    Ok(vulkan_command_buffer.upcast())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_time_submit_sets_the_usage_flag() {
        assert_eq!(
            begin_flags(true),
            vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT
        );
        assert!(begin_flags(false).is_empty());
    }

    #[test]
    fn barrier_scopes_map_to_sync2_masks() {
        let barrier = memory_barrier(
            BarrierScope::new(
                rhi::PipelineStageFlags::COMPUTE_SHADER,
                rhi::AccessFlags::SHADER_STORAGE_WRITE,
            ),
            BarrierScope::new(
                rhi::PipelineStageFlags::ARGUMENT_INPUT,
                rhi::AccessFlags::ARGUMENT_READ,
            ),
        );
        assert_eq!(
            barrier.src_stage_mask,
            vk::PipelineStageFlags2::COMPUTE_SHADER
        );
        assert_eq!(
            barrier.src_access_mask,
            vk::AccessFlags2::SHADER_STORAGE_WRITE
        );
        assert_eq!(
            barrier.dst_stage_mask,
            vk::PipelineStageFlags2::DRAW_INDIRECT
        );
        assert_eq!(
            barrier.dst_access_mask,
            vk::AccessFlags2::INDIRECT_COMMAND_READ
        );
    }
}
