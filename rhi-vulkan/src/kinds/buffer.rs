use crate::{
    convert,
    error::driver,
    guard::{free_allocation, AllocationGuard, OnDrop},
    interface::{owning_device, vulkan_interface},
    VulkanError,
};
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use rhi::{BufferCreateInfo, Interface, Kind, MemoryLocation, Ptr};
use std::fmt::Debug;

/// VulkanのBuffer
///
/// メモリはgpu-allocatorで確保する。
/// CPUから見えるメモリに置いたbufferは`write`と`read`で中身にアクセスできる。
#[repr(C)]
pub struct VulkanBuffer {
    base: rhi::Buffer,
    buffer: vk::Buffer,
    // Dropで取り出して解放する
    allocation: Option<Allocation>,
}
rhi::impl_kind!(VulkanBuffer { base: rhi::Buffer } => rhi::Object);

impl VulkanBuffer {
    /// vk::Bufferを取得する
    /// ## Safety
    /// 参照カウントの管理から中身を取り出すので注意。
    /// Bufferが破棄されると、この関数で取り出したvk::Bufferは無効になる。
    pub unsafe fn buffer_raw(&self) -> vk::Buffer {
        self.buffer
    }

    pub(crate) fn buffer(&self) -> vk::Buffer {
        self.buffer
    }

    // アクセスする範囲がbufferに収まっていればマップされたバイト列の該当部分を返す
    fn mapped_range(&self, offset: u64, len: u64) -> Result<*mut u8, VulkanError> {
        let size = self.base.size();
        let end = offset.checked_add(len);
        if end.map_or(true, |end| end > size) {
            return Err(VulkanError::OutOfRange { offset, len, size });
        }
        let ptr = self
            .allocation
            .as_ref()
            .and_then(Allocation::mapped_ptr)
            .ok_or(VulkanError::NotHostVisible)?;
        Ok(unsafe { ptr.as_ptr().cast::<u8>().add(offset as usize) })
    }

    /// `offset`バイト目から`data`を書き込む
    ///
    /// CPUから見えるメモリに置いたbufferでなければ`NotHostVisible`を返す。
    pub fn write<T: bytemuck::Pod>(&self, offset: u64, data: &[T]) -> rhi::Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let dst = self.mapped_range(offset, bytes.len() as u64)?;
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), dst, bytes.len()) };
        Ok(())
    }

    /// `offset`バイト目から`data`に読み出す
    ///
    /// CPUから見えるメモリに置いたbufferでなければ`NotHostVisible`を返す。
    pub fn read<T: bytemuck::Pod>(&self, offset: u64, data: &mut [T]) -> rhi::Result<()> {
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(data);
        let src = self.mapped_range(offset, bytes.len() as u64)?;
        unsafe { std::ptr::copy_nonoverlapping(src, bytes.as_mut_ptr(), bytes.len()) };
        Ok(())
    }
}

impl Drop for VulkanBuffer {
    fn drop(&mut self) {
        let allocation = self.allocation.take();
        let device = owning_device(self.object());
        // メモリを解放してからbufferを破棄する
        if let Some(allocation) = allocation {
            free_allocation(device, allocation);
        }
        unsafe { device.raw().destroy_buffer(self.buffer, None) };
        log::debug!("destroyed buffer {:?}", self.buffer);
    }
}

impl Debug for VulkanBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanBuffer")
            .field("object", self.object())
            .field("size", &self.base.size())
            .field("buffer", &self.buffer)
            .finish()
    }
}

pub(crate) fn new_buffer(
    interface: &Ptr<Interface>,
    create_info: &BufferCreateInfo,
) -> rhi::Result<Ptr<rhi::Buffer>> {
    let device = vulkan_interface(interface)?.selected_device()?;

    // bufferの作成
    let buffer_create_info = vk::BufferCreateInfo::builder()
        .size(create_info.size)
        .usage(convert::buffer_usage(create_info.usage))
        .sharing_mode(vk::SharingMode::EXCLUSIVE);
    let buffer =
        unsafe { device.raw().create_buffer(&buffer_create_info, None) }.map_err(driver)?;
    let buffer_guard = {
        let device = device.raw().clone();
        OnDrop::new(move || unsafe { device.destroy_buffer(buffer, None) })
    };

    // bufferのメモリ確保
    let requirements = unsafe { device.raw().get_buffer_memory_requirements(buffer) };
    let name = match create_info.location {
        MemoryLocation::GpuOnly => "device local buffer",
        MemoryLocation::CpuToGpu | MemoryLocation::GpuToCpu => "host buffer",
    };
    let allocation = AllocationGuard::allocate(
        device,
        &AllocationCreateDesc {
            name,
            requirements,
            location: convert::memory_location(create_info.location),
            linear: true,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        },
    )?;

    // bufferとメモリのバインド
    unsafe {
        device.raw().bind_buffer_memory(
            buffer,
            allocation.allocation().memory(),
            allocation.allocation().offset(),
        )
    }
    .map_err(driver)?;

    let vulkan_buffer = rhi::new_object(
        Some(interface.clone().upcast()),
        interface.object().allocator(),
        |object| VulkanBuffer {
            base: rhi::Buffer::new(object, create_info),
            buffer,
            allocation: Some(allocation.into_inner()),
        },
    )?;
    buffer_guard.dismiss();

    log::debug!(
        "created {} bytes {:?} buffer {:?}",
        create_info.size,
        create_info.location,
        buffer
    );
    Ok(vulkan_buffer.upcast())
}
