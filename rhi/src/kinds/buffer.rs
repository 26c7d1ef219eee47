use crate::{BufferUsageFlags, MemoryLocation, Object};

/// Bufferのcreate info
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferCreateInfo {
    /// バイト単位のサイズ
    pub size: u64,
    /// 用途
    pub usage: BufferUsageFlags,
    /// メモリを置く場所
    pub location: MemoryLocation,
}

/// Buffer
#[repr(C)]
pub struct Buffer {
    base: Object,
    size: u64,
    usage: BufferUsageFlags,
    location: MemoryLocation,
}
impl Buffer {
    /// create infoの内容をコピーして作る
    pub fn new(object: Object, create_info: &BufferCreateInfo) -> Self {
        Self {
            base: object,
            size: create_info.size,
            usage: create_info.usage,
            location: create_info.location,
        }
    }

    /// バイト単位のサイズ
    pub fn size(&self) -> u64 {
        self.size
    }

    /// 用途
    pub fn usage(&self) -> BufferUsageFlags {
        self.usage
    }

    /// メモリを置いた場所
    pub fn location(&self) -> MemoryLocation {
        self.location
    }
}
crate::impl_kind!(Buffer { base: Object });
