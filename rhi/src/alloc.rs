//! リソースのストレージを確保するホスト側アロケータ。
//!
//! 各Objectは自分を確保したアロケータを保持しており、
//! 具体的な型を知らない汎用コードからでも正しく解放できる。

use crate::{Error, Result};
use std::{alloc::Layout, ptr::NonNull};

/// リソースのストレージを確保・解放するアロケータ
pub trait Allocator: Sync {
    /// `layout`のストレージを確保する
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>>;

    /// `allocate`で確保したストレージを解放する
    /// ## Safety
    /// `ptr`はこのアロケータが同じ`layout`で確保したものでなければならない。
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// グローバルアロケータを使うAllocator
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl Allocator for SystemAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>> {
        let out_of_memory = Error::OutOfHostMemory {
            size: layout.size(),
            align: layout.align(),
        };
        if layout.size() == 0 {
            return Err(out_of_memory);
        }
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(out_of_memory)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        std::alloc::dealloc(ptr.as_ptr(), layout);
    }
}

/// デフォルトのアロケータ
pub static SYSTEM_ALLOCATOR: SystemAllocator = SystemAllocator;

/// 確保したストレージをスコープを抜けるときに解放するガード
pub(crate) struct StorageGuard {
    allocator: &'static dyn Allocator,
    ptr: NonNull<u8>,
    layout: Layout,
}
impl StorageGuard {
    pub(crate) fn allocate(allocator: &'static dyn Allocator, layout: Layout) -> Result<Self> {
        let ptr = allocator.allocate(layout)?;
        Ok(Self {
            allocator,
            ptr,
            layout,
        })
    }

    pub(crate) fn as_ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    /// 解放せずに所有権を手放す
    pub(crate) fn release(self) -> NonNull<u8> {
        let ptr = self.ptr;
        std::mem::forget(self);
        ptr
    }
}
impl Drop for StorageGuard {
    fn drop(&mut self) {
        unsafe { self.allocator.deallocate(self.ptr, self.layout) }
    }
}
