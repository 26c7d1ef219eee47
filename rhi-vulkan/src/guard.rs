//! 作成途中で失敗したときに、それまでに作ったハンドルを破棄するためのガード。

use crate::{Device, VulkanError};
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc};
use std::mem::ManuallyDrop;

/// スコープを抜けるときに登録した処理を実行するガード
///
/// 作成が最後まで成功したら`dismiss`で処理を取り消す。
pub(crate) struct OnDrop<F: FnOnce()> {
    f: Option<F>,
}
impl<F: FnOnce()> OnDrop<F> {
    pub(crate) fn new(f: F) -> Self {
        Self { f: Some(f) }
    }

    /// 処理を実行せずにガードを捨てる
    pub(crate) fn dismiss(mut self) {
        self.f = None;
    }
}
impl<F: FnOnce()> Drop for OnDrop<F> {
    fn drop(&mut self) {
        if let Some(f) = self.f.take() {
            f();
        }
    }
}

/// 確保したGPUメモリを、引き取られなければスコープを抜けるときに解放するガード
pub(crate) struct AllocationGuard<'a> {
    device: &'a Device,
    allocation: ManuallyDrop<Allocation>,
}
impl<'a> AllocationGuard<'a> {
    pub(crate) fn allocate(
        device: &'a Device,
        allocation_create_desc: &AllocationCreateDesc,
    ) -> Result<Self, VulkanError> {
        let allocation = device.allocator().allocate(allocation_create_desc)?;
        Ok(Self {
            device,
            allocation: ManuallyDrop::new(allocation),
        })
    }

    pub(crate) fn allocation(&self) -> &Allocation {
        &self.allocation
    }

    /// 解放せずに中身を引き取る
    pub(crate) fn into_inner(self) -> Allocation {
        let mut this = ManuallyDrop::new(self);
        // thisのDropは呼ばれないので、allocationを取り出すのは一度だけ
        unsafe { ManuallyDrop::take(&mut this.allocation) }
    }
}
impl Drop for AllocationGuard<'_> {
    fn drop(&mut self) {
        let allocation = unsafe { ManuallyDrop::take(&mut self.allocation) };
        free_allocation(self.device, allocation);
    }
}

/// GPUメモリを解放する。解放の失敗はログに残すだけにする。
pub(crate) fn free_allocation(device: &Device, allocation: Allocation) {
    if let Err(error) = device.allocator().free(allocation) {
        log::warn!("failed to free GPU memory: {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn runs_on_early_exit() {
        let destroyed = Cell::new(false);
        {
            let _guard = OnDrop::new(|| destroyed.set(true));
        }
        assert!(destroyed.get());
    }

    #[test]
    fn dismissed_guard_does_nothing() {
        let destroyed = Cell::new(false);
        let guard = OnDrop::new(|| destroyed.set(true));
        guard.dismiss();
        assert!(!destroyed.get());
    }

    #[test]
    fn guards_unwind_in_reverse_order() {
        let order = std::cell::RefCell::new(Vec::new());
        {
            let _first = OnDrop::new(|| order.borrow_mut().push("first"));
            let _second = OnDrop::new(|| order.borrow_mut().push("second"));
        }
        assert_eq!(*order.borrow(), ["second", "first"]);
    }
}
