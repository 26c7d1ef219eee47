//! プロセスで一度だけVulkanのローダーを読み込む。

use crate::VulkanError;
use parking_lot::Mutex;
use std::sync::OnceLock;

static ENTRY: OnceLock<ash::Entry> = OnceLock::new();
static LOAD_LOCK: Mutex<()> = Mutex::new(());

/// 読み込み済みのash::Entryを取得する。初回だけローダーを読み込む。
///
/// 読み込みに失敗した場合は何も記録しないので、次の呼び出しで再度試みる。
pub(crate) fn entry() -> Result<&'static ash::Entry, VulkanError> {
    if let Some(entry) = ENTRY.get() {
        return Ok(entry);
    }

    let _lock = LOAD_LOCK.lock();
    // ロックを待っている間に他のスレッドが読み込んでいるかもしれない
    if let Some(entry) = ENTRY.get() {
        return Ok(entry);
    }
    let entry = unsafe { ash::Entry::load()? };
    log::info!("loaded the Vulkan loader");
    Ok(ENTRY.get_or_init(|| entry))
}
