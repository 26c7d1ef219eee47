//! Vulkanバックエンド固有のエラー。

use ash::vk;

/// Vulkanバックエンドのエラー
#[derive(Debug, thiserror::Error)]
pub enum VulkanError {
    /// Vulkanのローダーを読み込めなかった
    #[error("failed to load the Vulkan loader: {0}")]
    Loading(#[from] ash::LoadingError),

    /// Vulkanの呼び出しが失敗した
    #[error("Vulkan call failed: {0}")]
    Driver(#[from] vk::Result),

    /// GPUメモリの確保に失敗した
    #[error("GPU memory allocation failed: {0}")]
    Allocation(#[from] gpu_allocator::AllocationError),

    /// deviceを選択する前にdeviceが必要なリソースを作ろうとした
    #[error("no device has been selected for this interface")]
    DeviceNotSelected,

    /// deviceを二回選択しようとした
    #[error("a device has already been selected for this interface")]
    DeviceAlreadySelected,

    /// 条件を満たすphysical deviceがない
    #[error("no physical device provides the required queues")]
    NoSuitableDevice,

    /// 別のInterfaceで作られたsurface、またはWSIを有効にしていないInterface
    #[error("surface does not belong to a WSI-enabled interface of this backend")]
    ForeignSurface,

    /// 別のInterfaceで作られたリソースを渡した
    #[error("{kind} was created by another interface")]
    ForeignResource {
        /// 渡されたリソースの種類
        kind: &'static str,
    },

    /// CPUから見えないメモリに置いたbufferにCPUからアクセスしようとした
    #[error("buffer memory is not mapped for host access")]
    NotHostVisible,

    /// bufferの範囲外にアクセスしようとした
    #[error("range {offset}..{offset}+{len} is out of a buffer of {size} bytes")]
    OutOfRange {
        /// アクセスの開始位置
        offset: u64,
        /// アクセスするバイト数
        len: u64,
        /// bufferのサイズ
        size: u64,
    },

    /// 記録を開始していないcommand bufferにコマンドを記録しようとした
    #[error("command buffer is not recording")]
    NotRecording,

    /// 記録中のコマンドがpipelineのbindを必要としている
    #[error("a pipeline must be bound before binding descriptor sets")]
    NoPipelineBound,
}

impl From<VulkanError> for rhi::Error {
    fn from(error: VulkanError) -> Self {
        match error {
            // ネイティブのステータスコードはそのまま渡す
            VulkanError::Driver(result) => rhi::Error::Driver(result.as_raw()),
            error => rhi::Error::backend(error),
        }
    }
}

/// ash::vk::Resultを`rhi::Error::Driver`に変換する
pub(crate) fn driver(result: vk::Result) -> rhi::Error {
    rhi::Error::Driver(result.as_raw())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_codes_pass_through_verbatim() {
        let error: rhi::Error = VulkanError::Driver(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY).into();
        assert!(matches!(error, rhi::Error::Driver(-2)));
        assert!(matches!(
            driver(vk::Result::ERROR_DEVICE_LOST),
            rhi::Error::Driver(-4)
        ));
    }

    #[test]
    fn other_errors_are_boxed_as_backend_errors() {
        let error: rhi::Error = VulkanError::DeviceNotSelected.into();
        assert!(matches!(error, rhi::Error::Backend(_)));
        assert_eq!(
            error.to_string(),
            "no device has been selected for this interface"
        );
    }
}
